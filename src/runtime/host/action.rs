//! Name-based action dispatch.

use std::sync::Arc;

use dashmap::DashMap;

use crate::runtime::host::{args::split_args, ActionDispatcher};

/// Handler for one named action. Receives the tokenized action, name first.
pub type ActionFn = Arc<dyn Fn(&[String]) -> Result<(), String> + Send + Sync>;

/// [`ActionDispatcher`] over a table of named actions.
///
/// An action string is a case-insensitive name followed by arguments,
/// tokenized like condition queries.
///
/// # Examples
///
/// ```rust
/// use dynpatch::runtime::host::{ActionDispatcher, ActionRegistry};
///
/// let actions = ActionRegistry::new();
/// actions.register("AddMoney", |args| {
///     let amount: i32 = args.get(1).ok_or("missing amount")?.parse().map_err(|_| "bad amount")?;
///     assert_eq!(amount, 500);
///     Ok(())
/// });
///
/// assert!(actions.dispatch("AddMoney 500").is_ok());
/// assert!(actions.dispatch("Unknown").is_err());
/// ```
pub struct ActionRegistry {
    actions: DashMap<String, ActionFn>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: DashMap::new(),
        }
    }

    /// Registers or replaces an action handler.
    pub fn register<F>(&self, name: &str, handler: F)
    where
        F: Fn(&[String]) -> Result<(), String> + Send + Sync + 'static,
    {
        self.actions
            .insert(name.to_ascii_uppercase(), Arc::new(handler));
    }

    /// Returns `true` if an action with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(&name.to_ascii_uppercase())
    }
}

impl ActionDispatcher for ActionRegistry {
    fn dispatch(&self, action: &str) -> Result<(), String> {
        let args = split_args(action);
        let name = args.first().ok_or("action string is empty")?;
        let handler = self
            .actions
            .get(&name.to_ascii_uppercase())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| format!("unknown action '{name}'"))?;
        handler(&args)
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("action_count", &self.actions.len())
            .finish_non_exhaustive()
    }
}
