//! Host-side collaborators of compiled thunks.
//!
//! Thunks evaluate conditions through a [`ConditionEvaluator`] and run actions
//! through an [`ActionDispatcher`]. Both are plain traits with blanket
//! implementations for closures; [`QueryEvaluator`] and [`ActionRegistry`] are
//! table-driven implementations for hosts that register named queries and
//! actions.

mod action;
mod args;
mod query;

pub use action::{ActionFn, ActionRegistry};
pub use args::{split_args, split_queries};
pub use query::{QueryEvaluator, QueryFn};

use crate::runtime::InvocationContext;

/// Decides whether a patch applies to a call.
pub trait ConditionEvaluator: Send + Sync {
    /// Evaluates `condition` for the call described by `ctx`.
    ///
    /// Implementations report their own failures and return `false`.
    fn evaluate(&self, condition: &str, ctx: &InvocationContext<'_>) -> bool;
}

impl<F> ConditionEvaluator for F
where
    F: Fn(&str, &InvocationContext<'_>) -> bool + Send + Sync,
{
    fn evaluate(&self, condition: &str, ctx: &InvocationContext<'_>) -> bool {
        self(condition, ctx)
    }
}

/// Runs a patch's side effects.
pub trait ActionDispatcher: Send + Sync {
    /// Runs `action`.
    ///
    /// # Errors
    ///
    /// Returns a message describing why the action could not be run. The
    /// caller logs it and continues with the next action.
    fn dispatch(&self, action: &str) -> Result<(), String>;
}

impl<F> ActionDispatcher for F
where
    F: Fn(&str) -> Result<(), String> + Send + Sync,
{
    fn dispatch(&self, action: &str) -> Result<(), String> {
        self(action)
    }
}
