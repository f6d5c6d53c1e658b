//! Engine configuration.
//!
//! # Example
//!
//! ```rust
//! use dynpatch::patcher::EngineConfig;
//!
//! let config = EngineConfig::for_owner("MyMod");
//! assert_eq!(config.identity, "MyMod_DynamicPatcher");
//!
//! let config = EngineConfig {
//!     warn_duplicate_ids: false,
//!     ..EngineConfig::default()
//! };
//! assert_eq!(config.default_condition, "TRUE");
//! ```

/// Owner tag used when no identity is configured.
pub const DEFAULT_IDENTITY: &str = "dynpatch";

/// Condition applied to definitions that omit one.
pub const DEFAULT_CONDITION: &str = "TRUE";

/// Settings of a [`PatchEngine`](crate::patcher::PatchEngine).
///
/// The identity is the only state that survives a reset: every interceptor
/// is installed under it, and a reset removes exactly those.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Owner tag for installed interceptors.
    pub identity: String,

    /// Condition evaluated for definitions without one.
    ///
    /// Must be something the configured evaluator treats as always true.
    pub default_condition: String,

    /// Whether to warn when two definitions share an id.
    ///
    /// Ids only feed diagnostics, so duplicates are still registered.
    pub warn_duplicate_ids: bool,
}

impl EngineConfig {
    /// Default configuration with the identity derived from a host-side owner id.
    #[must_use]
    pub fn for_owner(owner_id: &str) -> Self {
        Self {
            identity: format!("{owner_id}_DynamicPatcher"),
            ..Self::default()
        }
    }

    /// Sets the owner tag.
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Sets the condition used when a definition omits one.
    #[must_use]
    pub fn with_default_condition(mut self, condition: impl Into<String>) -> Self {
        self.default_condition = condition.into();
        self
    }

    /// Enables or disables the duplicate-id warning.
    #[must_use]
    pub fn with_warn_duplicate_ids(mut self, warn: bool) -> Self {
        self.warn_duplicate_ids = warn;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            identity: DEFAULT_IDENTITY.to_string(),
            default_condition: DEFAULT_CONDITION.to_string(),
            warn_duplicate_ids: true,
        }
    }
}
