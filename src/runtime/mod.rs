//! Runtime side of patching: values, call contexts, interception and host
//! collaborators.
//!
//! - [`HostValue`] - Values crossing the interception boundary
//! - [`InvocationContext`] - Everything a thunk knows about the call
//! - [`hook`] - Thunks and the facility that installs them
//! - [`host`] - Condition evaluation and action dispatch

mod context;
pub mod hook;
pub mod host;
mod value;

pub use context::InvocationContext;
pub use hook::{InterceptionFacility, InterceptorTable, Thunk};
pub use host::{ActionDispatcher, ActionRegistry, ConditionEvaluator, QueryEvaluator};
pub use value::{HostValue, ObjectRef};
