//! Patch definitions and the sources that supply them.
//!
//! - [`PatchDefinition`] - One declarative patch: target, phase, condition, effects
//! - [`TargetDescriptor`] - Textual description of the member to patch
//! - [`ResultMutation`] / [`MutationOp`] - Return-value rewrite
//! - [`PatchSource`] - Supplier of the definition list, with JSON and in-memory
//!   implementations

mod definition;
mod source;

pub use definition::{MutationOp, PatchDefinition, PatchPhase, ResultMutation, TargetDescriptor};
pub use source::{JsonPatchSource, MemoryPatchSource, PatchSource};
