//! The patching pipeline.
//!
//! # Architecture
//!
//! ```text
//! PatchSource ──► PatchRegistry ──► ThunkCompiler ──► InterceptionFacility
//!                      │                  │
//!                MethodResolver     MutationPlan
//! ```
//!
//! - [`MethodResolver`] - Turns a [`TargetDescriptor`](crate::patch::TargetDescriptor)
//!   into a registered member
//! - [`PatchRegistry`] - Buckets definitions per member and phase, in order
//! - [`MutationPlan`] - Typed return-value rewrite, chosen once per patch
//! - [`ThunkCompiler`] - Folds a bucket into one [`Thunk`](crate::runtime::Thunk)
//! - [`PatchEngine`] - Runs the pipeline and resets it
//! - [`EngineConfig`] - Identity and defaults

mod compiler;
mod config;
mod engine;
mod mutation;
mod registry;
mod resolver;

pub use compiler::ThunkCompiler;
pub use config::{EngineConfig, DEFAULT_CONDITION, DEFAULT_IDENTITY};
pub use engine::{InstallReport, PatchEngine, PatchEngineBuilder};
pub use mutation::{ArithOp, MutationPlan};
pub use registry::{Bucket, BucketSnapshot, PatchRegistry, RegistrationReport};
pub use resolver::MethodResolver;
