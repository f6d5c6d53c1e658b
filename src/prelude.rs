//! # dynpatch Prelude
//!
//! The types needed to describe a host program, author patches and run an
//! engine, for glob import.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dynpatch operations
pub use crate::Error;

/// The result type used throughout dynpatch
pub use crate::Result;

// ================================================================================================
// Type Universe
// ================================================================================================

/// Registered types, members and their handles
pub use crate::metadata::{
    MemberDef, MemberFlags, MemberKind, MemberRc, MemberSpec, Token, TypeDef, TypeRc,
    TypeUniverse, ValueKind,
};

// ================================================================================================
// Patch Definitions
// ================================================================================================

/// Declarative patch records
pub use crate::patch::{MutationOp, PatchDefinition, PatchPhase, ResultMutation, TargetDescriptor};

/// Suppliers of patch definitions
pub use crate::patch::{JsonPatchSource, MemoryPatchSource, PatchSource};

// ================================================================================================
// Engine
// ================================================================================================

/// The patch engine, its builder, configuration and reports
pub use crate::patcher::{
    EngineConfig, InstallReport, PatchEngine, PatchEngineBuilder, RegistrationReport,
};

// ================================================================================================
// Runtime
// ================================================================================================

/// Values and call contexts
pub use crate::runtime::{HostValue, InvocationContext, ObjectRef};

/// Interception
pub use crate::runtime::{InterceptionFacility, InterceptorTable, Thunk};

/// Host collaborators
pub use crate::runtime::{ActionDispatcher, ActionRegistry, ConditionEvaluator, QueryEvaluator};
