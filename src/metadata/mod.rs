//! Type universe of the patched host program.
//!
//! This module replaces runtime reflection with an explicit registration table.
//! The host registers the types and members it exposes; the patcher resolves
//! textual target descriptors against it.
//!
//! # Key Components
//!
//! - [`Token`](token::Token) - Handle for registered types and members
//! - [`ValueKind`] - Representation of parameters and return values, with parse rules
//! - [`TypeDef`] / [`MemberDef`] - Registered types and callable members
//! - [`MemberSpec`] - Name-based description of a member to register
//! - [`TypeUniverse`] - Concurrent registry with token and name indices

pub mod kind;
pub mod token;
pub mod types;
pub mod universe;

pub use kind::{resolve_alias, ValueKind, PRIMITIVE_ALIASES};
pub use token::Token;
pub use types::{
    LiteralParser, MemberDef, MemberFlags, MemberKind, MemberRc, MemberSpec, ParamDef, TypeDef,
    TypeRc,
};
pub use universe::{TypeUniverse, CORE_ASSEMBLY};
