// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # dynpatch
//!
//! A declarative runtime-patching engine. Patch authors describe what should
//! happen around a member of a host program, and `dynpatch` turns every
//! patched member into a single interceptor that runs those patches in order.
//!
//! ## Features
//!
//! - **Declarative patches** - PascalCase JSON records, loaded from text or files
//! - **Explicit type universe** - The host registers patchable types and members
//!   up front; no runtime reflection
//! - **One thunk per member and phase** - All patches on a member are folded into
//!   one closure over an immutable, ordered patch list
//! - **Typed result mutation** - Assign and wrapping arithmetic in the return
//!   type's own width, string concatenation, parser-backed reference types
//! - **Contained failures** - A bad patch, bucket or action is logged and
//!   skipped; the rest keep working
//! - **Reset** - Tear down everything one engine installed and reload
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use dynpatch::prelude::*;
//!
//! // Describe the host program
//! let universe = Arc::new(TypeUniverse::new());
//! let farmer = universe.insert_type(TypeDef::new("StardewValley", "Farmer", "Stardew Valley"));
//! let hearts = universe.add_member(
//!     farmer.token,
//!     MemberSpec::method("getFriendshipHeartLevelForNPC")
//!         .param("name", "string")
//!         .returns("int"),
//! )?;
//!
//! // Patches, as authored
//! let source = JsonPatchSource::from_text(r#"[
//!     {
//!         "Id": "Example.MoreHearts",
//!         "Target": {
//!             "Type": "StardewValley.Farmer",
//!             "Method": "getFriendshipHeartLevelForNPC",
//!             "Parameters": ["string"]
//!         },
//!         "PatchType": "Postfix",
//!         "ChangeResult": { "Operation": "Add", "Value": "2" }
//!     }
//! ]"#);
//!
//! // Wire the engine
//! let table = Arc::new(InterceptorTable::new(universe.clone()));
//! let mut engine = PatchEngine::builder()
//!     .universe(universe)
//!     .source(Arc::new(source))
//!     .conditions(Arc::new(QueryEvaluator::new()))
//!     .actions(Arc::new(ActionRegistry::new()))
//!     .facility(table.clone())
//!     .config(EngineConfig::for_owner("Example"))
//!     .build()?;
//! engine.initialize()?;
//!
//! // The host calls the member through the table
//! let args = [HostValue::from("Abigail")];
//! let ctx = InvocationContext::new(&hearts).with_args(&args);
//! let result = table.invoke(&ctx, |_| HostValue::I32(4));
//! assert_eq!(result, HostValue::I32(6));
//! # Ok::<(), dynpatch::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - The type universe targets are resolved against
//! - [`patch`] - Patch definitions and their sources
//! - [`patcher`] - Resolution, registration, compilation and installation
//! - [`runtime`] - Values, call contexts, interception and host collaborators
//!
//! ## Logging
//!
//! All diagnostics go through [`tracing`]. The crate never installs a
//! subscriber; hosts route the events wherever they log.

pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dynpatch::prelude::*;
///
/// let universe = TypeUniverse::new();
/// assert!(universe.resolve_type_name("int").is_some());
/// ```
pub mod prelude;

/// Type universe of the patched host program.
///
/// # Key Components
///
/// - [`metadata::TypeUniverse`] - Registration table of types and members
/// - [`metadata::ValueKind`] - Value representations and literal parse rules
/// - [`metadata::Token`] - Handles for registered types and members
pub mod metadata;

/// Patch definitions and the sources that supply them.
pub mod patch;

/// Resolution, registration, thunk compilation and installation.
///
/// The entry point is [`PatchEngine`].
pub mod patcher;

/// Values, call contexts, interception and host collaborators.
pub mod runtime;

/// `dynpatch` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dynpatch` Error type
///
/// # Examples
///
/// ```rust
/// use dynpatch::{patch::{JsonPatchSource, PatchSource}, Error};
///
/// match JsonPatchSource::from_text("not json").load() {
///     Ok(_) => unreachable!(),
///     Err(Error::Json(e)) => println!("malformed patches: {e}"),
///     Err(e) => println!("Error: {e}"),
/// }
/// ```
pub use error::Error;

/// The patch engine and its builder.
pub use patcher::{EngineConfig, PatchEngine, PatchEngineBuilder};
