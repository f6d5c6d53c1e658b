use thiserror::Error;

use crate::metadata::token::Token;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Most of these never escape the engine: resolution, literal and dispatch failures are
/// contained to the single definition, patch or action that caused them and only surface
/// through the log. They are still modelled as values so every component can return an
/// explicit `Result` instead of panicking.
///
/// # Error Categories
///
/// ## Registration Errors
/// - [`Error::TargetResolution`] - A target descriptor did not resolve to a member
///
/// ## Mutation Errors
/// - [`Error::UnparsableLiteral`] - A mutation literal does not parse into the return type
/// - [`Error::UnsupportedMutation`] - The operation is not defined for the return type
/// - [`Error::ArithmeticFault`] - The operation failed at call time (e.g. division by zero)
///
/// ## Type Universe Errors
/// - [`Error::UnknownType`] - A type name is not registered
/// - [`Error::RecursionLimit`] - A base-type chain is cyclic or too deep
///
/// ## Collaborator Errors
/// - [`Error::ActionDispatch`] - The action dispatcher reported a failure
/// - [`Error::Installation`] - The interception facility rejected an interceptor
/// - [`Error::PatchSource`] - The patch source could not produce definitions
///
/// ## I/O and Infrastructure
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::Json`] - Malformed JSON patch data
/// - [`Error::LockError`] - A poisoned lock
/// - [`Error::Builder`] - An incomplete engine configuration
///
/// # Examples
///
/// ```rust
/// use dynpatch::{Error, PatchEngine};
///
/// match PatchEngine::builder().build() {
///     Ok(_) => unreachable!(),
///     Err(Error::Builder(missing)) => println!("incomplete engine: {missing}"),
///     Err(e) => println!("other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A target descriptor could not be resolved to a callable member.
    ///
    /// Always carries the attempted descriptor in its display form and a
    /// human-readable cause naming the type, member, assembly and parameter list.
    #[error("failed to resolve target '{target}': {cause}")]
    TargetResolution {
        /// Display form of the attempted descriptor
        target: String,
        /// Why resolution failed
        cause: String,
    },

    /// A result-mutation literal could not be parsed into the member's return type.
    #[error("could not parse '{literal}' as {kind}: {cause}")]
    UnparsableLiteral {
        /// The literal as written in the patch definition
        literal: String,
        /// Name of the return kind the literal was parsed for
        kind: String,
        /// Parser message
        cause: String,
    },

    /// The mutation operation is not defined for the return kind.
    #[error("operation '{operation}' is not supported on {kind} results")]
    UnsupportedMutation {
        /// The requested operation
        operation: String,
        /// Name of the return kind
        kind: String,
    },

    /// A mutation failed while combining values at call time.
    #[error("arithmetic fault: {0}")]
    ArithmeticFault(String),

    /// The external action dispatcher reported a failure.
    #[error("failed to run action '{action}' for dynamic patch '{patch}': {message}")]
    ActionDispatch {
        /// Id of the patch that fired the action
        patch: String,
        /// The action string that was dispatched
        action: String,
        /// Dispatcher message
        message: String,
    },

    /// The interception facility rejected an interceptor.
    #[error("failed to install interceptor on {member}: {message}")]
    Installation {
        /// Token of the member the interceptor was meant for
        member: Token,
        /// Facility message
        message: String,
    },

    /// A type name could not be found in the type universe.
    #[error("could not find type '{0}' in the type universe")]
    UnknownType(String),

    /// Walking a type's base chain exceeded the depth limit.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// The patch source could not produce a definition list.
    ///
    /// Raised for a JSON document whose root is not an array, and available to
    /// host-written sources.
    #[error("patch source failure: {0}")]
    PatchSource(String),

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Malformed JSON patch data.
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// Failed to lock target.
    #[error("Failed to lock target")]
    LockError,

    /// The engine builder is missing a required collaborator.
    #[error("incomplete engine configuration - missing {0}")]
    Builder(&'static str),
}

impl Error {
    /// Returns `true` for errors that are contained to a single patch at call time.
    #[must_use]
    pub fn is_patch_local(&self) -> bool {
        matches!(
            self,
            Error::UnparsableLiteral { .. }
                | Error::UnsupportedMutation { .. }
                | Error::ArithmeticFault(_)
                | Error::ActionDispatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_error_display() {
        let err = Error::TargetResolution {
            target: "Game.Farmer..ctor, Game".to_string(),
            cause: "could not find constructor".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to resolve target 'Game.Farmer..ctor, Game': could not find constructor"
        );
        assert!(!err.is_patch_local());
    }

    #[test]
    fn test_dispatch_error_is_patch_local() {
        let err = Error::ActionDispatch {
            patch: "p1".to_string(),
            action: "AddMail Current x".to_string(),
            message: "unknown action".to_string(),
        };
        assert!(err.is_patch_local());
        assert!(err.to_string().contains("'p1'"));
        assert!(err.to_string().contains("AddMail Current x"));
    }
}
