//! The callable installed around an intercepted member.

use std::{fmt, sync::Arc};

use crate::{
    metadata::Token,
    patch::PatchPhase,
    runtime::{HostValue, InvocationContext},
};

/// Body of a [`Thunk`].
///
/// Receives the call context and, for members with a return value invoked
/// after the original, the live result slot.
pub type ThunkFn = Arc<dyn Fn(&InvocationContext<'_>, Option<&mut HostValue>) + Send + Sync>;

/// A compiled interceptor for one member and phase.
///
/// Thunks are cheap to clone and immutable once built; the patch list they
/// run is captured when they are compiled.
#[derive(Clone)]
pub struct Thunk {
    name: String,
    member: Token,
    phase: PatchPhase,
    patch_count: usize,
    body: ThunkFn,
}

impl Thunk {
    /// Creates a thunk from its body.
    ///
    /// # Arguments
    ///
    /// * `name` - Diagnostic name, by convention the bucket key plus the phase
    /// * `member` - Token of the member the thunk intercepts
    /// * `phase` - Whether the thunk runs before or after the original
    /// * `patch_count` - Number of patches the body runs
    /// * `body` - The compiled behavior
    pub fn new<F>(
        name: impl Into<String>,
        member: Token,
        phase: PatchPhase,
        patch_count: usize,
        body: F,
    ) -> Self
    where
        F: Fn(&InvocationContext<'_>, Option<&mut HostValue>) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            member,
            phase,
            patch_count,
            body: Arc::new(body),
        }
    }

    /// Diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token of the intercepted member.
    #[must_use]
    pub fn member(&self) -> Token {
        self.member
    }

    /// Phase this thunk runs in.
    #[must_use]
    pub fn phase(&self) -> PatchPhase {
        self.phase
    }

    /// Number of patches the thunk runs per invocation.
    #[must_use]
    pub fn patch_count(&self) -> usize {
        self.patch_count
    }

    /// Runs the thunk.
    ///
    /// A context for a different member, or with the wrong number of
    /// arguments, is logged and otherwise ignored.
    pub fn invoke(&self, ctx: &InvocationContext<'_>, slot: Option<&mut HostValue>) {
        if ctx.member.token != self.member {
            tracing::warn!(
                thunk = %self.name,
                member = %ctx.member.full_name(),
                "Thunk invoked for a member it was not compiled for"
            );
            return;
        }
        if !ctx.arity_matches() {
            tracing::warn!(
                thunk = %self.name,
                expected = ctx.member.params.len(),
                actual = ctx.args.len(),
                "Thunk invoked with mismatched argument count"
            );
            return;
        }
        (self.body)(ctx, slot);
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thunk")
            .field("name", &self.name)
            .field("member", &self.member)
            .field("phase", &self.phase)
            .field("patch_count", &self.patch_count)
            .finish_non_exhaustive()
    }
}
