//! The interception seam and its in-process implementation.
//!
//! [`InterceptionFacility`] is how the engine installs compiled thunks. The
//! provided [`InterceptorTable`] keeps installed thunks in memory and runs them
//! around a caller-supplied original through [`InterceptorTable::invoke`].

use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    metadata::{MemberDef, MemberFlags, Token, TypeUniverse},
    patch::PatchPhase,
    runtime::{hook::thunk::Thunk, HostValue, InvocationContext},
    Error, Result,
};

/// Installs and removes interceptors, tracking who installed them.
///
/// Every installation is tagged with an owner identity so that one owner can
/// remove everything it installed without disturbing anyone else.
pub trait InterceptionFacility: Send + Sync {
    /// Installs `thunk` to run before `member`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Installation`] if the member cannot be intercepted.
    fn install_before(&self, owner: &str, member: &MemberDef, thunk: Thunk) -> Result<()>;

    /// Installs `thunk` to run after `member`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Installation`] if the member cannot be intercepted.
    fn install_after(&self, owner: &str, member: &MemberDef, thunk: Thunk) -> Result<()>;

    /// Removes every interceptor installed by `owner`, returning how many were removed.
    fn remove_all_installed_by(&self, owner: &str) -> usize;
}

#[derive(Clone)]
struct Installed {
    owner: String,
    thunk: Thunk,
}

/// In-memory [`InterceptionFacility`].
///
/// Interceptors are kept per member in installation order. Host code routes
/// calls to patchable members through [`InterceptorTable::invoke`].
///
/// # Examples
///
/// ```rust,ignore
/// let table = InterceptorTable::new(universe.clone());
/// let result = table.invoke(&ctx, |_| HostValue::I32(3));
/// ```
pub struct InterceptorTable {
    universe: Arc<TypeUniverse>,
    before: DashMap<Token, Vec<Installed>>,
    after: DashMap<Token, Vec<Installed>>,
}

impl InterceptorTable {
    /// Creates an empty table validating members against `universe`.
    #[must_use]
    pub fn new(universe: Arc<TypeUniverse>) -> Self {
        Self {
            universe,
            before: DashMap::new(),
            after: DashMap::new(),
        }
    }

    fn slots(&self, phase: PatchPhase) -> &DashMap<Token, Vec<Installed>> {
        match phase {
            PatchPhase::Before => &self.before,
            PatchPhase::After => &self.after,
        }
    }

    fn install(&self, phase: PatchPhase, owner: &str, member: &MemberDef, thunk: Thunk) -> Result<()> {
        let installation = |message: &str| Error::Installation {
            member: member.token,
            message: message.to_string(),
        };

        if self.universe.get_member(member.token).is_none() {
            return Err(installation("member is not registered"));
        }
        if member.flags.contains(MemberFlags::ABSTRACT) {
            return Err(installation("abstract members have no body to intercept"));
        }
        if thunk.member() != member.token {
            return Err(installation("thunk was compiled for a different member"));
        }
        if thunk.phase() != phase {
            return Err(installation("thunk was compiled for the other phase"));
        }

        tracing::debug!(
            owner,
            member = %member.full_name(),
            thunk = %thunk.name(),
            "Installed interceptor"
        );
        self.slots(phase)
            .entry(member.token)
            .or_default()
            .push(Installed {
                owner: owner.to_string(),
                thunk,
            });
        Ok(())
    }

    fn snapshot(&self, phase: PatchPhase, member: Token) -> Vec<Thunk> {
        self.slots(phase)
            .get(&member)
            .map(|entry| entry.iter().map(|i| i.thunk.clone()).collect())
            .unwrap_or_default()
    }

    /// Calls a member through its interceptors.
    ///
    /// Runs the before thunks, then `original`, then the after thunks with
    /// access to the result when the member returns a value. Thunks are
    /// snapshotted first, so they may install or remove interceptors safely.
    pub fn invoke<F>(&self, ctx: &InvocationContext<'_>, original: F) -> HostValue
    where
        F: FnOnce(&InvocationContext<'_>) -> HostValue,
    {
        let token = ctx.member.token;

        for thunk in self.snapshot(PatchPhase::Before, token) {
            thunk.invoke(ctx, None);
        }

        let mut result = original(ctx);

        for thunk in self.snapshot(PatchPhase::After, token) {
            if ctx.member.has_return() {
                thunk.invoke(ctx, Some(&mut result));
            } else {
                thunk.invoke(ctx, None);
            }
        }

        result
    }

    /// Number of interceptors installed on `member` for `phase`.
    #[must_use]
    pub fn installed_count(&self, member: Token, phase: PatchPhase) -> usize {
        self.slots(phase).get(&member).map_or(0, |entry| entry.len())
    }

    /// Returns `true` if anything is installed on `member`.
    #[must_use]
    pub fn is_patched(&self, member: Token) -> bool {
        self.installed_count(member, PatchPhase::Before) > 0
            || self.installed_count(member, PatchPhase::After) > 0
    }
}

impl InterceptionFacility for InterceptorTable {
    fn install_before(&self, owner: &str, member: &MemberDef, thunk: Thunk) -> Result<()> {
        self.install(PatchPhase::Before, owner, member, thunk)
    }

    fn install_after(&self, owner: &str, member: &MemberDef, thunk: Thunk) -> Result<()> {
        self.install(PatchPhase::After, owner, member, thunk)
    }

    fn remove_all_installed_by(&self, owner: &str) -> usize {
        let mut removed = 0;
        for slots in [&self.before, &self.after] {
            slots.retain(|_, installed| {
                let before = installed.len();
                installed.retain(|i| i.owner != owner);
                removed += before - installed.len();
                !installed.is_empty()
            });
        }
        tracing::debug!(owner, removed, "Removed interceptors");
        removed
    }
}

impl std::fmt::Debug for InterceptorTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorTable")
            .field("before_members", &self.before.len())
            .field("after_members", &self.after.len())
            .finish_non_exhaustive()
    }
}
