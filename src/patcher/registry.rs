//! Grouping of patch definitions into per-member, per-phase buckets.
//!
//! Each bucket is compiled into exactly one thunk, so the order of patches
//! inside a bucket is the order they run in at call time.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{
    metadata::{MemberRc, Token, TypeUniverse},
    patch::{PatchDefinition, PatchPhase},
    patcher::resolver::MethodResolver,
    Error,
};

/// The ordered patches of one member and phase.
#[derive(Clone, Debug)]
pub struct Bucket {
    key: String,
    member: MemberRc,
    phase: PatchPhase,
    patches: Vec<PatchDefinition>,
}

impl Bucket {
    /// Canonical key of the descriptor that created the bucket.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The resolved member.
    #[must_use]
    pub fn member(&self) -> &MemberRc {
        &self.member
    }

    /// Phase of every patch in the bucket.
    #[must_use]
    pub fn phase(&self) -> PatchPhase {
        self.phase
    }

    /// Patches in registration order.
    #[must_use]
    pub fn patches(&self) -> &[PatchDefinition] {
        &self.patches
    }
}

/// Structural view of a bucket, comparable across registrations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketSnapshot {
    /// Bucket key
    pub key: String,
    /// Phase
    pub phase: PatchPhase,
    /// Token of the resolved member
    pub member: Token,
    /// Patch ids in execution order
    pub patch_ids: Vec<String>,
}

/// Outcome of [`PatchRegistry::register`].
#[derive(Debug, Default)]
pub struct RegistrationReport {
    /// Ids of definitions placed in a bucket, in input order
    pub registered: Vec<String>,
    /// Ids of definitions dropped for having no effect
    pub inert: Vec<String>,
    /// Ids of definitions whose target did not resolve, with the reason
    pub unresolved: Vec<(String, Error)>,
}

impl RegistrationReport {
    /// Returns `true` if nothing was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }
}

#[derive(Debug, Default)]
struct PhaseBuckets {
    buckets: Vec<Bucket>,
    by_key: HashMap<String, usize>,
    by_member: HashMap<Token, usize>,
}

impl PhaseBuckets {
    fn clear(&mut self) {
        self.buckets.clear();
        self.by_key.clear();
        self.by_member.clear();
    }
}

/// Owns every bucket of an engine.
///
/// Registration is append-only: a definition whose key was already seen for
/// its phase joins that bucket without being resolved again, and a new key
/// resolving to an already-bucketed member joins that member's bucket. At
/// most one bucket exists per member and phase.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use dynpatch::metadata::{MemberSpec, TypeDef, TypeUniverse};
/// use dynpatch::patch::{PatchDefinition, PatchPhase, TargetDescriptor};
/// use dynpatch::patcher::PatchRegistry;
///
/// let universe = Arc::new(TypeUniverse::new());
/// let shop = universe.insert_type(TypeDef::new("Game", "Shop", "Game"));
/// universe.add_member(shop.token, MemberSpec::method("Open"))?;
///
/// let mut registry = PatchRegistry::new(universe);
/// let target = TargetDescriptor::method("Game.Shop", "Open");
/// let report = registry.register(vec![
///     PatchDefinition::new("a", target.clone(), PatchPhase::Before).with_action("Log a"),
///     PatchDefinition::new("b", target.clone(), PatchPhase::Before).with_action("Log b"),
///     PatchDefinition::new("c", target, PatchPhase::Before),
/// ]);
///
/// assert_eq!(report.registered, ["a", "b"]);
/// assert_eq!(report.inert, ["c"]);
/// assert_eq!(registry.bucket_count(), 1);
/// # Ok::<(), dynpatch::Error>(())
/// ```
#[derive(Debug)]
pub struct PatchRegistry {
    universe: Arc<TypeUniverse>,
    before: PhaseBuckets,
    after: PhaseBuckets,
    seen_ids: HashSet<String>,
    warn_duplicate_ids: bool,
}

impl PatchRegistry {
    /// Creates an empty registry resolving against `universe`.
    #[must_use]
    pub fn new(universe: Arc<TypeUniverse>) -> Self {
        Self {
            universe,
            before: PhaseBuckets::default(),
            after: PhaseBuckets::default(),
            seen_ids: HashSet::new(),
            warn_duplicate_ids: true,
        }
    }

    /// Enables or disables the duplicate-id warning.
    #[must_use]
    pub fn with_duplicate_warning(mut self, warn: bool) -> Self {
        self.warn_duplicate_ids = warn;
        self
    }

    fn phase_mut(&mut self, phase: PatchPhase) -> &mut PhaseBuckets {
        match phase {
            PatchPhase::Before => &mut self.before,
            PatchPhase::After => &mut self.after,
        }
    }

    fn phase(&self, phase: PatchPhase) -> &PhaseBuckets {
        match phase {
            PatchPhase::Before => &self.before,
            PatchPhase::After => &self.after,
        }
    }

    /// Buckets every effective definition, in order.
    ///
    /// Inert definitions are dropped. A definition whose target does not
    /// resolve is logged and skipped; registration of the rest continues.
    pub fn register<I>(&mut self, definitions: I) -> RegistrationReport
    where
        I: IntoIterator<Item = PatchDefinition>,
    {
        let mut report = RegistrationReport::default();

        for definition in definitions {
            if definition.is_inert() {
                tracing::debug!(patch = %definition.id, "Ignoring dynamic patch without effects");
                report.inert.push(definition.id);
                continue;
            }

            if !self.seen_ids.insert(definition.id.clone()) && self.warn_duplicate_ids {
                tracing::warn!(patch = %definition.id, "Duplicate dynamic patch id");
            }

            let key = definition.target.bucket_key();
            let phase = definition.phase;

            if let Some(&index) = self.phase(phase).by_key.get(&key) {
                report.registered.push(definition.id.clone());
                self.phase_mut(phase).buckets[index].patches.push(definition);
                continue;
            }

            let member = match MethodResolver::new(&self.universe).resolve(&definition.target) {
                Ok(member) => member,
                Err(error) => {
                    tracing::error!(
                        patch = %definition.id,
                        "failed to get method from Target in dynamic patch '{}': {error}",
                        definition.id
                    );
                    report.unresolved.push((definition.id, error));
                    continue;
                }
            };

            report.registered.push(definition.id.clone());
            let buckets = self.phase_mut(phase);
            if let Some(&index) = buckets.by_member.get(&member.token) {
                tracing::debug!(
                    patch = %definition.id,
                    key = %key,
                    bucket = %buckets.buckets[index].key,
                    "Target resolved to an already patched member"
                );
                buckets.by_key.insert(key, index);
                buckets.buckets[index].patches.push(definition);
                continue;
            }

            let index = buckets.buckets.len();
            buckets.by_key.insert(key.clone(), index);
            buckets.by_member.insert(member.token, index);
            buckets.buckets.push(Bucket {
                key,
                member,
                phase,
                patches: vec![definition],
            });
        }

        report
    }

    /// Buckets of `phase`, in creation order.
    #[must_use]
    pub fn buckets(&self, phase: PatchPhase) -> &[Bucket] {
        &self.phase(phase).buckets
    }

    /// The bucket of `member` for `phase`.
    #[must_use]
    pub fn bucket_for(&self, member: Token, phase: PatchPhase) -> Option<&Bucket> {
        let buckets = self.phase(phase);
        buckets
            .by_member
            .get(&member)
            .and_then(|&index| buckets.buckets.get(index))
    }

    /// Total number of buckets across both phases.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.before.buckets.len() + self.after.buckets.len()
    }

    /// Returns `true` if no bucket exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bucket_count() == 0
    }

    /// Drops every bucket and forgets seen ids.
    pub fn clear(&mut self) {
        self.before.clear();
        self.after.clear();
        self.seen_ids.clear();
    }

    /// Ordered structural view of all buckets, before-phase first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<BucketSnapshot> {
        self.before
            .buckets
            .iter()
            .chain(&self.after.buckets)
            .map(|bucket| BucketSnapshot {
                key: bucket.key.clone(),
                phase: bucket.phase,
                member: bucket.member.token,
                patch_ids: bucket.patches.iter().map(|p| p.id.clone()).collect(),
            })
            .collect()
    }
}
