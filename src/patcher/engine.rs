//! The patch engine: load, register, compile and install, and tear it all
//! down again on reset.

use std::sync::Arc;

use crate::{
    metadata::{Token, TypeUniverse},
    patch::{PatchPhase, PatchSource},
    patcher::{
        compiler::ThunkCompiler,
        config::EngineConfig,
        registry::{PatchRegistry, RegistrationReport},
    },
    runtime::{ActionDispatcher, ConditionEvaluator, InterceptionFacility, Thunk},
    Error, Result,
};

/// Outcome of [`PatchEngine::initialize`], [`PatchEngine::reset`] and
/// [`PatchEngine::install_all`].
#[derive(Debug, Default)]
pub struct InstallReport {
    /// How the loaded definitions were bucketed; empty for `install_all`
    pub registration: RegistrationReport,
    /// Keys of the buckets whose thunk was installed
    pub installed: Vec<String>,
    /// Keys of the buckets the facility rejected, with the reason
    pub failed: Vec<(String, Error)>,
}

/// Owns the full patching pipeline for one identity.
///
/// The engine is single-writer: [`initialize`](Self::initialize),
/// [`reset`](Self::reset) and [`install_all`](Self::install_all) take
/// `&mut self` or run from a quiescent host. Installed thunks only read
/// immutable state and may run on any thread.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use dynpatch::prelude::*;
///
/// let universe = Arc::new(TypeUniverse::new());
/// let farmer = universe.insert_type(TypeDef::new("Game", "Farmer", "Game"));
/// let level = universe.add_member(farmer.token, MemberSpec::method("Level").returns("int"))?;
///
/// let table = Arc::new(InterceptorTable::new(universe.clone()));
/// let source = MemoryPatchSource::new(vec![
///     PatchDefinition::new("bonus", TargetDescriptor::method("Game.Farmer", "Level"), PatchPhase::After)
///         .with_mutation(MutationOp::Add, "2"),
/// ]);
///
/// let mut engine = PatchEngine::builder()
///     .universe(universe)
///     .source(Arc::new(source))
///     .conditions(Arc::new(QueryEvaluator::new()))
///     .actions(Arc::new(ActionRegistry::new()))
///     .facility(table.clone())
///     .build()?;
///
/// let report = engine.initialize()?;
/// assert_eq!(report.installed.len(), 1);
///
/// let result = table.invoke(&InvocationContext::new(&level), |_| HostValue::I32(3));
/// assert_eq!(result, HostValue::I32(5));
/// # Ok::<(), dynpatch::Error>(())
/// ```
pub struct PatchEngine {
    universe: Arc<TypeUniverse>,
    source: Arc<dyn PatchSource>,
    facility: Arc<dyn InterceptionFacility>,
    compiler: ThunkCompiler,
    registry: PatchRegistry,
    config: EngineConfig,
    initialized: bool,
}

impl PatchEngine {
    /// Starts building an engine.
    #[must_use]
    pub fn builder() -> PatchEngineBuilder {
        PatchEngineBuilder::default()
    }

    /// Loads, registers and installs every patch.
    ///
    /// Calling this on an initialized engine does nothing; use
    /// [`reset`](Self::reset) to reload.
    ///
    /// # Errors
    ///
    /// Returns the source's error if the definitions cannot be loaded. Nothing
    /// is registered or installed in that case. Resolution and installation
    /// failures are not errors; they are logged and listed in the report.
    pub fn initialize(&mut self) -> Result<InstallReport> {
        if self.initialized {
            tracing::debug!(identity = %self.config.identity, "Dynamic patcher already initialized");
            return Ok(InstallReport::default());
        }

        let definitions = self.source.load()?;
        if definitions.is_empty() {
            tracing::trace!("No patches found.");
            return Ok(InstallReport::default());
        }

        let registration = self.registry.register(definitions);
        let mut report = self.install_all();
        report.registration = registration;

        tracing::debug!(
            identity = %self.config.identity,
            installed = report.installed.len(),
            failed = report.failed.len(),
            unresolved = report.registration.unresolved.len(),
            "Dynamic patcher initialized"
        );
        self.initialized = true;
        Ok(report)
    }

    /// Compiles and installs a thunk for every registered bucket.
    ///
    /// A bucket the facility rejects is logged and skipped.
    pub fn install_all(&self) -> InstallReport {
        let mut report = InstallReport::default();

        for phase in [PatchPhase::Before, PatchPhase::After] {
            for bucket in self.registry.buckets(phase) {
                let thunk = self.compiler.compile(bucket);
                let identity = self.config.identity.as_str();
                let installed = match phase {
                    PatchPhase::Before => self.facility.install_before(identity, bucket.member(), thunk),
                    PatchPhase::After => self.facility.install_after(identity, bucket.member(), thunk),
                };

                match installed {
                    Ok(()) => report.installed.push(bucket.key().to_string()),
                    Err(error) => {
                        tracing::error!(
                            member = %bucket.member().full_name(),
                            %phase,
                            "Failed to dynamically patch '{}' ({phase}): {error}",
                            bucket.key()
                        );
                        report.failed.push((bucket.key().to_string(), error));
                    }
                }
            }
        }

        report
    }

    /// Removes everything this engine installed and initializes again.
    ///
    /// Must not run while a patched call is in flight.
    ///
    /// # Errors
    ///
    /// Returns the source's error if the definitions cannot be reloaded. The
    /// engine is then left empty and uninitialized.
    pub fn reset(&mut self) -> Result<InstallReport> {
        self.initialized = false;
        self.registry.clear();
        let removed = self
            .facility
            .remove_all_installed_by(&self.config.identity);

        tracing::trace!(identity = %self.config.identity, removed, "Dynamic patcher has been reset.");

        self.initialize()
    }

    /// Compiles the thunk for `member` and `phase` from the current buckets.
    ///
    /// Returns `None` with a warning if nothing is registered for it.
    #[must_use]
    pub fn thunk_for(&self, member: Token, phase: PatchPhase) -> Option<Thunk> {
        match self.registry.bucket_for(member, phase) {
            Some(bucket) => Some(self.compiler.compile(bucket)),
            None => {
                let name = self
                    .universe
                    .get_member(member)
                    .map_or_else(|| member.to_string(), |m| m.full_name());
                tracing::warn!(%phase, "No dynamic patches found for method '{name}'");
                None
            }
        }
    }

    /// Returns `true` once patches have been installed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The bucket registry.
    #[must_use]
    pub fn registry(&self) -> &PatchRegistry {
        &self.registry
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The type universe targets resolve against.
    #[must_use]
    pub fn universe(&self) -> &Arc<TypeUniverse> {
        &self.universe
    }
}

impl std::fmt::Debug for PatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchEngine")
            .field("config", &self.config)
            .field("initialized", &self.initialized)
            .field("bucket_count", &self.registry.bucket_count())
            .finish_non_exhaustive()
    }
}

/// Assembles a [`PatchEngine`] from its collaborators.
#[derive(Default)]
pub struct PatchEngineBuilder {
    universe: Option<Arc<TypeUniverse>>,
    source: Option<Arc<dyn PatchSource>>,
    conditions: Option<Arc<dyn ConditionEvaluator>>,
    actions: Option<Arc<dyn ActionDispatcher>>,
    facility: Option<Arc<dyn InterceptionFacility>>,
    config: EngineConfig,
}

impl PatchEngineBuilder {
    /// Sets the type universe.
    #[must_use]
    pub fn universe(mut self, universe: Arc<TypeUniverse>) -> Self {
        self.universe = Some(universe);
        self
    }

    /// Sets the patch source.
    #[must_use]
    pub fn source(mut self, source: Arc<dyn PatchSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the condition evaluator.
    #[must_use]
    pub fn conditions(mut self, conditions: Arc<dyn ConditionEvaluator>) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Sets the action dispatcher.
    #[must_use]
    pub fn actions(mut self, actions: Arc<dyn ActionDispatcher>) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Sets the interception facility.
    #[must_use]
    pub fn facility(mut self, facility: Arc<dyn InterceptionFacility>) -> Self {
        self.facility = Some(facility);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Builder`] naming the first missing collaborator.
    pub fn build(self) -> Result<PatchEngine> {
        let universe = self.universe.ok_or(Error::Builder("type universe"))?;
        let source = self.source.ok_or(Error::Builder("patch source"))?;
        let conditions = self.conditions.ok_or(Error::Builder("condition evaluator"))?;
        let actions = self.actions.ok_or(Error::Builder("action dispatcher"))?;
        let facility = self.facility.ok_or(Error::Builder("interception facility"))?;

        let compiler = ThunkCompiler::new(
            universe.clone(),
            conditions,
            actions,
            self.config.default_condition.clone(),
        );
        let registry = PatchRegistry::new(universe.clone())
            .with_duplicate_warning(self.config.warn_duplicate_ids);

        Ok(PatchEngine {
            universe,
            source,
            facility,
            compiler,
            registry,
            config: self.config,
            initialized: false,
        })
    }
}
