//! Compilation of a bucket into a single thunk.
//!
//! The thunk is a closure over an immutable, ordered list of compiled patches.
//! Everything that can be decided ahead of time is decided here: the condition
//! string, whether the patch touches the return slot, the parsed mutation
//! literal and the flattened action list. At call time each patch runs:
//!
//! 1. its condition; `false` skips the rest of this patch only,
//! 2. its mutation, against the live return slot, so mutations chain,
//! 3. its actions, single action first. A failed action is logged and the
//!    next one still runs.
//!
//! A patch whose mutation could not be planned, or faults at call time, skips
//! its remaining steps; the other patches are unaffected.

use std::sync::Arc;

use crate::{
    metadata::{MemberRc, TypeUniverse},
    patch::{PatchDefinition, PatchPhase},
    patcher::{mutation::MutationPlan, registry::Bucket},
    runtime::{ActionDispatcher, ConditionEvaluator, HostValue, InvocationContext, Thunk},
    Error,
};

#[derive(Debug)]
enum MutationStep {
    None,
    Apply(MutationPlan),
    Unusable(String),
}

#[derive(Debug)]
struct CompiledPatch {
    id: String,
    condition: String,
    mutation: MutationStep,
    actions: Vec<String>,
}

/// Builds [`Thunk`]s from buckets.
pub struct ThunkCompiler {
    universe: Arc<TypeUniverse>,
    conditions: Arc<dyn ConditionEvaluator>,
    actions: Arc<dyn ActionDispatcher>,
    default_condition: String,
}

impl ThunkCompiler {
    /// Creates a compiler wiring thunks to the given collaborators.
    ///
    /// # Arguments
    ///
    /// * `universe` - Source of literal parsers for reference-typed returns
    /// * `conditions` - Evaluates each patch's condition
    /// * `actions` - Runs each patch's actions
    /// * `default_condition` - Condition used for patches without one
    pub fn new(
        universe: Arc<TypeUniverse>,
        conditions: Arc<dyn ConditionEvaluator>,
        actions: Arc<dyn ActionDispatcher>,
        default_condition: impl Into<String>,
    ) -> Self {
        Self {
            universe,
            conditions,
            actions,
            default_condition: default_condition.into(),
        }
    }

    /// Compiles a bucket.
    #[must_use]
    pub fn compile(&self, bucket: &Bucket) -> Thunk {
        self.compile_patches(bucket.member(), bucket.phase(), bucket.patches())
    }

    /// Compiles `patches` into one thunk for `member` and `phase`.
    ///
    /// Never fails: a patch whose mutation cannot be planned is logged here
    /// and, at call time, stops after its condition.
    #[must_use]
    pub fn compile_patches(
        &self,
        member: &MemberRc,
        phase: PatchPhase,
        patches: &[PatchDefinition],
    ) -> Thunk {
        let compiled: Arc<[CompiledPatch]> = patches
            .iter()
            .map(|patch| self.compile_patch(member, phase, patch))
            .collect();

        let conditions = self.conditions.clone();
        let actions = self.actions.clone();
        let patch_count = compiled.len();

        Thunk::new(
            format!("{}_{}", member.full_name(), phase),
            member.token,
            phase,
            patch_count,
            move |ctx: &InvocationContext<'_>, mut slot: Option<&mut HostValue>| {
                for patch in compiled.iter() {
                    run_patch(
                        patch,
                        ctx,
                        slot.as_deref_mut(),
                        conditions.as_ref(),
                        actions.as_ref(),
                    );
                }
            },
        )
    }

    fn compile_patch(
        &self,
        member: &MemberRc,
        phase: PatchPhase,
        patch: &PatchDefinition,
    ) -> CompiledPatch {
        tracing::trace!(
            patch = %patch.id,
            member = %member.full_name(),
            %phase,
            "Adding {phase} dynamic patch '{}' to method '{}'",
            patch.id,
            member.name
        );

        let mutation = match &patch.change_result {
            None => MutationStep::None,
            Some(_) if phase != PatchPhase::After || !member.has_return() => {
                tracing::debug!(
                    patch = %patch.id,
                    "ChangeResult ignored: only postfixes on members with a return value can change it"
                );
                MutationStep::None
            }
            Some(change) => match MutationPlan::new(change, member.return_kind, &self.universe) {
                Ok(plan) => MutationStep::Apply(plan),
                Err(error) => {
                    tracing::warn!(
                        patch = %patch.id,
                        "Dynamic patch '{}' cannot change the result of '{}': {error}",
                        patch.id,
                        member.full_name()
                    );
                    MutationStep::Unusable(error.to_string())
                }
            },
        };

        CompiledPatch {
            id: patch.id.clone(),
            condition: patch.condition_or(&self.default_condition).to_string(),
            mutation,
            actions: patch.action_names().map(str::to_string).collect(),
        }
    }
}

impl std::fmt::Debug for ThunkCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThunkCompiler")
            .field("default_condition", &self.default_condition)
            .finish_non_exhaustive()
    }
}

fn run_patch(
    patch: &CompiledPatch,
    ctx: &InvocationContext<'_>,
    slot: Option<&mut HostValue>,
    conditions: &dyn ConditionEvaluator,
    actions: &dyn ActionDispatcher,
) {
    if !conditions.evaluate(&patch.condition, ctx) {
        return;
    }

    match &patch.mutation {
        MutationStep::None => {}
        MutationStep::Unusable(reason) => {
            tracing::trace!(patch = %patch.id, %reason, "Skipping dynamic patch with unusable ChangeResult");
            return;
        }
        MutationStep::Apply(plan) => {
            let Some(slot) = slot else {
                tracing::warn!(patch = %patch.id, "No return slot to change");
                return;
            };
            if let Err(error) = plan.apply(slot) {
                tracing::warn!(
                    patch = %patch.id,
                    "Failed to change result for dynamic patch '{}': {error}",
                    patch.id
                );
                return;
            }
        }
    }

    for action in &patch.actions {
        if let Err(message) = actions.dispatch(action) {
            let error = Error::ActionDispatch {
                patch: patch.id.clone(),
                action: action.clone(),
                message,
            };
            tracing::warn!(patch = %patch.id, action = %action, "{error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        metadata::{MemberSpec, TypeDef},
        patch::{MutationOp, TargetDescriptor},
    };

    struct Fixture {
        universe: Arc<TypeUniverse>,
        level: MemberRc,
        greet: MemberRc,
        fired: Arc<Mutex<Vec<String>>>,
    }

    impl Fixture {
        fn new() -> Self {
            let universe = Arc::new(TypeUniverse::new());
            let ty = universe.insert_type(TypeDef::new("Game", "Farmer", "Game"));
            let level = universe
                .add_member(ty.token, MemberSpec::method("Level").returns("int"))
                .unwrap();
            let greet = universe
                .add_member(ty.token, MemberSpec::method("Greet").param("who", "string"))
                .unwrap();
            Self {
                universe,
                level,
                greet,
                fired: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn compiler(&self) -> ThunkCompiler {
            let fired = self.fired.clone();
            let conditions = |condition: &str, _: &InvocationContext<'_>| condition != "FALSE";
            let actions = move |action: &str| -> Result<(), String> {
                fired.lock().unwrap().push(action.to_string());
                if action.starts_with("Fail") {
                    Err("boom".to_string())
                } else {
                    Ok(())
                }
            };
            ThunkCompiler::new(
                self.universe.clone(),
                Arc::new(conditions),
                Arc::new(actions),
                "TRUE",
            )
        }
    }

    fn patch(id: &str) -> PatchDefinition {
        PatchDefinition::new(id, TargetDescriptor::method("Game.Farmer", "Level"), PatchPhase::After)
    }

    #[test]
    fn test_mutations_chain_in_order() {
        let fixture = Fixture::new();
        let thunk = fixture.compiler().compile_patches(
            &fixture.level,
            PatchPhase::After,
            &[
                patch("a").with_mutation(MutationOp::Assign, "10"),
                patch("b").with_mutation(MutationOp::Add, "5"),
            ],
        );

        let mut result = HostValue::I32(-100);
        thunk.invoke(&InvocationContext::new(&fixture.level), Some(&mut result));
        assert_eq!(result, HostValue::I32(15));
        assert_eq!(thunk.patch_count(), 2);
    }

    #[test]
    fn test_false_condition_skips_only_that_patch() {
        let fixture = Fixture::new();
        let thunk = fixture.compiler().compile_patches(
            &fixture.level,
            PatchPhase::After,
            &[
                patch("off")
                    .with_condition("FALSE")
                    .with_mutation(MutationOp::Assign, "99")
                    .with_action("Off"),
                patch("on").with_mutation(MutationOp::Add, "1").with_action("On"),
            ],
        );

        let mut result = HostValue::I32(1);
        thunk.invoke(&InvocationContext::new(&fixture.level), Some(&mut result));
        assert_eq!(result, HostValue::I32(2));
        assert_eq!(*fixture.fired.lock().unwrap(), ["On"]);
    }

    #[test]
    fn test_failed_action_does_not_stop_later_work() {
        let fixture = Fixture::new();
        let thunk = fixture.compiler().compile_patches(
            &fixture.level,
            PatchPhase::After,
            &[
                patch("a").with_action("Fail first").with_actions(["Second"]),
                patch("b").with_action("Third"),
            ],
        );

        let mut result = HostValue::I32(0);
        thunk.invoke(&InvocationContext::new(&fixture.level), Some(&mut result));
        assert_eq!(
            *fixture.fired.lock().unwrap(),
            ["Fail first", "Second", "Third"]
        );
    }

    #[test]
    fn test_unusable_mutation_skips_patch_actions() {
        let fixture = Fixture::new();
        let thunk = fixture.compiler().compile_patches(
            &fixture.level,
            PatchPhase::After,
            &[
                patch("bad").with_mutation(MutationOp::Add, "lots").with_action("Bad"),
                patch("zero").with_mutation(MutationOp::Divide, "0").with_action("Zero"),
                patch("good").with_mutation(MutationOp::Multiply, "3").with_action("Good"),
            ],
        );

        let mut result = HostValue::I32(2);
        thunk.invoke(&InvocationContext::new(&fixture.level), Some(&mut result));
        assert_eq!(result, HostValue::I32(6));
        assert_eq!(*fixture.fired.lock().unwrap(), ["Good"]);
    }

    #[test]
    fn test_prefix_ignores_change_result() {
        let fixture = Fixture::new();
        let thunk = fixture.compiler().compile_patches(
            &fixture.level,
            PatchPhase::Before,
            &[patch("pre").with_mutation(MutationOp::Assign, "1").with_action("Pre")],
        );
        thunk.invoke(&InvocationContext::new(&fixture.level), None);
        assert_eq!(*fixture.fired.lock().unwrap(), ["Pre"]);
        assert_eq!(thunk.phase(), PatchPhase::Before);
    }

    #[test]
    fn test_void_member_runs_actions() {
        let fixture = Fixture::new();
        let target = TargetDescriptor::method("Game.Farmer", "Greet");
        let thunk = fixture.compiler().compile_patches(
            &fixture.greet,
            PatchPhase::After,
            &[PatchDefinition::new("hello", target, PatchPhase::After)
                .with_mutation(MutationOp::Add, "1")
                .with_action("Hello")],
        );
        let args = [HostValue::from("Abigail")];
        thunk.invoke(&InvocationContext::new(&fixture.greet).with_args(&args), None);
        assert_eq!(*fixture.fired.lock().unwrap(), ["Hello"]);
    }
}
