//! Engine integration tests.
//!
//! These drive the full pipeline through the public API: a host type universe,
//! an in-memory patch source, the bundled query evaluator and action registry,
//! and the in-memory interceptor table standing in for the host's calls.

use std::{
    io,
    sync::{Arc, Mutex},
};

use dynpatch::prelude::*;

/// Writer collecting formatted log output for assertions.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with every log event captured, returning its result and the log.
fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer.contents())
}

/// A small host program with a few patchable members.
struct Host {
    universe: Arc<TypeUniverse>,
    table: Arc<InterceptorTable>,
    source: Arc<MemoryPatchSource>,
    fired: Arc<Mutex<Vec<String>>>,
    hearts: MemberRc,
    name: MemberRc,
    stamina: MemberRc,
    emote: MemberRc,
}

impl Host {
    fn new() -> Self {
        let universe = Arc::new(TypeUniverse::new());
        let character = universe.insert_type(TypeDef::new("StardewValley", "Character", "Stardew Valley"));
        let farmer = universe.insert_type(
            TypeDef::new("StardewValley", "Farmer", "Stardew Valley")
                .with_base("StardewValley.Character"),
        );

        let name = universe
            .add_member(character.token, MemberSpec::method("getName").returns("string"))
            .unwrap();
        universe
            .add_member(farmer.token, MemberSpec::constructor())
            .unwrap();
        universe
            .add_member(farmer.token, MemberSpec::constructor().param("name", "string"))
            .unwrap();
        let hearts = universe
            .add_member(
                farmer.token,
                MemberSpec::method("getFriendshipHeartLevelForNPC")
                    .param("name", "string")
                    .returns("int"),
            )
            .unwrap();
        let stamina = universe
            .add_member(farmer.token, MemberSpec::getter("Stamina").returns("float"))
            .unwrap();
        let emote = universe
            .add_member(farmer.token, MemberSpec::method("doEmote").param("whichEmote", "int"))
            .unwrap();
        universe
            .add_member(
                farmer.token,
                MemberSpec::method("draw").flags(MemberFlags::ABSTRACT | MemberFlags::VIRTUAL),
            )
            .unwrap();

        Self {
            table: Arc::new(InterceptorTable::new(universe.clone())),
            universe,
            source: Arc::new(MemoryPatchSource::default()),
            fired: Arc::new(Mutex::new(Vec::new())),
            hearts,
            name,
            stamina,
            emote,
        }
    }

    fn engine(&self, definitions: Vec<PatchDefinition>) -> PatchEngine {
        self.source.replace(definitions).unwrap();

        let conditions = QueryEvaluator::new();
        conditions.register("ARG_IS", |args, ctx| {
            let expected = args.get(1).ok_or("ARG_IS needs a value")?;
            Ok(ctx
                .args
                .first()
                .and_then(HostValue::as_str)
                .is_some_and(|arg| arg == expected))
        });
        conditions.register("HAS_ACTOR", |_, ctx| Ok(ctx.actor.is_some()));

        let actions = ActionRegistry::new();
        let fired = self.fired.clone();
        actions.register("Record", move |args| {
            fired.lock().unwrap().push(args[1..].join(" "));
            Ok(())
        });
        actions.register("Fail", |_| Err("the mailbox is full".to_string()));

        PatchEngine::builder()
            .universe(self.universe.clone())
            .source(self.source.clone())
            .conditions(Arc::new(conditions))
            .actions(Arc::new(actions))
            .facility(self.table.clone())
            .config(EngineConfig::for_owner("Tests"))
            .build()
            .unwrap()
    }

    fn hearts_for(&self, npc: &str, original: i32) -> HostValue {
        let args = [HostValue::from(npc)];
        let ctx = InvocationContext::new(&self.hearts).with_args(&args);
        self.table.invoke(&ctx, |_| HostValue::I32(original))
    }

    fn fired(&self) -> Vec<String> {
        self.fired.lock().unwrap().clone()
    }
}

fn hearts_target() -> TargetDescriptor {
    TargetDescriptor::method("StardewValley.Farmer", "getFriendshipHeartLevelForNPC")
        .with_assembly("Stardew Valley")
        .with_params(["string"])
}

fn postfix(id: &str) -> PatchDefinition {
    PatchDefinition::new(id, hearts_target(), PatchPhase::After)
}

#[test]
fn test_inert_definitions_never_produce_a_bucket() -> Result<()> {
    let host = Host::new();
    let mut engine = host.engine(vec![
        postfix("inert").with_condition("TRUE"),
        PatchDefinition::new("inert-prefix", hearts_target(), PatchPhase::Before),
    ]);

    let report = engine.initialize()?;
    assert_eq!(report.registration.inert, ["inert", "inert-prefix"]);
    assert!(engine.registry().is_empty());
    assert!(report.installed.is_empty());
    assert!(!host.table.is_patched(host.hearts.token));
    Ok(())
}

#[test]
fn test_same_member_shares_one_bucket_in_order() -> Result<()> {
    let host = Host::new();
    let mut engine = host.engine(vec![
        postfix("first").with_action("Record first"),
        PatchDefinition::new("prefix", hearts_target(), PatchPhase::Before).with_action("Record prefix"),
        postfix("second").with_actions(["Record second"]),
        // Same member, different descriptor spelling
        PatchDefinition::new(
            "third",
            TargetDescriptor::method("StardewValley.Farmer", "getFriendshipHeartLevelForNPC"),
            PatchPhase::After,
        )
        .with_action("Record third"),
    ]);

    let report = engine.initialize()?;
    assert_eq!(report.installed.len(), 2);
    assert_eq!(host.table.installed_count(host.hearts.token, PatchPhase::After), 1);
    assert_eq!(host.table.installed_count(host.hearts.token, PatchPhase::Before), 1);

    host.hearts_for("Abigail", 0);
    assert_eq!(host.fired(), ["prefix", "first", "second", "third"]);
    Ok(())
}

#[test]
fn test_false_condition_suppresses_only_its_own_patch() -> Result<()> {
    let host = Host::new();
    let mut engine = host.engine(vec![
        postfix("abigail-only")
            .with_condition("ARG_IS Abigail")
            .with_mutation(MutationOp::Assign, "14")
            .with_action("Record abigail"),
        postfix("everyone").with_action("Record everyone"),
    ]);
    engine.initialize()?;

    assert_eq!(host.hearts_for("Abigail", 3), HostValue::I32(14));
    assert_eq!(host.hearts_for("Sebastian", 3), HostValue::I32(3));
    assert_eq!(host.fired(), ["abigail", "everyone", "everyone"]);
    Ok(())
}

#[test]
fn test_assign_then_add_yields_fifteen() -> Result<()> {
    let host = Host::new();
    let mut engine = host.engine(vec![
        postfix("assign").with_mutation(MutationOp::Assign, "10"),
        postfix("add").with_mutation(MutationOp::Add, "5"),
    ]);
    engine.initialize()?;

    for original in [-7, 0, 3, i32::MAX] {
        assert_eq!(host.hearts_for("Abigail", original), HostValue::I32(15));
    }
    Ok(())
}

#[test]
fn test_arithmetic_uses_live_value() -> Result<()> {
    let host = Host::new();
    let mut engine = host.engine(vec![
        postfix("double").with_mutation(MutationOp::Multiply, "2"),
        postfix("minus-one").with_mutation(MutationOp::Subtract, "1"),
        postfix("halve").with_mutation(MutationOp::Divide, "2"),
    ]);
    engine.initialize()?;

    assert_eq!(host.hearts_for("Abigail", 5), HostValue::I32(4));
    Ok(())
}

#[test]
fn test_one_thunk_serves_concurrent_calls() -> Result<()> {
    const THREADS: i32 = 8;
    const CALLS: i32 = 50;

    let host = Host::new();
    let mut engine = host.engine(vec![
        postfix("double").with_mutation(MutationOp::Multiply, "2").with_action("Record double"),
        postfix("plus-one").with_mutation(MutationOp::Add, "1").with_action("Record plus-one"),
    ]);
    engine.initialize()?;
    assert_eq!(host.table.installed_count(host.hearts.token, PatchPhase::After), 1);

    std::thread::scope(|scope| {
        for start in 0..THREADS {
            let host = &host;
            scope.spawn(move || {
                for call in 0..CALLS {
                    let original = start * 1000 + call;
                    assert_eq!(
                        host.hearts_for("Abigail", original),
                        HostValue::I32(original * 2 + 1)
                    );
                }
            });
        }
    });

    let fired = host.fired();
    assert_eq!(fired.len(), (THREADS * CALLS * 2) as usize);
    assert_eq!(fired.iter().filter(|f| *f == "double").count(), (THREADS * CALLS) as usize);
    Ok(())
}

#[test]
fn test_string_result_is_concatenated() -> Result<()> {
    let host = Host::new();
    let target = TargetDescriptor::method("StardewValley.Farmer", "getName");
    let mut engine = host.engine(vec![
        PatchDefinition::new("title", target.clone(), PatchPhase::After)
            .with_mutation(MutationOp::Add, " the Farmer"),
        PatchDefinition::new("multiply-is-concat", target, PatchPhase::After)
            .with_mutation(MutationOp::Multiply, "!"),
    ]);
    engine.initialize()?;

    let result = host
        .table
        .invoke(&InvocationContext::new(&host.name), |_| HostValue::from("Alex"));
    assert_eq!(result, HostValue::from("Alex the Farmer!"));
    Ok(())
}

#[test]
fn test_getter_float_mutation() -> Result<()> {
    let host = Host::new();
    let mut engine = host.engine(vec![PatchDefinition::new(
        "stamina",
        TargetDescriptor::getter("StardewValley.Farmer", "Stamina"),
        PatchPhase::After,
    )
    .with_mutation(MutationOp::Multiply, "1.5")]);
    engine.initialize()?;

    let result = host
        .table
        .invoke(&InvocationContext::new(&host.stamina), |_| HostValue::F32(100.0));
    assert_eq!(result, HostValue::F32(150.0));
    Ok(())
}

#[test]
fn test_condition_sees_call_context() -> Result<()> {
    let host = Host::new();
    let mut engine = host.engine(vec![PatchDefinition::new(
        "emote",
        TargetDescriptor::method("StardewValley.Farmer", "doEmote"),
        PatchPhase::Before,
    )
    .with_condition("HAS_ACTOR")
    .with_action("Record emote")]);
    engine.initialize()?;

    let args = [HostValue::I32(12)];
    let player = HostValue::from("player");
    let anonymous = InvocationContext::new(&host.emote).with_args(&args);
    host.table.invoke(&anonymous, |_| HostValue::Void);
    assert!(host.fired().is_empty());

    let with_actor = anonymous.with_actor(Some(&player));
    host.table.invoke(&with_actor, |_| HostValue::Void);
    assert_eq!(host.fired(), ["emote"]);
    Ok(())
}

#[test]
fn test_reset_reproduces_bucket_structure() -> Result<()> {
    let host = Host::new();
    let mut engine = host.engine(vec![
        postfix("a").with_action("Record a"),
        PatchDefinition::new("b", TargetDescriptor::method("StardewValley.Farmer", "getName"), PatchPhase::Before)
            .with_action("Record b"),
        postfix("c").with_mutation(MutationOp::Add, "1"),
    ]);

    engine.initialize()?;
    let first = engine.registry().snapshot();

    engine.reset()?;
    assert_eq!(engine.registry().snapshot(), first);
    engine.reset()?;
    assert_eq!(engine.registry().snapshot(), first);

    assert!(engine.is_initialized());
    assert_eq!(host.table.installed_count(host.hearts.token, PatchPhase::After), 1);
    assert_eq!(host.table.installed_count(host.name.token, PatchPhase::Before), 1);
    assert_eq!(host.hearts_for("Abigail", 1), HostValue::I32(2));
    Ok(())
}

#[test]
fn test_reset_leaves_other_owners_alone() -> Result<()> {
    let host = Host::new();
    let foreign = Thunk::new("foreign", host.hearts.token, PatchPhase::After, 0, |_, _| {});
    host.table.install_after("SomeoneElse", &host.hearts, foreign)?;

    let mut engine = host.engine(vec![postfix("a").with_action("Record a")]);
    engine.initialize()?;
    assert_eq!(host.table.installed_count(host.hearts.token, PatchPhase::After), 2);

    host.source.replace(Vec::new())?;
    let (report, logs) = capture_logs(|| engine.reset());
    assert!(report?.installed.is_empty());
    assert!(!engine.is_initialized());
    assert!(logs.contains("Dynamic patcher has been reset."));
    assert!(logs.contains("No patches found."));
    assert_eq!(host.table.installed_count(host.hearts.token, PatchPhase::After), 1);
    Ok(())
}

#[test]
fn test_constructor_resolution_error_mentions_params() -> Result<()> {
    let host = Host::new();
    let mut engine = host.engine(vec![
        PatchDefinition::new(
            "ctor",
            TargetDescriptor::constructor("StardewValley.Farmer")
                .with_assembly("Stardew Valley")
                .with_params(["int", "bool"]),
            PatchPhase::After,
        )
        .with_action("Record ctor"),
        postfix("fine").with_action("Record fine"),
    ]);

    let (report, logs) = capture_logs(|| engine.initialize());
    let report = report?;

    assert_eq!(report.registration.unresolved.len(), 1);
    let (id, error) = &report.registration.unresolved[0];
    assert_eq!(id, "ctor");
    assert!(matches!(error, Error::TargetResolution { .. }));
    assert!(error.to_string().contains("(int, bool)"));
    assert!(logs.contains("dynamic patch 'ctor'"));
    assert!(logs.contains("(int, bool)"));

    assert_eq!(report.registration.registered, ["fine"]);
    assert_eq!(report.installed.len(), 1);
    Ok(())
}

#[test]
fn test_constructor_target_resolves() -> Result<()> {
    let host = Host::new();
    let mut engine = host.engine(vec![PatchDefinition::new(
        "named-ctor",
        TargetDescriptor::constructor("StardewValley.Farmer").with_params(["string"]),
        PatchPhase::After,
    )
    .with_action("Record born")]);

    let report = engine.initialize()?;
    assert_eq!(report.installed, ["StardewValley.Farmer..ctor, "]);
    Ok(())
}

#[test]
fn test_failed_action_is_logged_and_work_continues() -> Result<()> {
    let host = Host::new();
    let mut engine = host.engine(vec![
        postfix("mail")
            .with_action("Fail AddMail Current HeartsMail")
            .with_actions(["Record after-failure"]),
        postfix("later").with_condition("ARG_IS Abigail").with_action("Record later"),
    ]);
    engine.initialize()?;

    let (result, logs) = capture_logs(|| host.hearts_for("Abigail", 2));
    assert_eq!(result, HostValue::I32(2));
    assert_eq!(host.fired(), ["after-failure", "later"]);
    assert!(logs.contains("WARN"));
    assert!(logs.contains("dynamic patch 'mail'"));
    assert!(logs.contains("Fail AddMail Current HeartsMail"));
    assert!(logs.contains("the mailbox is full"));
    Ok(())
}

#[test]
fn test_bad_literal_fails_only_that_patch() -> Result<()> {
    let host = Host::new();
    let mut engine = host.engine(vec![
        postfix("bad").with_mutation(MutationOp::Add, "five").with_action("Record bad"),
        postfix("good").with_mutation(MutationOp::Add, "5").with_action("Record good"),
    ]);

    let (report, logs) = capture_logs(|| engine.initialize());
    assert_eq!(report?.installed.len(), 1);
    assert!(logs.contains("'bad' cannot change the result"));

    assert_eq!(host.hearts_for("Abigail", 1), HostValue::I32(6));
    assert_eq!(host.fired(), ["good"]);
    Ok(())
}

#[test]
fn test_install_failure_is_contained_to_its_bucket() -> Result<()> {
    let host = Host::new();
    let mut engine = host.engine(vec![
        PatchDefinition::new("abstract", TargetDescriptor::method("StardewValley.Farmer", "draw"), PatchPhase::Before)
            .with_action("Record draw"),
        postfix("ok").with_action("Record ok"),
    ]);

    let (report, logs) = capture_logs(|| engine.initialize());
    let report = report?;
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(report.failed[0].1, Error::Installation { .. }));
    assert_eq!(report.installed.len(), 1);
    assert!(logs.contains("ERROR"));
    assert!(engine.is_initialized());
    Ok(())
}

#[test]
fn test_zero_patches_is_traced() -> Result<()> {
    let host = Host::new();
    let mut engine = host.engine(Vec::new());

    let (report, logs) = capture_logs(|| engine.initialize());
    assert!(report?.installed.is_empty());
    assert!(logs.contains("No patches found."));
    assert!(!engine.is_initialized());
    Ok(())
}

#[test]
fn test_source_failure_is_an_error() {
    let universe = Arc::new(TypeUniverse::new());
    let failing = || -> Result<Vec<PatchDefinition>> { Err(Error::PatchSource("content pipeline offline".into())) };
    let mut engine = PatchEngine::builder()
        .universe(universe.clone())
        .source(Arc::new(failing))
        .conditions(Arc::new(QueryEvaluator::new()))
        .actions(Arc::new(ActionRegistry::new()))
        .facility(Arc::new(InterceptorTable::new(universe)))
        .build()
        .unwrap();

    assert!(matches!(engine.initialize(), Err(Error::PatchSource(_))));
    assert!(!engine.is_initialized());
    assert!(engine.registry().is_empty());
}

#[test]
fn test_thunk_lookup_for_unpatched_member_warns() -> Result<()> {
    let host = Host::new();
    let mut engine = host.engine(vec![postfix("a").with_action("Record a")]);
    engine.initialize()?;

    let (thunk, logs) = capture_logs(|| engine.thunk_for(host.emote.token, PatchPhase::After));
    assert!(thunk.is_none());
    assert!(logs.contains("No dynamic patches found for method 'StardewValley.Farmer.doEmote'"));

    let thunk = engine.thunk_for(host.hearts.token, PatchPhase::After).unwrap();
    let (_, logs) = capture_logs(|| thunk.invoke(&InvocationContext::new(&host.emote), None));
    assert!(logs.contains("not compiled for"));
    assert!(host.fired().is_empty());
    Ok(())
}
