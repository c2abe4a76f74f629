//! Integration tests for the full resolution pipeline

use std::sync::{Arc, Once};

use quarry_foundation::{EntityId, Type, Value};
use quarry_resolve::{
    ActionDefinition, DiagnosticRecord, RecordingReporter, RejectionKind, RejectionReason, ResolutionContext,
    ResolverConfig, SlotValidation, Stage, TargetResolver, TargetSlot,
};
use quarry_scope::{ScopeCache, ScopeRegistry};
use quarry_storage::World;

static TRACING: Once = Once::new();

/// Installs a test subscriber once; `RUST_LOG=quarry_resolve=trace` shows the pipeline.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

// =============================================================================
// Fixture
// =============================================================================

struct Market {
    world: World,
    square: EntityId,
    player: EntityId,
    merchant: EntityId,
    beggar: EntityId,
    apple: EntityId,
    ring: EntityId,
}

fn market() -> Market {
    let (world, square) = World::new().spawn_with([("core:room", Value::Bool(true))]);
    let (world, apple) = world.spawn_with([("core:item", Value::map([("value", Value::Int(1))]))]);
    let (world, ring) = world.spawn_with([
        ("core:item", Value::map([("value", Value::Int(50))])),
        ("core:cursed", Value::Bool(true)),
    ]);
    let (world, player) = world.spawn_with([
        ("core:actor", Value::Bool(true)),
        ("core:inventory", Value::from(vec![apple, ring])),
    ]);
    let (world, merchant) = world.spawn_with([
        ("core:actor", Value::Bool(true)),
        ("core:trader", Value::map([("buys", Value::Int(10))])),
    ]);
    let (world, beggar) = world.spawn_with([("core:actor", Value::Bool(true))]);
    let world = world.place(player, square).unwrap();
    let world = world.place(merchant, square).unwrap();
    let world = world.place(beggar, square).unwrap();

    Market {
        world,
        square,
        player,
        merchant,
        beggar,
        apple,
        ring,
    }
}

fn context(m: &Market) -> ResolutionContext {
    ResolutionContext::new(m.player).with_location(m.square)
}

fn give() -> ActionDefinition {
    ActionDefinition::builder("core:give")
        .slot(TargetSlot::new("item", "actor.core:inventory[]").with_validation(SlotValidation::lacks("core:cursed")))
        .slot(TargetSlot::new("recipient", "at(location)").with_validation(SlotValidation::has("core:actor")))
        .constraint("not-self", "(!= recipient actor)")
        .build()
        .unwrap()
}

// =============================================================================
// Pipeline
// =============================================================================

#[test]
fn structural_and_cross_slot_rejections_are_counted() {
    init_tracing();
    let m = market();
    let result = TargetResolver::new(&m.world).resolve(&give(), &context(&m)).unwrap();

    // apple -> merchant, apple -> beggar survive; the ring is cursed and the
    // player cannot give to themselves.
    assert_eq!(result.options("item"), vec![m.apple]);
    assert_eq!(result.options("recipient"), vec![m.merchant, m.beggar]);
    assert_eq!(result.candidates.len(), 2);

    let d = &result.diagnostics;
    assert_eq!(d.rejected, 4);
    assert_eq!(d.rejections.get(&RejectionKind::ForbiddenComponent), Some(&3));
    assert_eq!(d.rejections.get(&RejectionKind::ConstraintFailed), Some(&2));
}

#[test]
fn rejected_candidates_keep_every_reason() {
    let m = market();
    let result = TargetResolver::new(&m.world).resolve(&give(), &context(&m)).unwrap();

    let ring_to_self = result
        .diagnostics
        .records
        .iter()
        .find_map(|record| match record {
            DiagnosticRecord::CandidateRejected { candidate, reasons }
                if candidate.get("item") == Some(m.ring) && candidate.get("recipient") == Some(m.player) =>
            {
                Some(reasons.clone())
            }
            _ => None,
        })
        .unwrap();

    assert_eq!(
        ring_to_self,
        vec![
            RejectionReason::ForbiddenComponent {
                slot: "item".to_string(),
                component: "core:cursed".to_string(),
            },
            RejectionReason::ConstraintFailed {
                constraint: "not-self".to_string(),
            },
        ]
    );
}

#[test]
fn field_checks_and_constraints_reading_targets() {
    let m = market();
    let sell = ActionDefinition::builder("core:sell")
        .slot(TargetSlot::new("item", "actor.core:inventory[]"))
        .slot(
            TargetSlot::new("buyer", "at(location)")
                .with_validation(SlotValidation::field_type("core:trader", "buys", Type::Int)),
        )
        .constraint("affordable", "(<= item.core:item.value targets.buyer.core:trader.buys)")
        .build()
        .unwrap();
    let result = TargetResolver::new(&m.world).resolve(&sell, &context(&m)).unwrap();

    assert_eq!(result.candidates.len(), 1);
    assert_eq!(result.candidates[0].get("item"), Some(m.apple));
    assert_eq!(result.candidates[0].get("buyer"), Some(m.merchant));
    assert_eq!(result.diagnostics.rejections.get(&RejectionKind::FieldTypeMismatch), Some(&4));
}

#[test]
fn distinct_targets_rejects_reuse() {
    let m = market();
    let introduce = ActionDefinition::builder("core:introduce")
        .slot(TargetSlot::new("first", "at(location)[(!= entity actor)]"))
        .slot(TargetSlot::new("second", "at(location)[(!= entity actor)]"))
        .distinct_targets()
        .build()
        .unwrap();
    let result = TargetResolver::new(&m.world).resolve(&introduce, &context(&m)).unwrap();

    assert_eq!(result.candidates.len(), 2);
    assert_eq!(result.diagnostics.rejections.get(&RejectionKind::DuplicateTarget), Some(&2));
}

#[test]
fn named_scopes_through_the_resolver() {
    let m = market();
    let registry = ScopeRegistry::new()
        .with_scope("market:traders", "at(location)[(!= entity.core:trader nil)]")
        .unwrap();
    let haggle = ActionDefinition::new("market:haggle", vec![TargetSlot::new("with", "market:traders")]).unwrap();
    let result = TargetResolver::new(&m.world)
        .with_registry(registry)
        .resolve(&haggle, &context(&m))
        .unwrap();

    assert_eq!(result.options("with"), vec![m.merchant]);
}

#[test]
fn depth_limit_degrades_the_slot() {
    let m = market();
    let action = ActionDefinition::new("core:deep", vec![TargetSlot::new("x", "(((actor)))")]).unwrap();
    let result = TargetResolver::new(&m.world)
        .with_config(ResolverConfig::new().with_max_scope_depth(2))
        .resolve(&action, &context(&m))
        .unwrap();

    assert!(!result.is_available());
    let slot = result.diagnostics.slot("x").unwrap();
    assert!(slot.error.as_deref().is_some_and(|e| e.contains("max scope depth")));
    assert!(slot.unsatisfied);
}

#[test]
fn runtime_type_mismatch_degrades_only_its_slot() {
    init_tracing();
    let m = market();
    let action = ActionDefinition::new(
        "core:juggle",
        vec![
            TargetSlot::new("item", "actor.core:inventory[]"),
            TargetSlot::new("flag", "actor.core:actor[]").optional(),
        ],
    )
    .unwrap();
    let result = TargetResolver::new(&m.world).resolve(&action, &context(&m)).unwrap();

    let flag = result.diagnostics.slot("flag").unwrap();
    assert!(flag.error.as_deref().is_some_and(|e| e.contains("type mismatch")));
    assert!(!flag.unsatisfied);

    let item = result.diagnostics.slot("item").unwrap();
    assert!(item.error.is_none());
    assert_eq!(item.kept, 2);
    assert_eq!(result.options("item"), vec![m.apple, m.ring]);
    assert!(result.candidates.iter().all(|c| c.get("flag").is_none()));
    assert_eq!(result.diagnostics.records_with_code("scope_error").count(), 1);
}

#[test]
fn pathologically_nested_scope_degrades_only_its_slot() {
    init_tracing();
    let m = market();
    let depth = 200_000;
    let deep = format!("{}actor{}", "(".repeat(depth), ")".repeat(depth));
    let action = ActionDefinition::new(
        "core:ponder",
        vec![
            TargetSlot::new("deep", deep).optional(),
            TargetSlot::new("item", "actor.core:inventory[]"),
        ],
    )
    .unwrap();
    let result = TargetResolver::new(&m.world).resolve(&action, &context(&m)).unwrap();

    let slot = result.diagnostics.slot("deep").unwrap();
    assert!(slot.error.as_deref().is_some_and(|e| e.contains("max parse depth")));
    assert_eq!(result.candidates.len(), 2);
    assert_eq!(result.options("item"), vec![m.apple, m.ring]);
}

#[test]
fn reporter_mirrors_diagnostics() {
    let m = market();
    let reporter = Arc::new(RecordingReporter::new());
    let result = TargetResolver::new(&m.world)
        .with_reporter(reporter.clone())
        .resolve(&give(), &context(&m))
        .unwrap();

    let mirrored: Vec<DiagnosticRecord> = reporter.records().into_iter().map(|(_, r)| r).collect();
    assert_eq!(mirrored, result.diagnostics.records);
    assert_eq!(reporter.stages(), vec![Stage::Ordering, Stage::Validation, Stage::Complete]);
}

#[test]
fn shared_cache_across_actions() {
    let m = market();
    let resolver = TargetResolver::new(&m.world);
    let mut cache = ScopeCache::new();
    let look = ActionDefinition::new("core:look", vec![TargetSlot::new("thing", "at(location)")]).unwrap();

    resolver.resolve_with_cache(&give(), &context(&m), &mut cache).unwrap();
    let result = resolver.resolve_with_cache(&look, &context(&m), &mut cache).unwrap();

    assert_eq!(result.options("thing"), vec![m.player, m.merchant, m.beggar]);
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn shared_cache_keeps_registries_apart() {
    let m = market();
    let pick = ActionDefinition::new("market:point", vec![TargetSlot::new("spot", "market:pick")]).unwrap();
    let picks_self = TargetResolver::new(&m.world)
        .with_registry(ScopeRegistry::new().with_scope("market:pick", "actor").unwrap());
    let picks_square = TargetResolver::new(&m.world)
        .with_registry(ScopeRegistry::new().with_scope("market:pick", "location").unwrap());
    let mut cache = ScopeCache::new();

    let a = picks_self.resolve_with_cache(&pick, &context(&m), &mut cache).unwrap();
    let b = picks_square.resolve_with_cache(&pick, &context(&m), &mut cache).unwrap();
    let again = picks_self.resolve_with_cache(&pick, &context(&m), &mut cache).unwrap();

    assert_eq!(a.options("spot"), vec![m.player]);
    assert_eq!(b.options("spot"), vec![m.square]);
    assert_eq!(again.options("spot"), vec![m.player]);
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn one_resolver_serves_many_threads() {
    let m = market();
    let resolver = TargetResolver::new(Arc::new(m.world.clone()));
    let action = give();
    let actors = [m.player, m.merchant, m.beggar];

    let counts: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = actors
            .iter()
            .map(|&actor| {
                let resolver = &resolver;
                let action = &action;
                let ctx = ResolutionContext::new(actor).with_location(m.square);
                scope.spawn(move || resolver.resolve(action, &ctx).unwrap().candidates.len())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // Only the player carries anything.
    assert_eq!(counts, vec![2, 0, 0]);
}
