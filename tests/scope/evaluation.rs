//! Integration tests for scope evaluation over a world

use proptest::prelude::*;
use quarry_foundation::{EntityId, ErrorKind, LtMap, LtVec, Value};
use quarry_scope::{EvaluationContext, Interpreter, ScopeCache, ScopeEvaluator, ScopeRegistry};
use quarry_storage::World;

// =============================================================================
// Fixture
// =============================================================================

struct Tavern {
    world: World,
    tavern: EntityId,
    hero: EntityId,
    barkeep: EntityId,
    dog: EntityId,
    mug: EntityId,
    coin: EntityId,
}

fn tavern() -> Tavern {
    let (world, tavern) = World::new().spawn_with([("core:room", Value::Bool(true))]);
    let (world, mug) = world.spawn_with([("core:item", Value::map([("weight", Value::Int(2))]))]);
    let (world, coin) = world.spawn_with([("core:item", Value::map([("weight", Value::Int(0))]))]);
    let (world, dog) = world.spawn_with([("core:animal", Value::Bool(true))]);
    let (world, barkeep) = world.spawn_with([
        ("core:actor", Value::Bool(true)),
        ("core:inventory", Value::from(vec![mug])),
    ]);
    let (world, hero) = world.spawn_with([
        ("core:actor", Value::Bool(true)),
        ("core:inventory", Value::from(vec![coin])),
        ("core:followers", Value::from(vec![dog])),
    ]);
    let world = world.place(barkeep, tavern).unwrap();
    let world = world.place(dog, tavern).unwrap();
    let world = world.place(hero, tavern).unwrap();

    Tavern {
        world,
        tavern,
        hero,
        barkeep,
        dog,
        mug,
        coin,
    }
}

fn context(t: &Tavern) -> EvaluationContext {
    EvaluationContext::new(t.hero).with_location(t.tavern)
}

// =============================================================================
// Navigation
// =============================================================================

#[test]
fn everyone_else_in_the_room() {
    let t = tavern();
    let registry = ScopeRegistry::new();
    let evaluator = ScopeEvaluator::new(&t.world, &Interpreter, &registry);

    let found = evaluator
        .evaluate_source("at(location)[(!= entity actor)]", &context(&t))
        .unwrap();
    assert_eq!(found, vec![t.barkeep, t.dog]);
}

#[test]
fn items_held_by_anyone_in_the_room() {
    let t = tavern();
    let registry = ScopeRegistry::new();
    let evaluator = ScopeEvaluator::new(&t.world, &Interpreter, &registry);

    let found = evaluator
        .evaluate_source("at(location).core:inventory[]", &context(&t))
        .unwrap();
    assert_eq!(found, vec![t.mug, t.coin]);

    let heavy = evaluator
        .evaluate_source("at(location).core:inventory[(> entity.core:item.weight 0)]", &context(&t))
        .unwrap();
    assert_eq!(heavy, vec![t.mug]);
}

#[test]
fn game_value_is_navigable() {
    let t = tavern();
    let registry = ScopeRegistry::new();
    let evaluator = ScopeEvaluator::new(&t.world, &Interpreter, &registry);
    let game = Value::map([("spotlight", Value::from(vec![t.dog, t.barkeep]))]);
    let ctx = context(&t).with_game(game);

    assert_eq!(evaluator.evaluate_source("game.spotlight[]", &ctx).unwrap(), vec![t.dog, t.barkeep]);
    assert!(evaluator.evaluate_source("game.missing[]", &ctx).unwrap().is_empty());
}

#[test]
fn no_location_means_nothing_here() {
    let t = tavern();
    let registry = ScopeRegistry::new();
    let evaluator = ScopeEvaluator::new(&t.world, &Interpreter, &registry);
    let ctx = EvaluationContext::new(t.hero);

    assert!(evaluator.evaluate_source("at(location)", &ctx).unwrap().is_empty());
}

#[test]
fn dependent_context_through_target_and_targets() {
    let t = tavern();
    let registry = ScopeRegistry::new();
    let evaluator = ScopeEvaluator::new(&t.world, &Interpreter, &registry);
    let resolved: LtMap<LtVec<EntityId>> = LtMap::new().insert("giver", [t.barkeep].into_iter().collect());
    let ctx = context(&t).with_target(t.barkeep).with_targets(resolved);

    assert_eq!(evaluator.evaluate_source("target.core:inventory[]", &ctx).unwrap(), vec![t.mug]);
    assert_eq!(
        evaluator.evaluate_source("targets.giver.core:inventory[]", &ctx).unwrap(),
        vec![t.mug]
    );
}

// =============================================================================
// Named Scopes
// =============================================================================

#[test]
fn named_scopes_compose() {
    let t = tavern();
    let mut registry = ScopeRegistry::new();
    registry.define("core:here", "at(location)").unwrap();
    registry.define("core:company", "core:here[(!= entity actor)] | actor.core:followers").unwrap();
    registry.define("core:talkable", "core:company[(= entity.core:actor true)]").unwrap();
    let evaluator = ScopeEvaluator::new(&t.world, &Interpreter, &registry);

    assert_eq!(
        evaluator.evaluate_source("core:company", &context(&t)).unwrap(),
        vec![t.barkeep, t.dog]
    );
    assert_eq!(
        evaluator.evaluate_source("core:talkable", &context(&t)).unwrap(),
        vec![t.barkeep]
    );
}

#[test]
fn registry_requires_namespaced_names() {
    let mut registry = ScopeRegistry::new();
    assert!(registry.define("here", "at(location)").is_err());
    assert!(registry.define(":here", "at(location)").is_err());
    assert!(registry.define("core:", "at(location)").is_err());
    assert!(registry.define("core:here", "at(").is_err());
    assert!(registry.is_empty());
}

#[test]
fn undefined_reference_inside_a_named_scope() {
    let t = tavern();
    let registry = ScopeRegistry::new().with_scope("core:outer", "core:ghosts").unwrap();
    let evaluator = ScopeEvaluator::new(&t.world, &Interpreter, &registry);

    let err = evaluator.evaluate_source("core:outer", &context(&t)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UndefinedScope("core:ghosts".to_string()));
}

// =============================================================================
// Cache
// =============================================================================

#[test]
fn cache_keys_on_context() {
    let t = tavern();
    let registry = ScopeRegistry::new();
    let evaluator = ScopeEvaluator::new(&t.world, &Interpreter, &registry);
    let mut cache = ScopeCache::new();

    let hero = evaluator
        .evaluate_cached("actor.core:inventory[]", &context(&t), &mut cache)
        .unwrap();
    let barkeep_ctx = EvaluationContext::new(t.barkeep).with_location(t.tavern);
    let barkeep = evaluator
        .evaluate_cached("actor.core:inventory[]", &barkeep_ctx, &mut cache)
        .unwrap();

    assert_eq!(hero, vec![t.coin]);
    assert_eq!(barkeep, vec![t.mug]);
    assert_eq!(cache.stats().misses, 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn failed_evaluations_are_not_cached() {
    let t = tavern();
    let registry = ScopeRegistry::new();
    let evaluator = ScopeEvaluator::new(&t.world, &Interpreter, &registry);
    let mut cache = ScopeCache::new();

    assert!(evaluator.evaluate_cached("actor[]", &context(&t), &mut cache).is_err());
    assert!(cache.is_empty());
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn union_contains_each_entity_once(picks in prop::collection::vec(0usize..4, 1..8)) {
        let t = tavern();
        let everyone = [t.hero, t.barkeep, t.dog, t.tavern];
        let sources = ["actor", "at(location)", "actor.core:followers[]", "location"];
        let source = picks.iter().map(|&i| sources[i]).collect::<Vec<_>>().join(" | ");

        let registry = ScopeRegistry::new();
        let evaluator = ScopeEvaluator::new(&t.world, &Interpreter, &registry);
        let found = evaluator.evaluate_source(&source, &context(&t)).unwrap();

        for entity in everyone {
            prop_assert!(found.iter().filter(|e| **e == entity).count() <= 1);
        }
        prop_assert_eq!(found, evaluator.evaluate_source(&source, &context(&t)).unwrap());
    }
}
