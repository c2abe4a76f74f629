//! Dependent slots and dependency cycles

use std::sync::Arc;

use quarry_foundation::{EntityId, Value};
use quarry_resolve::{
    ActionDefinition, RecordingReporter, ResolutionContext, TargetResolver, TargetSlot,
};
use quarry_storage::World;

struct Cellar {
    world: World,
    cellar: EntityId,
    thief: EntityId,
    chest: EntityId,
    keys: Vec<EntityId>,
}

fn cellar() -> Cellar {
    let (world, cellar) = World::new().spawn_with([("core:room", Value::Bool(true))]);
    let (world, chest) = world.spawn_with([(
        "core:lock",
        Value::map([("type", Value::from("brass")), ("locked", Value::Bool(true))]),
    )]);
    let (world, barrel) = world.spawn_with([("core:container", Value::Bool(true))]);

    let mut world = world;
    let mut keys = Vec::new();
    for kind in ["iron", "brass", "silver"] {
        let (next, key) = world.spawn_with([("core:key", Value::map([("type", Value::from(kind))]))]);
        world = next;
        keys.push(key);
    }

    let (world, thief) = world.spawn_with([
        ("core:actor", Value::Bool(true)),
        ("core:inventory", Value::from(keys.clone())),
    ]);
    let world = world.place(chest, cellar).unwrap();
    let world = world.place(barrel, cellar).unwrap();
    let world = world.place(thief, cellar).unwrap();

    Cellar {
        world,
        cellar,
        thief,
        chest,
        keys,
    }
}

fn context(c: &Cellar) -> ResolutionContext {
    ResolutionContext::new(c.thief).with_location(c.cellar)
}

fn unlock() -> ActionDefinition {
    ActionDefinition::new(
        "core:unlock",
        vec![
            TargetSlot::new("key", "actor.core:inventory[(= entity.core:key.type target.core:lock.type)]")
                .with_context_from("container"),
            TargetSlot::new("container", "at(location)[(= entity.core:lock.locked true)]"),
        ],
    )
    .unwrap()
}

#[test]
fn key_follows_the_container_it_fits() {
    let c = cellar();
    let result = TargetResolver::new(&c.world).resolve(&unlock(), &context(&c)).unwrap();

    assert_eq!(result.diagnostics.order, vec!["container", "key"]);
    assert_eq!(result.candidates.len(), 1);
    let candidate = &result.candidates[0];
    assert_eq!(candidate.get("container"), Some(c.chest));
    assert_eq!(candidate.get("key"), Some(c.keys[1]));

    // Candidates list slots in declaration order regardless of evaluation order.
    let slots: Vec<&str> = candidate.iter().map(|(slot, _)| slot).collect();
    assert_eq!(slots, vec!["key", "container"]);
}

#[test]
fn dependent_slot_can_read_every_resolved_target() {
    let c = cellar();
    let action = ActionDefinition::new(
        "core:inspect",
        vec![
            TargetSlot::new("container", "at(location)[(= entity.core:lock.locked true)]"),
            TargetSlot::new("lock", "at(location)[(in entity targets.container)]").with_context_from("container"),
        ],
    )
    .unwrap();
    let result = TargetResolver::new(&c.world).resolve(&action, &context(&c)).unwrap();

    assert_eq!(result.options("lock"), vec![c.chest]);
}

#[test]
fn nothing_locked_leaves_the_key_unsatisfied() {
    let c = cellar();
    let world = c
        .world
        .set(c.chest, "core:lock", Value::map([("type", Value::from("brass")), ("locked", Value::Bool(false))]))
        .unwrap();
    let result = TargetResolver::new(&world).resolve(&unlock(), &context(&c)).unwrap();

    assert!(!result.is_available());
    assert_eq!(result.diagnostics.unsatisfied, vec!["container", "key"]);
}

#[test]
fn mutual_context_is_a_cycle_before_any_evaluation() {
    let c = cellar();
    let reporter = Arc::new(RecordingReporter::new());
    let action = ActionDefinition::new(
        "core:paradox",
        vec![
            TargetSlot::new("A", "actor.core:inventory[]").with_context_from("B"),
            TargetSlot::new("B", "at(location)").with_context_from("A"),
        ],
    )
    .unwrap();

    let err = TargetResolver::new(&c.world)
        .with_reporter(reporter.clone())
        .resolve(&action, &context(&c))
        .unwrap_err();

    assert_eq!(err.slots, vec!["A", "B"]);
    assert!(reporter.records().is_empty());
}
