//! Independent slots, caps, and unavailable actions

use quarry_foundation::{EntityId, Value};
use quarry_resolve::{ActionDefinition, ResolutionContext, ResolverConfig, TargetResolver, TargetSlot};
use quarry_storage::World;

struct Arena {
    world: World,
    pit: EntityId,
    gladiator: EntityId,
    weapons: Vec<EntityId>,
    enemies: Vec<EntityId>,
}

fn arena(weapon_count: usize, enemy_count: usize) -> Arena {
    let (world, pit) = World::new().spawn_with([("core:room", Value::Bool(true))]);
    let (mut world, gladiator) = world.spawn_with([("core:actor", Value::Bool(true))]);

    let mut weapons = Vec::new();
    for _ in 0..weapon_count {
        let (next, weapon) = world.spawn_with([("core:weapon", Value::Bool(true))]);
        world = next;
        weapons.push(weapon);
    }
    // A non-weapon in the pack must not show up.
    let (next, bread) = world.spawn_with([("core:food", Value::Bool(true))]);
    world = next;
    let mut pack: Vec<EntityId> = weapons.clone();
    pack.insert(0, bread);
    world = world.set(gladiator, "core:inventory", Value::from(pack)).unwrap();

    let mut enemies = Vec::new();
    for _ in 0..enemy_count {
        let (next, enemy) = world.spawn_with([("core:hostile", Value::Bool(true))]);
        world = next.place(enemy, pit).unwrap();
        enemies.push(enemy);
    }
    world = world.place(gladiator, pit).unwrap();

    Arena {
        world,
        pit,
        gladiator,
        weapons,
        enemies,
    }
}

fn attack() -> ActionDefinition {
    ActionDefinition::new(
        "core:attack",
        vec![
            TargetSlot::new("weapon", "actor.core:inventory[(= entity.core:weapon true)]"),
            TargetSlot::new("enemy", "at(location)[(= entity.core:hostile true)]"),
        ],
    )
    .unwrap()
}

fn context(a: &Arena) -> ResolutionContext {
    ResolutionContext::new(a.gladiator).with_location(a.pit)
}

#[test]
fn two_weapons_three_enemies_make_six() {
    let a = arena(2, 3);
    let result = TargetResolver::new(&a.world).resolve(&attack(), &context(&a)).unwrap();

    assert_eq!(result.candidates.len(), 6);
    assert!(!result.diagnostics.truncated);

    let pairs: Vec<(EntityId, EntityId)> = result
        .candidates
        .iter()
        .map(|c| (c.get("weapon").unwrap(), c.get("enemy").unwrap()))
        .collect();
    let mut expected = Vec::new();
    for &w in &a.weapons {
        for &e in &a.enemies {
            expected.push((w, e));
        }
    }
    assert_eq!(pairs, expected);
}

#[test]
fn max_combinations_keeps_first_match() {
    let a = arena(1, 5);
    let action = ActionDefinition::new(
        "core:attack",
        vec![
            TargetSlot::new("weapon", "actor.core:inventory[(= entity.core:weapon true)]"),
            TargetSlot::new("enemy", "at(location)[(= entity.core:hostile true)]").with_max_combinations(1),
        ],
    )
    .unwrap();
    let result = TargetResolver::new(&a.world).resolve(&action, &context(&a)).unwrap();

    let enemy = result.diagnostics.slot("enemy").unwrap();
    assert_eq!(enemy.resolved, 5);
    assert_eq!(enemy.kept, 1);
    assert!(enemy.truncated);
    assert_eq!(result.options("enemy"), vec![a.enemies[0]]);
    assert_eq!(result.diagnostics.records_with_code("slot_truncated").count(), 1);
}

#[test]
fn global_limit_bounds_large_products() {
    let a = arena(10, 10);
    let resolver = TargetResolver::new(&a.world).with_config(ResolverConfig::new().with_global_limit(25));
    let result = resolver.resolve(&attack(), &context(&a)).unwrap();

    assert_eq!(result.candidates.len(), 25);
    assert_eq!(result.diagnostics.combinations_total, 100);
    assert!(result.diagnostics.truncated);
}

#[test]
fn no_enemies_means_unavailable_not_an_error() {
    let a = arena(2, 0);
    let result = TargetResolver::new(&a.world).resolve(&attack(), &context(&a)).unwrap();

    assert!(!result.is_available());
    assert_eq!(result.diagnostics.unsatisfied, vec!["enemy"]);
    assert_eq!(result.diagnostics.records_with_code("slot_unsatisfied").count(), 1);
    assert_eq!(result.diagnostics.slot("weapon").map(|s| s.kept), Some(2));
}
