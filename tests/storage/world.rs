//! Integration tests for World state management
//!
//! Tests world immutability, component access, and placement.

use quarry_foundation::{EntityId, ErrorKind, Value};
use quarry_storage::World;

// =============================================================================
// World Immutability
// =============================================================================

#[test]
fn world_starts_empty() {
    assert_eq!(World::new().entity_count(), 0);
}

#[test]
fn spawn_returns_new_world() {
    let world1 = World::new();
    let (world2, entity) = world1.spawn_with([("core:actor", Value::Bool(true))]);

    assert_eq!(world1.entity_count(), 0);
    assert_eq!(world2.entity_count(), 1);
    assert!(world2.exists(entity));
    assert!(!world1.exists(entity));
}

#[test]
fn set_leaves_old_world_untouched() {
    let (world1, entity) = World::new().spawn_with([("core:health", Value::Int(10))]);
    let world2 = world1.set(entity, "core:health", Value::Int(3)).unwrap();

    assert_eq!(world1.get(entity, "core:health").unwrap(), Some(Value::Int(10)));
    assert_eq!(world2.get(entity, "core:health").unwrap(), Some(Value::Int(3)));
}

// =============================================================================
// Components
// =============================================================================

#[test]
fn get_field_reads_map_components() {
    let (world, door) = World::new().spawn_with([(
        "core:lock",
        Value::map([("type", Value::from("iron")), ("locked", Value::Bool(true))]),
    )]);

    assert_eq!(world.get_field(door, "core:lock", "type").unwrap(), Some(Value::from("iron")));
    assert_eq!(world.get_field(door, "core:lock", "missing").unwrap(), None);
    assert_eq!(world.get_field(door, "core:other", "type").unwrap(), None);
}

#[test]
fn remove_component() {
    let (world, e) = World::new().spawn_with([("core:lit", Value::Bool(true))]);
    let world = world.remove(e, "core:lit").unwrap();
    assert!(!world.has(e, "core:lit"));
    assert!(world.remove(e, "core:lit").is_ok());
}

#[test]
fn missing_entity_is_an_error() {
    let ghost = EntityId::new(99, 0);
    let err = World::new().get(ghost, "core:actor").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::EntityNotFound(id) if id == ghost));
}

// =============================================================================
// Placement
// =============================================================================

#[test]
fn place_moves_between_locations() {
    let (world, hall) = World::new().spawn_with([("core:room", Value::Bool(true))]);
    let (world, cellar) = world.spawn_with([("core:room", Value::Bool(true))]);
    let (world, cat) = world.spawn_with([("core:animal", Value::Bool(true))]);

    let world = world.place(cat, hall).unwrap();
    assert_eq!(world.location_of(cat), Some(hall));

    let moved = world.place(cat, cellar).unwrap();
    assert_eq!(moved.location_of(cat), Some(cellar));
    assert_eq!(world.location_of(cat), Some(hall));
}

#[test]
fn place_rejects_unknown_location() {
    let (world, cat) = World::new().spawn_with([("core:animal", Value::Bool(true))]);
    assert!(world.place(cat, EntityId::new(42, 0)).is_err());
}
