//! Integration tests for the EntityGateway implementation of World

use std::sync::Arc;

use quarry_foundation::Value;
use quarry_storage::{EntityGateway, World};

fn populated() -> (World, quarry_foundation::EntityId, Vec<quarry_foundation::EntityId>) {
    let (mut world, room) = World::new().spawn_with([("core:room", Value::Bool(true))]);
    let mut occupants = Vec::new();
    for name in ["ann", "bob", "cy"] {
        let (next, e) = world.spawn_with([("core:name", Value::from(name))]);
        world = next.place(e, room).unwrap();
        occupants.push(e);
    }
    (world, room, occupants)
}

#[test]
fn entities_at_keeps_placement_order() {
    let (world, room, occupants) = populated();
    assert_eq!(world.entities_at(room), occupants);

    let world = world.place(occupants[0], room).unwrap();
    assert_eq!(world.entities_at(room), vec![occupants[1], occupants[2], occupants[0]]);
}

#[test]
fn entities_at_unknown_location_is_empty() {
    let (world, _, occupants) = populated();
    assert!(world.entities_at(occupants[0]).is_empty());
}

#[test]
fn component_lookups_never_fail() {
    let (world, room, _) = populated();
    assert_eq!(world.component(room, "core:room"), Some(Value::Bool(true)));
    assert_eq!(world.component(room, "core:missing"), None);
    assert!(world.has_component(room, "core:room"));
    assert_eq!(world.entities_with("core:name").len(), 3);
}

#[test]
fn gateway_through_references_and_arcs() {
    let (world, room, occupants) = populated();
    let shared: Arc<World> = Arc::new(world);

    fn count_at(gateway: &dyn EntityGateway, location: quarry_foundation::EntityId) -> usize {
        gateway.entities_at(location).len()
    }

    assert_eq!(count_at(&shared, room), occupants.len());
    assert_eq!(count_at(&&*shared, room), occupants.len());
}

#[test]
fn snapshots_are_shareable_across_threads() {
    let (world, room, occupants) = populated();
    let shared = Arc::new(world);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let world = Arc::clone(&shared);
            std::thread::spawn(move || world.entities_at(room))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), occupants);
    }
}
