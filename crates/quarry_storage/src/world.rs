//! Immutable world state.
//!
//! `World` keeps component data and entity placement in persistent maps, so
//! every clone is a cheap snapshot and concurrent readers never need a lock.

use quarry_foundation::{EntityId, LtMap, LtVec, Result, Value};

use crate::gateway::EntityGateway;

/// Immutable snapshot of entity state.
///
/// Clone is O(1) due to structural sharing. All mutation methods return a new
/// `World` instance.
#[derive(Clone, Debug, Default)]
pub struct World {
    /// Next entity index to allocate.
    next_index: u64,
    /// Component data per live entity, keyed by component id.
    components: im::OrdMap<EntityId, LtMap<Value>>,
    /// Where each placed entity currently is.
    placement: im::OrdMap<EntityId, EntityId>,
    /// Occupants per location, in placement order.
    occupants: im::OrdMap<EntityId, LtVec<EntityId>>,
}

impl World {
    /// Creates a new empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.components.len()
    }

    /// Checks if an entity exists.
    #[must_use]
    pub fn exists(&self, entity: EntityId) -> bool {
        self.components.contains_key(&entity)
    }

    /// Iterates all live entity IDs in allocation order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.components.keys().copied()
    }

    // --- Entity Operations ---

    /// Spawns a new entity with initial components.
    ///
    /// Returns a new World and the spawned entity ID.
    #[must_use]
    pub fn spawn(&self, components: &LtMap<Value>) -> (World, EntityId) {
        let id = EntityId::new(self.next_index, 0);
        let mut new = self.clone();
        new.next_index += 1;
        new.components.insert(id, components.clone());
        (new, id)
    }

    /// Spawns a new entity from component/value pairs.
    #[must_use]
    pub fn spawn_with<I, K>(&self, components: I) -> (World, EntityId)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<std::sync::Arc<str>>,
    {
        self.spawn(&components.into_iter().collect())
    }

    // --- Component Operations ---

    /// Gets a component value for an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist.
    pub fn get(&self, entity: EntityId, component: &str) -> Result<Option<Value>> {
        let data = self.data(entity)?;
        Ok(data.get(component).cloned())
    }

    /// Gets a specific field from a map-valued component.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist.
    pub fn get_field(&self, entity: EntityId, component: &str, field: &str) -> Result<Option<Value>> {
        let data = self.data(entity)?;
        Ok(data
            .get(component)
            .and_then(|value| value.field(field))
            .cloned())
    }

    /// Sets a component on an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist.
    pub fn set(&self, entity: EntityId, component: &str, value: Value) -> Result<World> {
        let data = self.data(entity)?.insert(component, value);
        let mut new = self.clone();
        new.components.insert(entity, data);
        Ok(new)
    }

    /// Removes a component from an entity. Removing an absent component is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist.
    pub fn remove(&self, entity: EntityId, component: &str) -> Result<World> {
        let data = self.data(entity)?.remove(component);
        let mut new = self.clone();
        new.components.insert(entity, data);
        Ok(new)
    }

    /// Checks if an entity has a component.
    #[must_use]
    pub fn has(&self, entity: EntityId, component: &str) -> bool {
        self.components
            .get(&entity)
            .is_some_and(|data| data.contains_key(component))
    }

    /// Iterates entities with a specific component, in allocation order.
    pub fn with_component<'a>(&'a self, component: &'a str) -> impl Iterator<Item = EntityId> + 'a {
        self.components
            .iter()
            .filter(move |(_, data)| data.contains_key(component))
            .map(|(id, _)| *id)
    }

    // --- Placement ---

    /// Places an entity at a location, moving it if it was elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error if either entity does not exist.
    pub fn place(&self, entity: EntityId, location: EntityId) -> Result<World> {
        self.data(entity)?;
        self.data(location)?;

        let mut new = self.clone();
        if let Some(previous) = new.placement.insert(entity, location) {
            let remaining: LtVec<EntityId> = new
                .occupants
                .get(&previous)
                .map(|list| list.iter().copied().filter(|e| *e != entity).collect())
                .unwrap_or_default();
            new.occupants.insert(previous, remaining);
        }
        let list = new.occupants.get(&location).cloned().unwrap_or_default();
        new.occupants.insert(location, list.push_back(entity));
        Ok(new)
    }

    /// Returns where an entity is placed, if anywhere.
    #[must_use]
    pub fn location_of(&self, entity: EntityId) -> Option<EntityId> {
        self.placement.get(&entity).copied()
    }

    fn data(&self, entity: EntityId) -> Result<&LtMap<Value>> {
        self.components
            .get(&entity)
            .ok_or_else(|| quarry_foundation::Error::entity_not_found(entity))
    }
}

impl EntityGateway for World {
    fn component(&self, entity: EntityId, component: &str) -> Option<Value> {
        self.components.get(&entity)?.get(component).cloned()
    }

    fn entities_at(&self, location: EntityId) -> Vec<EntityId> {
        self.occupants
            .get(&location)
            .map(|list| list.iter().copied().collect())
            .unwrap_or_default()
    }

    fn entities_with(&self, component: &str) -> Vec<EntityId> {
        self.with_component(component).collect()
    }

    fn has_component(&self, entity: EntityId, component: &str) -> bool {
        self.has(entity, component)
    }
}
