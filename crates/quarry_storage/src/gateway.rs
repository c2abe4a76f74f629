//! Read-only access to entity component data.

use std::sync::Arc;

use quarry_foundation::{EntityId, Value};

/// Read-only accessor into the component data of entities.
///
/// Implementations must be safe to read from many threads at once without
/// the engine taking any lock. Lookups never fail: a missing entity or
/// component is reported as `None` / empty.
pub trait EntityGateway: Send + Sync {
    /// Returns the data of `component` on `entity`, if present.
    fn component(&self, entity: EntityId, component: &str) -> Option<Value>;

    /// Returns the entities located at `location`, in a stable order.
    fn entities_at(&self, location: EntityId) -> Vec<EntityId>;

    /// Returns every entity carrying `component`, in a stable order.
    ///
    /// Gateways that cannot enumerate by component may keep the default,
    /// which makes `entities(...)` scope sources resolve to nothing.
    fn entities_with(&self, _component: &str) -> Vec<EntityId> {
        Vec::new()
    }

    /// Returns true if `entity` carries `component`.
    fn has_component(&self, entity: EntityId, component: &str) -> bool {
        self.component(entity, component).is_some()
    }
}

impl<G: EntityGateway + ?Sized> EntityGateway for &G {
    fn component(&self, entity: EntityId, component: &str) -> Option<Value> {
        (**self).component(entity, component)
    }

    fn entities_at(&self, location: EntityId) -> Vec<EntityId> {
        (**self).entities_at(location)
    }

    fn entities_with(&self, component: &str) -> Vec<EntityId> {
        (**self).entities_with(component)
    }

    fn has_component(&self, entity: EntityId, component: &str) -> bool {
        (**self).has_component(entity, component)
    }
}

impl<G: EntityGateway + ?Sized> EntityGateway for Arc<G> {
    fn component(&self, entity: EntityId, component: &str) -> Option<Value> {
        (**self).component(entity, component)
    }

    fn entities_at(&self, location: EntityId) -> Vec<EntityId> {
        (**self).entities_at(location)
    }

    fn entities_with(&self, component: &str) -> Vec<EntityId> {
        (**self).entities_with(component)
    }

    fn has_component(&self, entity: EntityId, component: &str) -> bool {
        (**self).has_component(entity, component)
    }
}
