//! The snapshot a scope expression is evaluated against.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use quarry_foundation::{EntityId, LtMap, LtVec, Value};
use quarry_storage::EntityGateway;

use crate::environment::Environment;

/// Immutable evaluation context for one scope evaluation.
///
/// `target` and `targets` are only present when the slot being evaluated
/// declared a context dependency.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationContext {
    /// The acting entity.
    pub actor: EntityId,
    /// Where the actor is, if anywhere.
    pub location: Option<EntityId>,
    /// Opaque game state, navigable like a map.
    pub game: Value,
    /// First entity of the slot this one depends on.
    pub target: Option<EntityId>,
    /// Entities resolved so far, by slot name.
    pub targets: Option<LtMap<LtVec<EntityId>>>,
}

impl EvaluationContext {
    /// Creates a context for an actor with nothing else bound.
    #[must_use]
    pub fn new(actor: EntityId) -> Self {
        Self {
            actor,
            location: None,
            game: Value::Nil,
            target: None,
            targets: None,
        }
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, location: EntityId) -> Self {
        self.location = Some(location);
        self
    }

    /// Sets the game value.
    #[must_use]
    pub fn with_game(mut self, game: Value) -> Self {
        self.game = game;
        self
    }

    /// Sets the dependency target.
    #[must_use]
    pub fn with_target(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    /// Sets the resolved-so-far map.
    #[must_use]
    pub fn with_targets(mut self, targets: LtMap<LtVec<EntityId>>) -> Self {
        self.targets = Some(targets);
        self
    }

    /// Returns the `targets` map as a value: slot name to a vec of entity refs.
    #[must_use]
    pub fn targets_value(&self) -> Option<Value> {
        self.targets.as_ref().map(|targets| {
            Value::Map(
                targets
                    .iter()
                    .map(|(slot, ids)| (slot.clone(), Value::Vec(ids.iter().copied().map(Value::EntityRef).collect())))
                    .collect(),
            )
        })
    }

    /// Builds a predicate environment with the context variables bound.
    #[must_use]
    pub fn environment<'g>(&self, gateway: &'g dyn EntityGateway) -> Environment<'g> {
        let mut env = Environment::new(gateway)
            .with_binding("actor", Value::EntityRef(self.actor))
            .with_binding("game", self.game.clone());
        if let Some(location) = self.location {
            env = env.with_binding("location", Value::EntityRef(location));
        }
        if let Some(target) = self.target {
            env = env.with_binding("target", Value::EntityRef(target));
        }
        if let Some(targets) = self.targets_value() {
            env = env.with_binding("targets", targets);
        }
        env
    }

    /// Hash of everything in the context that can change a scope result.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.actor.hash(&mut hasher);
        self.location.hash(&mut hasher);
        self.game.hash(&mut hasher);
        self.target.hash(&mut hasher);
        match &self.targets {
            None => 0u8.hash(&mut hasher),
            Some(targets) => {
                1u8.hash(&mut hasher);
                targets.hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}
