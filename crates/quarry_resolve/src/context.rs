//! Resolution context and per-slot context building.

use quarry_foundation::{EntityId, LtMap, LtVec, Value};
use quarry_scope::EvaluationContext;

use crate::action::TargetSlot;

/// The caller-supplied seed of a resolution plus everything resolved so far.
///
/// Immutable: recording a resolved slot returns a new context sharing
/// structure with the old one.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolutionContext {
    /// The acting entity.
    pub actor: EntityId,
    /// Where the actor is, if anywhere.
    pub location: Option<EntityId>,
    /// Opaque game state.
    pub game: Value,
    resolved: LtMap<LtVec<EntityId>>,
}

impl ResolutionContext {
    /// Creates a context for an actor.
    #[must_use]
    pub fn new(actor: EntityId) -> Self {
        Self {
            actor,
            location: None,
            game: Value::Nil,
            resolved: LtMap::new(),
        }
    }

    /// Sets the actor's location.
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

    /// Returns a context with `slot` resolved to `entities`.
    #[must_use]
    pub fn with_resolved(&self, slot: &str, entities: impl IntoIterator<Item = EntityId>) -> Self {
        let mut next = self.clone();
        next.resolved = self.resolved.insert(slot, entities.into_iter().collect());
        next
    }

    /// Returns the resolved entities of a slot, if it has been processed.
    #[must_use]
    pub fn resolved(&self, slot: &str) -> Option<&LtVec<EntityId>> {
        self.resolved.get(slot)
    }

    /// Returns every resolved slot.
    #[must_use]
    pub fn resolved_targets(&self) -> &LtMap<LtVec<EntityId>> {
        &self.resolved
    }
}

/// Builds the evaluation context for one slot.
pub struct ContextBuilder;

impl ContextBuilder {
    /// Snapshots `base` for evaluating `slot`.
    ///
    /// Actor, location and game are always copied. When the slot declares
    /// `contextFrom`, `targets` is bound to the resolved-so-far map and
    /// `target` to the first entity of the source slot (absent if that slot
    /// resolved to nothing). Slots not yet processed are simply absent from
    /// `targets`.
    #[must_use]
    pub fn build(base: &ResolutionContext, slot: &TargetSlot) -> EvaluationContext {
        let mut ctx = EvaluationContext::new(base.actor).with_game(base.game.clone());
        if let Some(location) = base.location {
            ctx = ctx.with_location(location);
        }

        if let Some(from) = &slot.context_from {
            ctx = ctx.with_targets(base.resolved.clone());
            if let Some(first) = base.resolved(from).and_then(LtVec::first) {
                ctx = ctx.with_target(*first);
            }
        }
        ctx
    }
}
