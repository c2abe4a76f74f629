//! Action and target slot definitions.
//!
//! Definitions are loaded once by the host and reused across resolutions.
//! [`ActionDefinition`] checks the structural rules that can be checked
//! without a world: unique slot names, known `contextFrom` targets, parseable
//! constraints. Dependency cycles are left to [`crate::dependency::order`].

use std::collections::HashSet;

use quarry_foundation::{Type, Value};
use quarry_scope::Predicate;
use thiserror::Error;

// =============================================================================
// Slots
// =============================================================================

/// One named target position of an action.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetSlot {
    /// Slot name, unique within its action.
    pub name: String,
    /// Scope expression producing the slot's candidates.
    pub scope: String,
    /// Whether a candidate must assign this slot.
    pub required: bool,
    /// Slot whose resolved entities this slot's scope may read as `target`/`targets`.
    pub context_from: Option<String>,
    /// Structural checks on the assigned entity.
    pub validation: Vec<SlotValidation>,
    /// Keep at most this many resolved entities.
    pub max_combinations: Option<usize>,
}

impl TargetSlot {
    /// Creates a required slot with no dependency, validation or cap.
    #[must_use]
    pub fn new(name: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: scope.into(),
            required: true,
            context_from: None,
            validation: Vec::new(),
            max_combinations: None,
        }
    }

    /// Marks the slot optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Declares a context dependency on another slot.
    #[must_use]
    pub fn with_context_from(mut self, slot: impl Into<String>) -> Self {
        self.context_from = Some(slot.into());
        self
    }

    /// Adds a structural check.
    #[must_use]
    pub fn with_validation(mut self, check: SlotValidation) -> Self {
        self.validation.push(check);
        self
    }

    /// Caps the number of resolved entities kept for this slot.
    #[must_use]
    pub fn with_max_combinations(mut self, max: usize) -> Self {
        self.max_combinations = Some(max);
        self
    }
}

/// A structural requirement on the entity assigned to a slot.
#[derive(Clone, Debug, PartialEq)]
pub enum SlotValidation {
    /// The entity carries the component.
    HasComponent(String),
    /// The entity does not carry the component.
    LacksComponent(String),
    /// A field of a map component exists and has the given type.
    FieldType {
        /// Component id.
        component: String,
        /// Field name.
        field: String,
        /// Accepted type.
        ty: Type,
    },
    /// A field of a map component equals the given value.
    FieldEquals {
        /// Component id.
        component: String,
        /// Field name.
        field: String,
        /// Required value.
        value: Value,
    },
}

impl SlotValidation {
    /// Requires a component.
    #[must_use]
    pub fn has(component: impl Into<String>) -> Self {
        Self::HasComponent(component.into())
    }

    /// Forbids a component.
    #[must_use]
    pub fn lacks(component: impl Into<String>) -> Self {
        Self::LacksComponent(component.into())
    }

    /// Requires a field of a given type.
    #[must_use]
    pub fn field_type(component: impl Into<String>, field: impl Into<String>, ty: Type) -> Self {
        Self::FieldType {
            component: component.into(),
            field: field.into(),
            ty,
        }
    }

    /// Requires a field value.
    #[must_use]
    pub fn field_equals(component: impl Into<String>, field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::FieldEquals {
            component: component.into(),
            field: field.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// Constraints
// =============================================================================

/// A named predicate over a whole candidate.
///
/// Evaluated with `actor`, `location`, `game`, `targets` (slot name to the
/// assigned entity) and every assigned slot name bound.
#[derive(Clone, Debug, PartialEq)]
pub struct CrossSlotConstraint {
    /// Constraint name, used in rejection reasons.
    pub name: String,
    /// Source text.
    pub source: String,
    /// Parsed predicate.
    pub predicate: Predicate,
}

// =============================================================================
// Action
// =============================================================================

/// A validated action definition.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionDefinition {
    /// Action id, e.g. `core:unlock`.
    pub id: String,
    /// Slots in declaration order.
    pub slots: Vec<TargetSlot>,
    /// Cross-slot constraints in declaration order.
    pub constraints: Vec<CrossSlotConstraint>,
    /// Reject candidates that assign one entity to two slots.
    pub distinct_targets: bool,
}

impl ActionDefinition {
    /// Creates an action from its slots.
    ///
    /// # Errors
    ///
    /// Returns a [`DefinitionError`] if the slots break a structural rule.
    pub fn new(id: impl Into<String>, slots: Vec<TargetSlot>) -> Result<Self, DefinitionError> {
        ActionBuilder::new(id).slots(slots).build()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder(id: impl Into<String>) -> ActionBuilder {
        ActionBuilder::new(id)
    }

    /// Looks up a slot by name.
    #[must_use]
    pub fn slot(&self, name: &str) -> Option<&TargetSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// Returns the declaration index of a slot.
    #[must_use]
    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }
}

/// Builder for [`ActionDefinition`].
#[derive(Clone, Debug)]
pub struct ActionBuilder {
    id: String,
    slots: Vec<TargetSlot>,
    constraints: Vec<(String, String)>,
    distinct_targets: bool,
}

impl ActionBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slots: Vec::new(),
            constraints: Vec::new(),
            distinct_targets: false,
        }
    }

    /// Adds a slot.
    #[must_use]
    pub fn slot(mut self, slot: TargetSlot) -> Self {
        self.slots.push(slot);
        self
    }

    /// Adds several slots.
    #[must_use]
    pub fn slots(mut self, slots: impl IntoIterator<Item = TargetSlot>) -> Self {
        self.slots.extend(slots);
        self
    }

    /// Adds a cross-slot constraint from predicate source.
    #[must_use]
    pub fn constraint(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.constraints.push((name.into(), source.into()));
        self
    }

    /// Rejects candidates that reuse an entity across slots.
    #[must_use]
    pub fn distinct_targets(mut self) -> Self {
        self.distinct_targets = true;
        self
    }

    /// Validates and builds the definition.
    ///
    /// # Errors
    ///
    /// Returns the first structural rule the definition breaks.
    pub fn build(self) -> Result<ActionDefinition, DefinitionError> {
        let action = self.id;
        if self.slots.is_empty() {
            return Err(DefinitionError::NoSlots { action });
        }

        let mut seen = HashSet::new();
        for slot in &self.slots {
            if slot.name.trim().is_empty() {
                return Err(DefinitionError::EmptySlotName { action });
            }
            if !seen.insert(slot.name.as_str()) {
                return Err(DefinitionError::DuplicateSlot {
                    action,
                    slot: slot.name.clone(),
                });
            }
        }

        for slot in &self.slots {
            let Some(from) = &slot.context_from else {
                continue;
            };
            if !seen.contains(from.as_str()) {
                return Err(DefinitionError::UnknownContextSlot {
                    action,
                    slot: slot.name.clone(),
                    context_from: from.clone(),
                });
            }
        }

        let mut constraints = Vec::with_capacity(self.constraints.len());
        for (name, source) in self.constraints {
            match Predicate::parse(&source) {
                Ok(predicate) => constraints.push(CrossSlotConstraint {
                    name,
                    source,
                    predicate,
                }),
                Err(error) => {
                    return Err(DefinitionError::InvalidConstraint {
                        action,
                        constraint: name,
                        error,
                    });
                }
            }
        }

        Ok(ActionDefinition {
            id: action,
            slots: self.slots,
            constraints,
            distinct_targets: self.distinct_targets,
        })
    }
}

/// A structural defect in an action definition.
#[derive(Clone, Debug, Error)]
pub enum DefinitionError {
    /// The action declares no slots.
    #[error("action {action} declares no target slots")]
    NoSlots {
        /// Action id.
        action: String,
    },

    /// A slot has an empty name.
    #[error("action {action} has a slot with an empty name")]
    EmptySlotName {
        /// Action id.
        action: String,
    },

    /// Two slots share a name.
    #[error("action {action} declares slot `{slot}` more than once")]
    DuplicateSlot {
        /// Action id.
        action: String,
        /// The repeated name.
        slot: String,
    },

    /// `contextFrom` names a slot the action does not declare.
    #[error("slot `{slot}` of action {action} takes context from unknown slot `{context_from}`")]
    UnknownContextSlot {
        /// Action id.
        action: String,
        /// The referencing slot.
        slot: String,
        /// The unknown name.
        context_from: String,
    },

    /// A cross-slot constraint failed to parse.
    #[error("constraint `{constraint}` of action {action} is invalid: {error}")]
    InvalidConstraint {
        /// Action id.
        action: String,
        /// Constraint name.
        constraint: String,
        /// The parse error.
        #[source]
        error: quarry_foundation::Error,
    },
}
