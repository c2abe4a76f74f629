//! Candidate validation.
//!
//! Every check runs for every candidate; a rejected candidate carries all of
//! the reasons it failed, not just the first.

use std::fmt;

use quarry_foundation::{EntityId, LtMap, Type, Value};
use quarry_scope::{Environment, PredicateEvaluator};
use quarry_scope::predicate::values_equal;
use quarry_storage::EntityGateway;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::action::{ActionDefinition, SlotValidation};
use crate::combination::Candidate;
use crate::context::ResolutionContext;

/// Why a candidate was rejected.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum RejectionReason {
    /// A required component is absent.
    MissingComponent {
        /// Slot name.
        slot: String,
        /// Component id.
        component: String,
    },
    /// A forbidden component is present.
    ForbiddenComponent {
        /// Slot name.
        slot: String,
        /// Component id.
        component: String,
    },
    /// A field is absent or has the wrong type.
    FieldTypeMismatch {
        /// Slot name.
        slot: String,
        /// Component id.
        component: String,
        /// Field name.
        field: String,
        /// Required type.
        expected: Type,
        /// Type found, if the field exists.
        actual: Option<Type>,
    },
    /// A field is absent or has the wrong value.
    FieldValueMismatch {
        /// Slot name.
        slot: String,
        /// Component id.
        component: String,
        /// Field name.
        field: String,
        /// Required value.
        expected: Value,
        /// Value found, if the field exists.
        actual: Option<Value>,
    },
    /// A cross-slot constraint evaluated to false.
    ConstraintFailed {
        /// Constraint name.
        constraint: String,
    },
    /// A cross-slot constraint could not be evaluated.
    ConstraintError {
        /// Constraint name.
        constraint: String,
        /// The evaluation error.
        message: String,
    },
    /// One entity is assigned to two slots of a distinct-targets action.
    DuplicateTarget {
        /// The entity.
        entity: EntityId,
        /// The earlier slot.
        first: String,
        /// The later slot.
        second: String,
    },
}

impl RejectionReason {
    /// Returns the reason's category.
    #[must_use]
    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::MissingComponent { .. } => RejectionKind::MissingComponent,
            Self::ForbiddenComponent { .. } => RejectionKind::ForbiddenComponent,
            Self::FieldTypeMismatch { .. } => RejectionKind::FieldTypeMismatch,
            Self::FieldValueMismatch { .. } => RejectionKind::FieldValueMismatch,
            Self::ConstraintFailed { .. } => RejectionKind::ConstraintFailed,
            Self::ConstraintError { .. } => RejectionKind::ConstraintError,
            Self::DuplicateTarget { .. } => RejectionKind::DuplicateTarget,
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingComponent { slot, component } => {
                write!(f, "{slot}: missing component {component}")
            }
            Self::ForbiddenComponent { slot, component } => {
                write!(f, "{slot}: has forbidden component {component}")
            }
            Self::FieldTypeMismatch {
                slot,
                component,
                field,
                expected,
                actual,
            } => match actual {
                Some(actual) => write!(f, "{slot}: {component}.{field} is {actual}, expected {expected}"),
                None => write!(f, "{slot}: {component}.{field} is missing, expected {expected}"),
            },
            Self::FieldValueMismatch {
                slot,
                component,
                field,
                expected,
                actual,
            } => match actual {
                Some(actual) => write!(f, "{slot}: {component}.{field} is {actual:?}, expected {expected:?}"),
                None => write!(f, "{slot}: {component}.{field} is missing, expected {expected:?}"),
            },
            Self::ConstraintFailed { constraint } => write!(f, "constraint {constraint} failed"),
            Self::ConstraintError { constraint, message } => {
                write!(f, "constraint {constraint} errored: {message}")
            }
            Self::DuplicateTarget { entity, first, second } => {
                write!(f, "{entity} assigned to both {first} and {second}")
            }
        }
    }
}

/// Rejection reason categories, used to group diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RejectionKind {
    /// See [`RejectionReason::MissingComponent`].
    MissingComponent,
    /// See [`RejectionReason::ForbiddenComponent`].
    ForbiddenComponent,
    /// See [`RejectionReason::FieldTypeMismatch`].
    FieldTypeMismatch,
    /// See [`RejectionReason::FieldValueMismatch`].
    FieldValueMismatch,
    /// See [`RejectionReason::ConstraintFailed`].
    ConstraintFailed,
    /// See [`RejectionReason::ConstraintError`].
    ConstraintError,
    /// See [`RejectionReason::DuplicateTarget`].
    DuplicateTarget,
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingComponent => "missing_component",
            Self::ForbiddenComponent => "forbidden_component",
            Self::FieldTypeMismatch => "field_type_mismatch",
            Self::FieldValueMismatch => "field_value_mismatch",
            Self::ConstraintFailed => "constraint_failed",
            Self::ConstraintError => "constraint_error",
            Self::DuplicateTarget => "duplicate_target",
        })
    }
}

/// Result of validating one candidate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationOutcome {
    /// Every reason the candidate failed; empty if it is valid.
    pub reasons: Vec<RejectionReason>,
}

impl ValidationOutcome {
    /// Returns true if no check failed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.reasons.is_empty()
    }
}

/// Applies slot validations and cross-slot constraints.
pub struct CandidateValidator<'a> {
    gateway: &'a dyn EntityGateway,
    predicates: &'a dyn PredicateEvaluator,
    max_depth: usize,
}

impl<'a> CandidateValidator<'a> {
    /// Creates a validator.
    #[must_use]
    pub fn new(gateway: &'a dyn EntityGateway, predicates: &'a dyn PredicateEvaluator) -> Self {
        Self {
            gateway,
            predicates,
            max_depth: quarry_scope::DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the nesting limit for constraint predicates.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Validates a candidate of `action`.
    #[must_use]
    pub fn validate(
        &self,
        candidate: &Candidate,
        action: &ActionDefinition,
        context: &ResolutionContext,
    ) -> ValidationOutcome {
        let mut reasons = Vec::new();

        for slot in &action.slots {
            let Some(entity) = candidate.get(&slot.name) else {
                continue;
            };
            for check in &slot.validation {
                if let Some(reason) = self.check_slot(&slot.name, entity, check) {
                    reasons.push(reason);
                }
            }
        }

        if action.distinct_targets {
            reasons.extend(duplicates(candidate));
        }

        if !action.constraints.is_empty() {
            let env = self.constraint_environment(candidate, context);
            for constraint in &action.constraints {
                match self.predicates.evaluate(&constraint.predicate, &env) {
                    Ok(true) => {}
                    Ok(false) => reasons.push(RejectionReason::ConstraintFailed {
                        constraint: constraint.name.clone(),
                    }),
                    Err(error) => reasons.push(RejectionReason::ConstraintError {
                        constraint: constraint.name.clone(),
                        message: error.to_string(),
                    }),
                }
            }
        }

        ValidationOutcome { reasons }
    }

    fn check_slot(&self, slot: &str, entity: EntityId, check: &SlotValidation) -> Option<RejectionReason> {
        match check {
            SlotValidation::HasComponent(component) => (!self.gateway.has_component(entity, component))
                .then(|| RejectionReason::MissingComponent {
                    slot: slot.to_string(),
                    component: component.clone(),
                }),
            SlotValidation::LacksComponent(component) => self.gateway.has_component(entity, component).then(|| {
                RejectionReason::ForbiddenComponent {
                    slot: slot.to_string(),
                    component: component.clone(),
                }
            }),
            SlotValidation::FieldType { component, field, ty } => {
                let actual = self.field(entity, component, field);
                if actual.as_ref().is_some_and(|v| ty.check(v)) {
                    None
                } else {
                    Some(RejectionReason::FieldTypeMismatch {
                        slot: slot.to_string(),
                        component: component.clone(),
                        field: field.clone(),
                        expected: ty.clone(),
                        actual: actual.map(|v| v.value_type()),
                    })
                }
            }
            SlotValidation::FieldEquals { component, field, value } => {
                let actual = self.field(entity, component, field);
                if actual.as_ref().is_some_and(|v| values_equal(v, value)) {
                    None
                } else {
                    Some(RejectionReason::FieldValueMismatch {
                        slot: slot.to_string(),
                        component: component.clone(),
                        field: field.clone(),
                        expected: value.clone(),
                        actual,
                    })
                }
            }
        }
    }

    fn field(&self, entity: EntityId, component: &str, field: &str) -> Option<Value> {
        self.gateway
            .component(entity, component)
            .and_then(|data| data.field(field).cloned())
    }

    fn constraint_environment(&self, candidate: &Candidate, context: &ResolutionContext) -> Environment<'a> {
        let targets: LtMap<Value> = candidate
            .assigned()
            .map(|(slot, entity)| (slot, Value::EntityRef(entity)))
            .collect();

        let mut env = Environment::new(self.gateway)
            .with_max_depth(self.max_depth)
            .with_binding("actor", Value::EntityRef(context.actor))
            .with_binding("game", context.game.clone());
        if let Some(location) = context.location {
            env = env.with_binding("location", Value::EntityRef(location));
        }
        for (slot, entity) in candidate.assigned() {
            env = env.with_binding(slot, Value::EntityRef(entity));
        }
        env.with_binding("targets", Value::Map(targets))
    }
}

fn duplicates(candidate: &Candidate) -> Vec<RejectionReason> {
    let assigned: Vec<(&str, EntityId)> = candidate.assigned().collect();
    let mut reasons = Vec::new();
    for (i, (first, entity)) in assigned.iter().enumerate() {
        if let Some((second, _)) = assigned[i + 1..].iter().find(|(_, other)| other == entity) {
            // Report each repeated entity once, against its first slot.
            if !assigned[..i].iter().any(|(_, earlier)| earlier == entity) {
                reasons.push(RejectionReason::DuplicateTarget {
                    entity: *entity,
                    first: (*first).to_string(),
                    second: (*second).to_string(),
                });
            }
        }
    }
    reasons
}
