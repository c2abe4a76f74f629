//! Resolution results and their diagnostics.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use quarry_foundation::EntityId;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::combination::Candidate;
use crate::report::Stage;
use crate::validation::{RejectionKind, RejectionReason};

/// What happened to one slot.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SlotDiagnostics {
    /// Slot name.
    pub slot: String,
    /// Entities the scope produced, before any cap.
    pub resolved: usize,
    /// Entities kept after the per-slot cap.
    pub kept: usize,
    /// True if the per-slot cap dropped entities.
    pub truncated: bool,
    /// Scope parse or evaluation error, if any.
    pub error: Option<String>,
    /// True if the slot is required and kept nothing.
    pub unsatisfied: bool,
    /// Scope evaluation time, when timings are enabled.
    pub duration: Option<Duration>,
}

/// One diagnostic event, tagged with the stage that produced it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum DiagnosticRecord {
    /// Slots were ordered.
    Ordered {
        /// Slot names in evaluation order.
        order: Vec<String>,
    },
    /// A slot's scope failed to parse or evaluate.
    ScopeError {
        /// Slot name.
        slot: String,
        /// The error.
        message: String,
    },
    /// A slot's resolved set was capped.
    SlotTruncated {
        /// Slot name.
        slot: String,
        /// Entities before the cap.
        resolved: usize,
        /// Entities after the cap.
        kept: usize,
    },
    /// A required slot resolved to nothing.
    SlotUnsatisfied {
        /// Slot name.
        slot: String,
    },
    /// The global limit stopped combination generation.
    CombinationsTruncated {
        /// Size of the full product.
        total: usize,
        /// Candidates generated.
        limit: usize,
    },
    /// A candidate failed validation.
    CandidateRejected {
        /// The candidate.
        candidate: Candidate,
        /// Every reason it failed.
        reasons: Vec<RejectionReason>,
    },
    /// Resolution finished.
    Completed {
        /// Valid candidates.
        valid: usize,
        /// Rejected candidates.
        rejected: usize,
    },
}

impl DiagnosticRecord {
    /// Returns a stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ordered { .. } => "slots_ordered",
            Self::ScopeError { .. } => "scope_error",
            Self::SlotTruncated { .. } => "slot_truncated",
            Self::SlotUnsatisfied { .. } => "slot_unsatisfied",
            Self::CombinationsTruncated { .. } => "combinations_truncated",
            Self::CandidateRejected { .. } => "candidate_rejected",
            Self::Completed { .. } => "completed",
        }
    }

    /// Returns the stage that produces this record.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Ordered { .. } => Stage::Ordering,
            Self::ScopeError { .. } | Self::SlotTruncated { .. } | Self::SlotUnsatisfied { .. } => {
                Stage::ScopeEvaluation
            }
            Self::CombinationsTruncated { .. } => Stage::Generation,
            Self::CandidateRejected { .. } => Stage::Validation,
            Self::Completed { .. } => Stage::Complete,
        }
    }
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.code())?;
        match self {
            Self::Ordered { order } => write!(f, "{}", order.join(" -> ")),
            Self::ScopeError { slot, message } => write!(f, "{slot}: {message}"),
            Self::SlotTruncated { slot, resolved, kept } => write!(f, "{slot}: kept {kept} of {resolved}"),
            Self::SlotUnsatisfied { slot } => write!(f, "{slot}: no entities"),
            Self::CombinationsTruncated { total, limit } => write!(f, "kept {limit} of {total}"),
            Self::CandidateRejected { reasons, .. } => {
                let reasons: Vec<String> = reasons.iter().map(ToString::to_string).collect();
                write!(f, "{}", reasons.join("; "))
            }
            Self::Completed { valid, rejected } => write!(f, "{valid} valid, {rejected} rejected"),
        }
    }
}

/// Wall-clock time spent per stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Timings {
    /// Dependency ordering.
    pub ordering: Duration,
    /// All scope evaluations.
    pub scopes: Duration,
    /// Combination generation.
    pub generation: Duration,
    /// Candidate validation.
    pub validation: Duration,
    /// The whole resolution.
    pub total: Duration,
}

/// Everything the resolver observed while resolving one action.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Diagnostics {
    /// Slot evaluation order.
    pub order: Vec<String>,
    /// Per-slot outcomes, in evaluation order.
    pub slots: Vec<SlotDiagnostics>,
    /// Required slots that resolved to nothing.
    pub unsatisfied: Vec<String>,
    /// Size of the full cartesian product.
    pub combinations_total: usize,
    /// True if the global limit stopped generation.
    pub truncated: bool,
    /// Number of rejected candidates.
    pub rejected: usize,
    /// Rejection reasons grouped by kind.
    pub rejections: BTreeMap<RejectionKind, usize>,
    /// Every record, in the order it was produced.
    pub records: Vec<DiagnosticRecord>,
    /// Stage timings, when enabled.
    pub timings: Option<Timings>,
}

impl Diagnostics {
    /// Returns the outcome of a slot.
    #[must_use]
    pub fn slot(&self, name: &str) -> Option<&SlotDiagnostics> {
        self.slots.iter().find(|s| s.slot == name)
    }

    /// Returns records with the given code.
    pub fn records_with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a DiagnosticRecord> + 'a {
        self.records.iter().filter(move |r| r.code() == code)
    }
}

/// The outcome of resolving one action.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ResolutionResult {
    /// Action id.
    pub action: String,
    /// Valid candidates, in generation order.
    pub candidates: Vec<Candidate>,
    /// What happened along the way.
    pub diagnostics: Diagnostics,
}

impl ResolutionResult {
    /// Returns true if at least one candidate is valid.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.candidates.is_empty()
    }

    /// Returns the distinct entities offered for `slot`, in candidate order.
    #[must_use]
    pub fn options(&self, slot: &str) -> Vec<EntityId> {
        let mut seen = Vec::new();
        for entity in self.candidates.iter().filter_map(|c| c.get(slot)) {
            if !seen.contains(&entity) {
                seen.push(entity);
            }
        }
        seen
    }
}
