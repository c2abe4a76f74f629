//! Stage reporting hooks.

use std::fmt;
use std::sync::{Mutex, PoisonError};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::diagnostics::DiagnosticRecord;

/// A resolution pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Stage {
    /// Slot dependency ordering.
    Ordering,
    /// Per-slot scope evaluation.
    ScopeEvaluation,
    /// Combination generation.
    Generation,
    /// Candidate validation.
    Validation,
    /// Resolution finished.
    Complete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ordering => "ordering",
            Self::ScopeEvaluation => "scope_evaluation",
            Self::Generation => "generation",
            Self::Validation => "validation",
            Self::Complete => "complete",
        })
    }
}

/// Receives every diagnostic record as it is produced.
pub trait ResolutionReporter: Send + Sync {
    /// Called once per record.
    fn report(&self, stage: Stage, record: &DiagnosticRecord);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReporter;

impl ResolutionReporter for NoopReporter {
    fn report(&self, _stage: Stage, _record: &DiagnosticRecord) {}
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    records: Mutex<Vec<(Stage, DiagnosticRecord)>>,
}

impl RecordingReporter {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    #[must_use]
    pub fn records(&self) -> Vec<(Stage, DiagnosticRecord)> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the stages seen, in order, without repeats.
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages: Vec<Stage> = Vec::new();
        for (stage, _) in self.records() {
            if stages.last() != Some(&stage) {
                stages.push(stage);
            }
        }
        stages
    }

    /// Forgets everything recorded.
    pub fn clear(&self) {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl ResolutionReporter for RecordingReporter {
    fn report(&self, stage: Stage, record: &DiagnosticRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((stage, record.clone()));
    }
}
