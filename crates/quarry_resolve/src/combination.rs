//! Bounded combination generation.
//!
//! Per-slot sets are capped first, then combined as a cartesian product in
//! slot declaration order with the last slot varying fastest. The product is
//! enumerated lazily and stops at the global limit.

use quarry_foundation::EntityId;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[cfg(feature = "serde")]
use serde::Serialize;

/// How a per-slot cap chooses which entities to keep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum TruncationStrategy {
    /// Keep the first N in evaluator order.
    #[default]
    FirstN,
    /// Keep a seeded pseudo-random N, preserving evaluator order among them.
    Sample {
        /// RNG seed; equal seeds keep equal subsets.
        seed: u64,
    },
}

impl TruncationStrategy {
    /// Caps `entities` to at most `max`, returning whether anything was dropped.
    #[must_use]
    pub fn apply(self, entities: Vec<EntityId>, max: usize) -> (Vec<EntityId>, bool) {
        if entities.len() <= max {
            return (entities, false);
        }
        let kept = match self {
            Self::FirstN => entities.into_iter().take(max).collect(),
            Self::Sample { seed } => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let mut picks = rand::seq::index::sample(&mut rng, entities.len(), max).into_vec();
                picks.sort_unstable();
                picks.into_iter().map(|i| entities[i]).collect()
            }
        };
        (kept, true)
    }
}

/// One complete assignment of entities to slots, in declaration order.
///
/// Optional slots that resolved to nothing are present but unassigned.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Candidate {
    assignments: Vec<(String, Option<EntityId>)>,
}

impl Candidate {
    /// Creates a candidate from `(slot, entity)` pairs.
    #[must_use]
    pub fn new(assignments: Vec<(String, Option<EntityId>)>) -> Self {
        Self { assignments }
    }

    /// Returns the entity assigned to `slot`.
    #[must_use]
    pub fn get(&self, slot: &str) -> Option<EntityId> {
        self.assignments
            .iter()
            .find(|(name, _)| name == slot)
            .and_then(|(_, entity)| *entity)
    }

    /// Iterates `(slot, entity)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<EntityId>)> {
        self.assignments.iter().map(|(name, entity)| (name.as_str(), *entity))
    }

    /// Iterates assigned `(slot, entity)` pairs only.
    pub fn assigned(&self) -> impl Iterator<Item = (&str, EntityId)> {
        self.iter().filter_map(|(name, entity)| entity.map(|e| (name, e)))
    }

    /// Returns the number of slots, assigned or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Returns true if the candidate has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// The choices for one slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotChoices {
    /// Slot name.
    pub slot: String,
    /// Capped resolved entities, in evaluator order.
    pub entities: Vec<EntityId>,
    /// Whether the slot must be assigned.
    pub required: bool,
}

impl SlotChoices {
    /// Creates slot choices.
    #[must_use]
    pub fn new(slot: impl Into<String>, entities: Vec<EntityId>, required: bool) -> Self {
        Self {
            slot: slot.into(),
            entities,
            required,
        }
    }
}

/// Output of [`generate`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Combinations {
    /// Candidates in enumeration order.
    pub candidates: Vec<Candidate>,
    /// Size of the full product, saturating.
    pub total: usize,
    /// True if the global limit stopped enumeration early.
    pub truncated: bool,
}

/// Enumerates the cartesian product of `slots`, at most `global_limit` long.
///
/// A required slot with no entities makes the product empty. An optional
/// slot with no entities contributes a single unassigned term.
#[must_use]
pub fn generate(slots: &[SlotChoices], global_limit: usize) -> Combinations {
    if slots.iter().any(|s| s.required && s.entities.is_empty()) {
        return Combinations::default();
    }

    let terms: Vec<Vec<Option<EntityId>>> = slots
        .iter()
        .map(|s| {
            if s.entities.is_empty() {
                vec![None]
            } else {
                s.entities.iter().copied().map(Some).collect()
            }
        })
        .collect();

    let total = terms.iter().fold(1usize, |acc, t| acc.saturating_mul(t.len()));
    let wanted = total.min(global_limit);

    let mut candidates = Vec::with_capacity(wanted);
    let mut odometer = vec![0usize; terms.len()];
    while candidates.len() < wanted {
        candidates.push(Candidate::new(
            slots
                .iter()
                .zip(&terms)
                .zip(&odometer)
                .map(|((slot, term), &i)| (slot.slot.clone(), term[i]))
                .collect(),
        ));
        if !advance(&mut odometer, &terms) {
            break;
        }
    }

    Combinations {
        candidates,
        total,
        truncated: total > global_limit,
    }
}

/// Steps the odometer, last position fastest. Returns false after the last combination.
fn advance(odometer: &mut [usize], terms: &[Vec<Option<EntityId>>]) -> bool {
    for pos in (0..odometer.len()).rev() {
        odometer[pos] += 1;
        if odometer[pos] < terms[pos].len() {
            return true;
        }
        odometer[pos] = 0;
    }
    false
}
