//! Multi-target action resolution for Quarry.
//!
//! This crate provides:
//! - [`ActionDefinition`] / [`TargetSlot`] - Validated action definitions
//! - [`order`] - Slot ordering by `contextFrom` dependency, with cycle detection
//! - [`ContextBuilder`] - Per-slot evaluation contexts
//! - [`generate`] - Bounded, deterministic cartesian products
//! - [`CandidateValidator`] - Structural checks and cross-slot constraints
//! - [`TargetResolver`] - The full pipeline, producing a [`ResolutionResult`]
//!
//! # Example
//!
//! ```
//! use quarry_foundation::Value;
//! use quarry_resolve::{ActionDefinition, ResolutionContext, TargetResolver, TargetSlot};
//! use quarry_storage::World;
//!
//! let (world, room) = World::new().spawn_with([("core:room", Value::Bool(true))]);
//! let (world, actor) = world.spawn_with([("core:actor", Value::Bool(true))]);
//! let (world, chest) = world.spawn_with([("core:container", Value::Bool(true))]);
//! let world = world.place(actor, room).unwrap().place(chest, room).unwrap();
//!
//! let open = ActionDefinition::new(
//!     "core:open",
//!     vec![TargetSlot::new("container", "at(location)[(= entity.core:container true)]")],
//! )
//! .unwrap();
//!
//! let resolver = TargetResolver::new(&world);
//! let result = resolver
//!     .resolve(&open, &ResolutionContext::new(actor).with_location(room))
//!     .unwrap();
//! assert_eq!(result.options("container"), vec![chest]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod action;
pub mod combination;
pub mod config;
pub mod context;
pub mod dependency;
pub mod diagnostics;
pub mod report;
pub mod resolver;
pub mod validation;

pub use action::{ActionBuilder, ActionDefinition, CrossSlotConstraint, DefinitionError, SlotValidation, TargetSlot};
pub use combination::{Candidate, Combinations, SlotChoices, TruncationStrategy, generate};
pub use config::{DEFAULT_GLOBAL_LIMIT, ResolverConfig};
pub use context::{ContextBuilder, ResolutionContext};
pub use dependency::{CyclicDependencyError, order, order_indices};
pub use diagnostics::{DiagnosticRecord, Diagnostics, ResolutionResult, SlotDiagnostics, Timings};
pub use report::{NoopReporter, RecordingReporter, ResolutionReporter, Stage};
pub use resolver::TargetResolver;
pub use validation::{CandidateValidator, RejectionKind, RejectionReason, ValidationOutcome};
