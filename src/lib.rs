//! Quarry - Multi-target action resolution
//!
//! This crate re-exports all layers of the Quarry system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: quarry_resolve     Slot ordering, combinations, validation, orchestration
//! Layer 2: quarry_scope       Scope DSL, predicate interpreter, scope evaluator
//! Layer 1: quarry_storage     Entity data gateway, in-memory world
//! Layer 0: quarry_foundation  Core types (Value, EntityId, Type, Error)
//! ```

pub use quarry_foundation as foundation;
pub use quarry_resolve as resolve;
pub use quarry_scope as scope;
pub use quarry_storage as storage;
