//! Core types, values, and persistent collections for Quarry.
//!
//! This crate provides:
//! - [`Value`] - The data type for component payloads and predicate operands
//! - [`EntityId`] - Generational entity identifiers
//! - [`Type`] - Type descriptors for structural validation
//! - [`Error`] - Rich error types with context
//! - Persistent collections ([`LtVec`], [`LtMap`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collections;
pub mod entity;
pub mod error;
pub mod types;
pub mod value;

pub use collections::{LtMap, LtVec};
pub use entity::EntityId;
pub use error::{Error, ErrorContext, ErrorKind, SemanticLimit};
pub use types::Type;
pub use value::Value;

/// Result type for Quarry operations.
pub type Result<T> = std::result::Result<T, Error>;
