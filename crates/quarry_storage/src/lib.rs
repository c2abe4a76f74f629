//! Entity data gateway and in-memory world state for Quarry.
//!
//! This crate provides:
//! - [`EntityGateway`] - The read-only accessor the resolution engine navigates
//! - [`World`] - Immutable world state with structural sharing that implements it
//!
//! The resolution engine never writes through the gateway. Any storage engine
//! can be plugged in by implementing [`EntityGateway`]; `World` is the
//! reference implementation used by tests, benchmarks and small hosts.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod gateway;
pub mod world;

pub use gateway::EntityGateway;
pub use world::World;
