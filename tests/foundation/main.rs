//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Value, EntityId, Type, Error, and persistent collections.

mod errors;
