//! Integration tests for Layer 2: Scope
//!
//! Tests for the scope DSL, the predicate interpreter, named scopes, and the
//! evaluation cache working together over a real world.

mod evaluation;
