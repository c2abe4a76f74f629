//! Integration tests for Error types
//!
//! Tests error construction, display, and context frames.

use quarry_foundation::{EntityId, Error, ErrorKind, SemanticLimit, Type};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_type_mismatch() {
    let err = Error::type_mismatch("collection", Type::Int);
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
    let msg = format!("{err}");
    assert!(msg.contains("collection"));
    assert!(msg.contains("int"));
}

#[test]
fn error_entity_not_found() {
    let err = Error::entity_not_found(EntityId::new(42, 1));
    assert!(matches!(err.kind, ErrorKind::EntityNotFound(_)));
    assert!(format!("{err}").contains("42"));
}

#[test]
fn error_parse_carries_offset() {
    let err = Error::parse("unexpected `)`", 7);
    assert!(matches!(err.kind, ErrorKind::ParseError { offset: 7, .. }));
    assert!(format!("{err}").contains("offset 7"));
}

#[test]
fn error_arity_mismatch() {
    let err = Error::arity_mismatch("not", "1", 3);
    let msg = format!("{err}");
    assert!(msg.contains("not"));
    assert!(msg.contains('3'));
}

#[test]
fn error_limit_exceeded() {
    let err = Error::limit_exceeded(SemanticLimit::MaxScopeDepth { limit: 16 });
    assert!(format!("{err}").contains("max scope depth (16)"));
}

// =============================================================================
// Error Context
// =============================================================================

#[test]
fn source_and_frames_accumulate() {
    let err = Error::undefined_scope("core:ghosts")
        .in_frame("core:inner")
        .in_frame("core:outer")
        .in_source("core:outer | actor");

    let context = err.context.expect("context was attached");
    assert_eq!(context.source.as_deref(), Some("core:outer | actor"));
    assert_eq!(context.stack, vec!["core:outer", "core:inner"]);
}

#[test]
fn scope_cycle_display_joins_chain() {
    let err = Error::new(ErrorKind::ScopeCycle(vec!["a:x".into(), "a:y".into(), "a:x".into()]));
    assert_eq!(format!("{err}"), "scope reference cycle: a:x -> a:y -> a:x");
}
