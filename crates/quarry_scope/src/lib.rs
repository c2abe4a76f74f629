//! Scope expressions and predicates for Quarry.
//!
//! This crate provides:
//! - [`parse_scope`] / [`parse_predicate`] - Lexer and parser for both grammars
//! - [`ScopeEvaluator`] - Navigates entity data from a context to a set of entities
//! - [`PredicateEvaluator`] - Pluggable filter evaluation, with [`Interpreter`] as the reference
//! - [`ScopeRegistry`] - Namespaced, reusable scope definitions
//! - [`ScopeCache`] - Memoised parses and results keyed by context fingerprint
//!
//! # Scope language
//!
//! ```text
//! actor.core:inventory[]                       all carried items
//! at(location)[(!= entity actor)]              everyone else in the room
//! actor.core:inventory[(= entity.core:key.type target.core:lock.type)]
//! core:followers | entities(core:companion)    union, de-duplicated
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ast;
pub mod cache;
pub mod context;
pub mod environment;
pub mod evaluator;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod predicate;
pub mod registry;
pub mod token;

pub use ast::{ScopeExpr, Source, Step};
pub use cache::{CacheStats, ScopeCache};
pub use context::EvaluationContext;
pub use environment::{DEFAULT_MAX_DEPTH, Environment};
pub use evaluator::ScopeEvaluator;
pub use interpreter::Interpreter;
pub use parser::{MAX_PARSE_DEPTH, parse_predicate, parse_scope};
pub use predicate::{CollectionOp, CompareOp, LogicalOp, Predicate, PredicateEvaluator};
pub use registry::ScopeRegistry;

/// Error raised while parsing or evaluating a scope expression.
///
/// This is the foundation error; the source expression is attached as context.
pub type ScopeEvaluationError = quarry_foundation::Error;
