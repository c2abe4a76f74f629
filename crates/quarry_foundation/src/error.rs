//! Error types for the Quarry system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::entity::EntityId;
use crate::types::Type;

/// The main error type for Quarry operations.
#[derive(Clone, Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Sets the source expression, creating context if needed.
    #[must_use]
    pub fn in_source(mut self, source: impl Into<String>) -> Self {
        let context = self.context.take().unwrap_or_default();
        self.context = Some(context.with_source(source));
        self
    }

    /// Records that the error passed through `frame`. Frames read outermost first.
    #[must_use]
    pub fn in_frame(mut self, frame: impl Into<String>) -> Self {
        let mut context = self.context.take().unwrap_or_default();
        context.stack.insert(0, frame.into());
        self.context = Some(context);
        self
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: impl Into<String>, actual: Type) -> Self {
        Self::new(ErrorKind::TypeMismatch {
            expected: expected.into(),
            actual,
        })
    }

    /// Creates an entity not found error.
    #[must_use]
    pub fn entity_not_found(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityNotFound(id))
    }

    /// Creates a parse error at a byte offset.
    #[must_use]
    pub fn parse(message: impl Into<String>, offset: usize) -> Self {
        Self::new(ErrorKind::ParseError {
            message: message.into(),
            offset,
        })
    }

    /// Creates an undefined scope error.
    #[must_use]
    pub fn undefined_scope(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UndefinedScope(name.into()))
    }

    /// Creates an arity mismatch error.
    #[must_use]
    pub fn arity_mismatch(operator: impl Into<String>, expected: impl Into<String>, actual: usize) -> Self {
        Self::new(ErrorKind::ArityMismatch {
            operator: operator.into(),
            expected: expected.into(),
            actual,
        })
    }

    /// Creates a semantic limit exceeded error.
    #[must_use]
    pub fn limit_exceeded(limit: SemanticLimit) -> Self {
        Self::new(ErrorKind::LimitExceeded(limit))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ErrorKind {
    /// A value had the wrong shape for the operation applied to it.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Description of what the operation needed.
        expected: String,
        /// The actual type encountered.
        actual: Type,
    },

    /// Entity was not found in storage.
    #[error("entity not found: {0:?}")]
    EntityNotFound(EntityId),

    /// Malformed scope or predicate source.
    #[error("parse error at offset {offset}: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Byte offset into the source.
        offset: usize,
    },

    /// A named scope reference has no definition.
    #[error("undefined scope: {0}")]
    UndefinedScope(String),

    /// Named scopes reference each other in a loop.
    #[error("scope reference cycle: {}", .0.join(" -> "))]
    ScopeCycle(Vec<String>),

    /// Unknown predicate operator.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// Wrong number of operands to a predicate operator.
    #[error("arity mismatch for {operator}: expected {expected}, got {actual}")]
    ArityMismatch {
        /// The operator.
        operator: String,
        /// Description of expected arity.
        expected: String,
        /// Actual number of operands.
        actual: usize,
    },

    /// Semantic limit exceeded (kill switch triggered).
    #[error("limit exceeded: {0}")]
    LimitExceeded(SemanticLimit),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Semantic limits (kill switches) that can be exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticLimit {
    /// Scope evaluation nested deeper than allowed.
    MaxScopeDepth {
        /// The configured limit.
        limit: usize,
    },
    /// Source text nested deeper than the parser accepts.
    MaxParseDepth {
        /// The fixed limit.
        limit: usize,
    },
}

impl fmt::Display for SemanticLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxScopeDepth { limit } => write!(f, "max scope depth ({limit}) exceeded"),
            Self::MaxParseDepth { limit } => write!(f, "max parse depth ({limit}) exceeded"),
        }
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Expression source text, or the name of the slot/constraint being evaluated.
    pub source: Option<String>,
    /// Chain of named scopes or slots being evaluated, outermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "in `{source}`")?;
        }
        for frame in &self.stack {
            write!(f, "\n  via {frame}")?;
        }
        Ok(())
    }
}
