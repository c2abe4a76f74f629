//! Predicate expressions and the evaluator interface.
//!
//! Predicates are small S-expressions used inside scope filter brackets and
//! as cross-slot constraints:
//!
//! ```text
//! (= entity.core:lock.type target.core:lock.type)
//! (and (> entity.core:weight 0) (not (in entity targets.weapon)))
//! (any actor.core:inventory (= item entity))
//! ```
//!
//! The AST is evaluated through [`PredicateEvaluator`], so hosts can plug in
//! a different engine. [`crate::Interpreter`] is the reference implementation.

use std::fmt;

use quarry_foundation::{Result, Value};

use crate::environment::Environment;
use crate::parser::Parser;

/// Evaluates predicates against an environment of bound variables.
pub trait PredicateEvaluator: Send + Sync {
    /// Returns whether `predicate` holds under `env`.
    ///
    /// # Errors
    ///
    /// Returns an error for genuine type mismatches or when a nesting limit is hit.
    fn evaluate(&self, predicate: &Predicate, env: &Environment<'_>) -> Result<bool>;
}

/// A predicate expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// A constant.
    Literal(Value),
    /// A bound variable followed by an optional field path.
    Var {
        /// Variable name (`entity`, `actor`, `item`, a slot name, ...).
        name: String,
        /// Components or fields navigated from the variable, in order.
        path: Vec<String>,
    },
    /// Binary comparison.
    Comparison {
        /// The comparison operator.
        op: CompareOp,
        /// Left operand.
        left: Box<Predicate>,
        /// Right operand.
        right: Box<Predicate>,
    },
    /// Boolean connective.
    Logical {
        /// The connective.
        op: LogicalOp,
        /// Operands (exactly one for `not`).
        operands: Vec<Predicate>,
    },
    /// Operation over a collection.
    CollectionOp(CollectionOp),
}

impl Predicate {
    /// Parses a predicate from source text.
    ///
    /// # Errors
    ///
    /// Returns a parse error describing the first malformed token.
    pub fn parse(source: &str) -> Result<Self> {
        Parser::new(source).parse_predicate_source()
    }

    /// Creates a literal predicate.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Creates a variable reference from a dotted path like `entity.core:lock.type`.
    #[must_use]
    pub fn var(dotted: &str) -> Self {
        let mut parts = dotted.split('.').map(str::to_string);
        let name = parts.next().unwrap_or_default();
        Self::Var {
            name,
            path: parts.collect(),
        }
    }

    /// Creates a comparison.
    #[must_use]
    pub fn compare(op: CompareOp, left: Predicate, right: Predicate) -> Self {
        Self::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Creates a conjunction.
    #[must_use]
    pub fn and(operands: Vec<Predicate>) -> Self {
        Self::Logical {
            op: LogicalOp::And,
            operands,
        }
    }

    /// Creates a negation.
    #[must_use]
    pub fn not(operand: Predicate) -> Self {
        Self::Logical {
            op: LogicalOp::Not,
            operands: vec![operand],
        }
    }

    /// Returns the variable names this predicate reads, including shadowed `item`.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::Var { name, .. } => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Self::Comparison { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            Self::Logical { operands, .. } => {
                for operand in operands {
                    operand.collect_variables(out);
                }
            }
            Self::CollectionOp(op) => match op {
                CollectionOp::In { item, collection } => {
                    item.collect_variables(out);
                    collection.collect_variables(out);
                }
                CollectionOp::Any { collection, body } | CollectionOp::All { collection, body } => {
                    collection.collect_variables(out);
                    body.collect_variables(out);
                }
                CollectionOp::Count(collection) => collection.collect_variables(out),
            },
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{value:?}"),
            Self::Var { name, path } => {
                write!(f, "{name}")?;
                for segment in path {
                    write!(f, ".{segment}")?;
                }
                Ok(())
            }
            Self::Comparison { op, left, right } => write!(f, "({op} {left} {right})"),
            Self::Logical { op, operands } => {
                write!(f, "({op}")?;
                for operand in operands {
                    write!(f, " {operand}")?;
                }
                write!(f, ")")
            }
            Self::CollectionOp(op) => match op {
                CollectionOp::In { item, collection } => write!(f, "(in {item} {collection})"),
                CollectionOp::Any { collection, body } => write!(f, "(any {collection} {body})"),
                CollectionOp::All { collection, body } => write!(f, "(all {collection} {body})"),
                CollectionOp::Count(collection) => write!(f, "(count {collection})"),
            },
        }
    }
}

/// Comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// Applies the comparison.
    ///
    /// Numbers compare across int and float. Ordering between incompatible
    /// types is false rather than an error.
    #[must_use]
    pub fn apply(self, left: &Value, right: &Value) -> bool {
        match self {
            Self::Eq => values_equal(left, right),
            Self::NotEq => !values_equal(left, right),
            Self::Lt => left.partial_cmp(right).is_some_and(std::cmp::Ordering::is_lt),
            Self::Le => left.partial_cmp(right).is_some_and(std::cmp::Ordering::is_le),
            Self::Gt => left.partial_cmp(right).is_some_and(std::cmp::Ordering::is_gt),
            Self::Ge => left.partial_cmp(right).is_some_and(std::cmp::Ordering::is_ge),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        f.write_str(symbol)
    }
}

/// Equality used by predicates: structural, except that numbers compare by value.
#[must_use]
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            left.partial_cmp(right) == Some(std::cmp::Ordering::Equal)
        }
        _ => left == right,
    }
}

/// Boolean connectives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    /// True when every operand is truthy.
    And,
    /// True when any operand is truthy.
    Or,
    /// Negates its single operand.
    Not,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        })
    }
}

/// Operations over collections. `nil` counts as the empty collection.
#[derive(Clone, Debug, PartialEq)]
pub enum CollectionOp {
    /// Membership: element of a vec, or key of a map.
    In {
        /// The value searched for.
        item: Box<Predicate>,
        /// The collection searched.
        collection: Box<Predicate>,
    },
    /// True when `body` holds for some element, with `item` bound to it.
    Any {
        /// The collection iterated.
        collection: Box<Predicate>,
        /// Evaluated per element.
        body: Box<Predicate>,
    },
    /// True when `body` holds for every element, with `item` bound to it.
    All {
        /// The collection iterated.
        collection: Box<Predicate>,
        /// Evaluated per element.
        body: Box<Predicate>,
    },
    /// Number of elements.
    Count(Box<Predicate>),
}
