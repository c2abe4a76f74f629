//! Abstract syntax tree for scope expressions.

use std::fmt;

use crate::predicate::Predicate;

/// A parsed scope expression.
#[derive(Clone, Debug, PartialEq)]
pub enum ScopeExpr {
    /// A source followed by navigation steps.
    Path {
        /// Where navigation starts.
        source: Source,
        /// Steps applied left to right.
        steps: Vec<Step>,
    },
    /// Union of two or more terms, de-duplicated by entity id.
    Union(Vec<ScopeExpr>),
}

impl ScopeExpr {
    /// Creates a path expression with no steps.
    #[must_use]
    pub fn source(source: Source) -> Self {
        Self::Path {
            source,
            steps: Vec::new(),
        }
    }

    /// Returns the named scopes this expression references directly.
    #[must_use]
    pub fn named_references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Path { source, .. } => match source {
                Source::Named(name) => out.push(name),
                Source::At(inner) | Source::Group(inner) => inner.collect_references(out),
                _ => {}
            },
            Self::Union(terms) => {
                for term in terms {
                    term.collect_references(out);
                }
            }
        }
    }
}

/// Where a scope path starts.
#[derive(Clone, Debug, PartialEq)]
pub enum Source {
    /// The acting entity.
    Actor,
    /// The actor's location, if any.
    Location,
    /// The opaque game value.
    Game,
    /// The first entity of the slot named by `contextFrom`.
    Target,
    /// Map of already-resolved slots to their entity lists.
    Targets,
    /// Nothing.
    None,
    /// Every entity carrying the named component.
    Entities(String),
    /// Entities located at each entity of the inner expression.
    At(Box<ScopeExpr>),
    /// A parenthesised sub-expression.
    Group(Box<ScopeExpr>),
    /// A reference to a registered scope such as `core:followers`.
    Named(String),
}

/// A navigation step.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// `.name`: a component on an entity or a field on a map.
    Field(String),
    /// `[]`: all elements of a collection.
    Each,
    /// `[predicate]`: keep items for which the predicate holds.
    Filter(Predicate),
}

impl fmt::Display for ScopeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path { source, steps } => {
                write!(f, "{source}")?;
                for step in steps {
                    write!(f, "{step}")?;
                }
                Ok(())
            }
            Self::Union(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{term}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Actor => write!(f, "actor"),
            Self::Location => write!(f, "location"),
            Self::Game => write!(f, "game"),
            Self::Target => write!(f, "target"),
            Self::Targets => write!(f, "targets"),
            Self::None => write!(f, "none"),
            Self::Entities(component) => write!(f, "entities({component})"),
            Self::At(inner) => write!(f, "at({inner})"),
            Self::Group(inner) => write!(f, "({inner})"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, ".{name}"),
            Self::Each => write!(f, "[]"),
            Self::Filter(predicate) => write!(f, "[{predicate}]"),
        }
    }
}
