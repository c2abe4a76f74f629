//! Variable bindings for predicate evaluation.

use std::sync::Arc;

use quarry_foundation::{Error, LtMap, Result, SemanticLimit, Value};
use quarry_storage::EntityGateway;

/// Default nesting limit for scope and predicate evaluation.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Bound variables plus read access to entity data.
///
/// Environments are cheap to clone; binding a variable returns a new
/// environment sharing the existing bindings.
#[derive(Clone)]
pub struct Environment<'g> {
    gateway: &'g dyn EntityGateway,
    bindings: LtMap<Value>,
    depth: usize,
    max_depth: usize,
}

impl<'g> Environment<'g> {
    /// Creates an empty environment over a gateway.
    #[must_use]
    pub fn new(gateway: &'g dyn EntityGateway) -> Self {
        Self {
            gateway,
            bindings: LtMap::new(),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Binds a variable.
    #[must_use]
    pub fn with_binding(mut self, name: impl Into<Arc<str>>, value: Value) -> Self {
        self.bindings = self.bindings.insert(name, value);
        self
    }

    /// Sets the nesting limit.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the current nesting depth.
    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Returns a child environment one level deeper with `name` bound.
    ///
    /// # Errors
    ///
    /// Returns `LimitExceeded` when the child would be deeper than the limit.
    pub fn nested(&self, name: &str, value: Value) -> Result<Self> {
        let depth = self.depth + 1;
        if depth > self.max_depth {
            return Err(Error::limit_exceeded(SemanticLimit::MaxScopeDepth {
                limit: self.max_depth,
            }));
        }
        Ok(Self {
            gateway: self.gateway,
            bindings: self.bindings.insert(name, value),
            depth,
            max_depth: self.max_depth,
        })
    }

    /// Looks up a bound variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Returns true if `name` is bound.
    #[must_use]
    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Returns the entity gateway.
    #[must_use]
    pub fn gateway(&self) -> &'g dyn EntityGateway {
        self.gateway
    }

    /// Returns the current nesting depth.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the nesting limit.
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl std::fmt::Debug for Environment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("bindings", &self.bindings)
            .field("depth", &self.depth)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}
