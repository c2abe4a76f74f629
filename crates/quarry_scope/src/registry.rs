//! Named scope definitions.
//!
//! Mods publish reusable scopes under namespaced names (`core:followers`).
//! Scope expressions refer to them by name; the evaluator resolves the
//! reference here at evaluation time.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use quarry_foundation::{Error, Result};

use crate::ast::ScopeExpr;
use crate::parser::parse_scope;

/// Registry of named scope expressions.
///
/// Every definition change refreshes a digest of the registered scopes, so
/// cached results can tell registries with different definitions apart.
#[derive(Clone, Debug, Default)]
pub struct ScopeRegistry {
    scopes: BTreeMap<String, Arc<ScopeExpr>>,
    digest: u64,
}

impl ScopeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and registers a scope, replacing any previous definition.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the name is not namespaced (`mod:name`) or the
    /// source does not parse.
    pub fn define(&mut self, name: &str, source: &str) -> Result<()> {
        let expr = parse_scope(source)?;
        self.insert(name, expr)
    }

    /// Registers an already-parsed scope.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the name is not namespaced.
    pub fn insert(&mut self, name: &str, expr: ScopeExpr) -> Result<()> {
        if !name.contains(':') || name.starts_with(':') || name.ends_with(':') {
            return Err(Error::parse(format!("scope name `{name}` must be namespaced as mod:name"), 0)
                .in_source(name));
        }
        self.scopes.insert(name.to_string(), Arc::new(expr));
        self.digest = self.compute_digest();
        Ok(())
    }

    /// Builder form of [`ScopeRegistry::define`].
    ///
    /// # Errors
    ///
    /// See [`ScopeRegistry::define`].
    pub fn with_scope(mut self, name: &str, source: &str) -> Result<Self> {
        self.define(name, source)?;
        Ok(self)
    }

    /// Looks up a scope by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<ScopeExpr>> {
        self.scopes.get(name)
    }

    /// Looks up a scope, failing with `UndefinedScope` when absent.
    ///
    /// # Errors
    ///
    /// Returns `UndefinedScope` if no scope has this name.
    pub fn resolve(&self, name: &str) -> Result<Arc<ScopeExpr>> {
        self.scopes
            .get(name)
            .cloned()
            .ok_or_else(|| Error::undefined_scope(name))
    }

    /// Returns true if a scope with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.scopes.contains_key(name)
    }

    /// Returns the registered names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }

    /// Returns the number of registered scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Hash of every registered name and definition.
    ///
    /// Equal definitions give equal digests; an empty registry is `0`.
    #[must_use]
    pub const fn digest(&self) -> u64 {
        self.digest
    }

    fn compute_digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for (name, expr) in &self.scopes {
            name.hash(&mut hasher);
            expr.to_string().hash(&mut hasher);
        }
        hasher.finish()
    }
}
