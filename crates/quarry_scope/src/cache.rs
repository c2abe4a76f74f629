//! Scope evaluation cache.
//!
//! Memoises parsed expressions by source text and evaluation results by
//! `(source, fingerprint)`, where the evaluator folds the context, its scope
//! registry and its depth limit into the fingerprint. Lookups are read-through and stores are
//! last-write-wins. Nothing is ever invalidated: a cache must not outlive the
//! world snapshot it was filled from.

use std::collections::HashMap;
use std::sync::Arc;

use quarry_foundation::{EntityId, Result};

use crate::ast::ScopeExpr;
use crate::parser::parse_scope;

/// Hit/miss counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Result lookups answered from the cache.
    pub hits: u64,
    /// Result lookups that had to evaluate.
    pub misses: u64,
}

/// Cache of parsed scopes and scope results.
#[derive(Debug, Default)]
pub struct ScopeCache {
    parsed: HashMap<String, Arc<ScopeExpr>>,
    results: HashMap<(String, u64), Vec<EntityId>>,
    stats: CacheStats,
}

impl ScopeCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the parsed form of `source`, parsing it on first use.
    ///
    /// # Errors
    ///
    /// Returns the parse error; failures are not cached.
    pub fn parse(&mut self, source: &str) -> Result<Arc<ScopeExpr>> {
        if let Some(expr) = self.parsed.get(source) {
            return Ok(Arc::clone(expr));
        }
        let expr = Arc::new(parse_scope(source)?);
        self.parsed.insert(source.to_string(), Arc::clone(&expr));
        Ok(expr)
    }

    /// Looks up a cached result, counting the hit or miss.
    pub fn lookup(&mut self, source: &str, fingerprint: u64) -> Option<Vec<EntityId>> {
        let found = self.results.get(&(source.to_string(), fingerprint)).cloned();
        if found.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        found
    }

    /// Stores a result.
    pub fn store(&mut self, source: &str, fingerprint: u64, entities: Vec<EntityId>) {
        self.results.insert((source.to_string(), fingerprint), entities);
    }

    /// Returns hit/miss counters.
    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Returns the number of cached results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if no results are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Drops every cached parse and result, keeping the counters.
    pub fn clear(&mut self) {
        self.parsed.clear();
        self.results.clear();
    }
}
