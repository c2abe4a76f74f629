//! Resolver configuration.

use quarry_scope::DEFAULT_MAX_DEPTH;

use crate::combination::TruncationStrategy;

/// Default cap on candidates generated per resolution.
pub const DEFAULT_GLOBAL_LIMIT: usize = 100;

/// Resolver tuning knobs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Maximum candidates generated per resolution.
    pub global_limit: usize,
    /// Nesting limit for scopes and predicates.
    pub max_scope_depth: usize,
    /// How per-slot caps pick entities.
    pub truncation: TruncationStrategy,
    /// Memoise scope parses and results within a cache.
    pub scope_cache: bool,
    /// Measure stage timings.
    pub timings: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            global_limit: DEFAULT_GLOBAL_LIMIT,
            max_scope_depth: DEFAULT_MAX_DEPTH,
            truncation: TruncationStrategy::FirstN,
            scope_cache: true,
            timings: true,
        }
    }
}

impl ResolverConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the global candidate limit.
    #[must_use]
    pub fn with_global_limit(mut self, limit: usize) -> Self {
        self.global_limit = limit;
        self
    }

    /// Sets the nesting limit.
    #[must_use]
    pub fn with_max_scope_depth(mut self, depth: usize) -> Self {
        self.max_scope_depth = depth;
        self
    }

    /// Sets the truncation strategy.
    #[must_use]
    pub fn with_truncation(mut self, truncation: TruncationStrategy) -> Self {
        self.truncation = truncation;
        self
    }

    /// Enables or disables the scope cache.
    #[must_use]
    pub fn with_scope_cache(mut self, enabled: bool) -> Self {
        self.scope_cache = enabled;
        self
    }

    /// Enables or disables stage timings.
    #[must_use]
    pub fn with_timings(mut self, enabled: bool) -> Self {
        self.timings = enabled;
        self
    }
}
