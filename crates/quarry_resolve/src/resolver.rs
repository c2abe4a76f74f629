//! Resolution orchestration.
//!
//! Resolving an action:
//! 1. Orders slots by their `contextFrom` dependencies
//! 2. Evaluates each slot's scope in that order, capping and recording results
//! 3. Generates the bounded product of the per-slot sets
//! 4. Validates every candidate
//! 5. Assembles diagnostics
//!
//! Only a dependency cycle is an error. Everything else, including a scope
//! that fails to parse, lands in the result's diagnostics.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use quarry_scope::{Interpreter, PredicateEvaluator, ScopeCache, ScopeEvaluator, ScopeRegistry};
use quarry_storage::EntityGateway;

use crate::action::ActionDefinition;
use crate::combination::{Combinations, SlotChoices, generate};
use crate::config::ResolverConfig;
use crate::context::{ContextBuilder, ResolutionContext};
use crate::dependency::{CyclicDependencyError, order_indices};
use crate::diagnostics::{DiagnosticRecord, Diagnostics, ResolutionResult, SlotDiagnostics, Timings};
use crate::report::{NoopReporter, ResolutionReporter};
use crate::validation::CandidateValidator;

// =============================================================================
// Resolver
// =============================================================================

/// Resolves actions into valid target combinations.
///
/// Holds only read-only collaborators, so one resolver can serve any number
/// of calls, from any number of threads when the gateway allows it.
pub struct TargetResolver<G, P = Interpreter> {
    gateway: G,
    predicates: P,
    registry: ScopeRegistry,
    config: ResolverConfig,
    reporter: Arc<dyn ResolutionReporter>,
}

impl<G: EntityGateway> TargetResolver<G> {
    /// Creates a resolver with the reference predicate interpreter.
    #[must_use]
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            predicates: Interpreter,
            registry: ScopeRegistry::new(),
            config: ResolverConfig::default(),
            reporter: Arc::new(NoopReporter),
        }
    }
}

impl<G: EntityGateway, P: PredicateEvaluator> TargetResolver<G, P> {
    /// Swaps the predicate evaluator.
    #[must_use]
    pub fn with_predicates<Q: PredicateEvaluator>(self, predicates: Q) -> TargetResolver<G, Q> {
        TargetResolver {
            gateway: self.gateway,
            predicates,
            registry: self.registry,
            config: self.config,
            reporter: self.reporter,
        }
    }

    /// Sets the named scope registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ScopeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the diagnostic reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ResolutionReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Returns the gateway.
    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Returns the named scope registry.
    #[must_use]
    pub fn registry(&self) -> &ScopeRegistry {
        &self.registry
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves an action with a fresh, call-scoped scope cache.
    ///
    /// # Errors
    ///
    /// Returns [`CyclicDependencyError`] if the action's slots depend on each
    /// other in a cycle. No scope is evaluated in that case.
    pub fn resolve(
        &self,
        action: &ActionDefinition,
        context: &ResolutionContext,
    ) -> Result<ResolutionResult, CyclicDependencyError> {
        let mut cache = ScopeCache::new();
        self.resolve_with_cache(action, context, &mut cache)
    }

    /// Resolves an action through a caller-owned scope cache.
    ///
    /// Only share a cache between calls over the same world state. Resolvers
    /// with different named scopes or depth limits may share one cache; their
    /// results are keyed apart.
    ///
    /// # Errors
    ///
    /// See [`TargetResolver::resolve`].
    pub fn resolve_with_cache(
        &self,
        action: &ActionDefinition,
        context: &ResolutionContext,
        cache: &mut ScopeCache,
    ) -> Result<ResolutionResult, CyclicDependencyError> {
        let mut run = Run::new(self.reporter.as_ref(), self.config.timings);

        let ordered = run.time(Phase::Ordering, || order_indices(&action.slots))?;
        let order: Vec<String> = ordered.iter().map(|&i| action.slots[i].name.clone()).collect();
        tracing::debug!(action = %action.id, order = ?order, "slot order computed");
        run.record(DiagnosticRecord::Ordered { order: order.clone() });

        let (choices, slots, unsatisfied) = self.resolve_slots(action, context, &ordered, cache, &mut run);

        let combinations = if unsatisfied.is_empty() {
            run.time(Phase::Generation, || generate(&choices, self.config.global_limit))
        } else {
            Combinations::default()
        };
        if combinations.truncated {
            tracing::debug!(
                action = %action.id,
                total = combinations.total,
                limit = self.config.global_limit,
                "combinations truncated"
            );
            run.record(DiagnosticRecord::CombinationsTruncated {
                total: combinations.total,
                limit: combinations.candidates.len(),
            });
        }

        let validator = CandidateValidator::new(&self.gateway, &self.predicates)
            .with_max_depth(self.config.max_scope_depth);
        let mut candidates = Vec::with_capacity(combinations.candidates.len());
        let mut rejections = BTreeMap::new();
        let mut rejected = 0;
        let started = Instant::now();
        for candidate in combinations.candidates {
            let outcome = validator.validate(&candidate, action, context);
            if outcome.is_valid() {
                candidates.push(candidate);
                continue;
            }
            rejected += 1;
            for reason in &outcome.reasons {
                *rejections.entry(reason.kind()).or_insert(0) += 1;
            }
            tracing::trace!(action = %action.id, reasons = outcome.reasons.len(), "candidate rejected");
            run.record(DiagnosticRecord::CandidateRejected {
                candidate,
                reasons: outcome.reasons,
            });
        }
        run.add(Phase::Validation, started.elapsed());

        tracing::debug!(
            action = %action.id,
            valid = candidates.len(),
            rejected,
            unsatisfied = unsatisfied.len(),
            "resolution complete"
        );
        run.record(DiagnosticRecord::Completed {
            valid: candidates.len(),
            rejected,
        });

        let timings = run.timings();
        Ok(ResolutionResult {
            action: action.id.clone(),
            candidates,
            diagnostics: Diagnostics {
                order,
                slots,
                unsatisfied,
                combinations_total: combinations.total,
                truncated: combinations.truncated,
                rejected,
                rejections,
                records: run.records,
                timings,
            },
        })
    }

    /// Evaluates every slot in dependency order.
    ///
    /// Returns the per-slot choices in declaration order, the per-slot
    /// diagnostics in evaluation order, and the unsatisfied required slots.
    fn resolve_slots(
        &self,
        action: &ActionDefinition,
        context: &ResolutionContext,
        ordered: &[usize],
        cache: &mut ScopeCache,
        run: &mut Run<'_>,
    ) -> (Vec<SlotChoices>, Vec<SlotDiagnostics>, Vec<String>) {
        let evaluator = ScopeEvaluator::new(&self.gateway, &self.predicates, &self.registry)
            .with_max_depth(self.config.max_scope_depth);

        let mut state = context.clone();
        let mut choices: Vec<Option<SlotChoices>> = vec![None; action.slots.len()];
        let mut slots = Vec::with_capacity(ordered.len());
        let mut unsatisfied = Vec::new();

        for &index in ordered {
            let slot = &action.slots[index];
            let ctx = ContextBuilder::build(&state, slot);

            let started = Instant::now();
            let evaluated = if self.config.scope_cache {
                evaluator.evaluate_cached(&slot.scope, &ctx, cache)
            } else {
                evaluator.evaluate_source(&slot.scope, &ctx)
            };
            let elapsed = started.elapsed();
            run.add(Phase::Scopes, elapsed);

            let (resolved, error) = match evaluated {
                Ok(entities) => (entities, None),
                Err(error) => {
                    let message = match &error.context {
                        Some(context) => format!("{error} {context}"),
                        None => error.to_string(),
                    };
                    tracing::warn!(action = %action.id, slot = %slot.name, error = %message, "slot degraded by scope error");
                    run.record(DiagnosticRecord::ScopeError {
                        slot: slot.name.clone(),
                        message: message.clone(),
                    });
                    (Vec::new(), Some(message))
                }
            };

            let resolved_count = resolved.len();
            let cap = slot.max_combinations.unwrap_or(usize::MAX);
            let (kept, truncated) = self.config.truncation.apply(resolved, cap);
            tracing::debug!(
                action = %action.id,
                slot = %slot.name,
                resolved = resolved_count,
                kept = kept.len(),
                truncated,
                "slot resolved"
            );
            if truncated {
                run.record(DiagnosticRecord::SlotTruncated {
                    slot: slot.name.clone(),
                    resolved: resolved_count,
                    kept: kept.len(),
                });
            }

            let is_unsatisfied = slot.required && kept.is_empty();
            if is_unsatisfied {
                tracing::debug!(action = %action.id, slot = %slot.name, "required slot unsatisfied");
                run.record(DiagnosticRecord::SlotUnsatisfied { slot: slot.name.clone() });
                unsatisfied.push(slot.name.clone());
            }

            state = state.with_resolved(&slot.name, kept.iter().copied());
            slots.push(SlotDiagnostics {
                slot: slot.name.clone(),
                resolved: resolved_count,
                kept: kept.len(),
                truncated,
                error,
                unsatisfied: is_unsatisfied,
                duration: run.timed.then_some(elapsed),
            });
            choices[index] = Some(SlotChoices::new(slot.name.clone(), kept, slot.required));
        }

        (choices.into_iter().flatten().collect(), slots, unsatisfied)
    }
}

impl<G, P> fmt::Debug for TargetResolver<G, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetResolver")
            .field("scopes", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Per-call bookkeeping
// =============================================================================

#[derive(Clone, Copy)]
enum Phase {
    Ordering,
    Scopes,
    Generation,
    Validation,
}

/// Records and timings accumulated by one resolution.
struct Run<'r> {
    reporter: &'r dyn ResolutionReporter,
    records: Vec<DiagnosticRecord>,
    timed: bool,
    started: Instant,
    timings: Timings,
}

impl<'r> Run<'r> {
    fn new(reporter: &'r dyn ResolutionReporter, timed: bool) -> Self {
        Self {
            reporter,
            records: Vec::new(),
            timed,
            started: Instant::now(),
            timings: Timings::default(),
        }
    }

    fn record(&mut self, record: DiagnosticRecord) {
        self.reporter.report(record.stage(), &record);
        self.records.push(record);
    }

    fn time<T>(&mut self, phase: Phase, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.add(phase, started.elapsed());
        out
    }

    fn add(&mut self, phase: Phase, elapsed: Duration) {
        let slot = match phase {
            Phase::Ordering => &mut self.timings.ordering,
            Phase::Scopes => &mut self.timings.scopes,
            Phase::Generation => &mut self.timings.generation,
            Phase::Validation => &mut self.timings.validation,
        };
        *slot += elapsed;
    }

    fn timings(&self) -> Option<Timings> {
        self.timed.then(|| Timings {
            total: self.started.elapsed(),
            ..self.timings
        })
    }
}
