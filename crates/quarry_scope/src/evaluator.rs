//! Scope expression evaluation.
//!
//! Navigation is value based: a source produces values, each step maps values
//! to values, and the terminal values are collected as entity references.
//!
//! # Error policy
//!
//! A missing component or field yields an empty sub-result. Only genuine type
//! mismatches (indexing into a scalar, `[]` on an entity), undefined or
//! cyclic named scopes, and the depth limit are errors.

use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use quarry_foundation::{EntityId, Error, ErrorKind, Result, SemanticLimit, Value};
use quarry_storage::EntityGateway;

use crate::ast::{ScopeExpr, Source, Step};
use crate::cache::ScopeCache;
use crate::context::EvaluationContext;
use crate::environment::DEFAULT_MAX_DEPTH;
use crate::parser::parse_scope;
use crate::predicate::{Predicate, PredicateEvaluator};
use crate::registry::ScopeRegistry;

/// Evaluates scope expressions against an entity gateway.
///
/// Evaluation is read-only and deterministic: the same expression and context
/// over the same gateway state always produce the same ordered result.
pub struct ScopeEvaluator<'a> {
    gateway: &'a dyn EntityGateway,
    predicates: &'a dyn PredicateEvaluator,
    registry: &'a ScopeRegistry,
    max_depth: usize,
}

/// Per-evaluation bookkeeping: nesting depth and the chain of named scopes
/// currently being expanded.
#[derive(Default)]
struct Walk {
    depth: usize,
    chain: Vec<String>,
}

impl<'a> ScopeEvaluator<'a> {
    /// Creates an evaluator.
    #[must_use]
    pub fn new(
        gateway: &'a dyn EntityGateway,
        predicates: &'a dyn PredicateEvaluator,
        registry: &'a ScopeRegistry,
    ) -> Self {
        Self {
            gateway,
            predicates,
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the nesting limit.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Evaluates a parsed expression.
    ///
    /// # Errors
    ///
    /// Returns an error on type mismatches, undefined or cyclic named scopes,
    /// predicate failures, or when nesting exceeds the depth limit.
    pub fn evaluate(&self, expr: &ScopeExpr, ctx: &EvaluationContext) -> Result<Vec<EntityId>> {
        let mut walk = Walk::default();
        let values = self.eval_expr(expr, ctx, &mut walk)?;
        Ok(collect_entities(&values))
    }

    /// Parses and evaluates a source string.
    ///
    /// # Errors
    ///
    /// As [`ScopeEvaluator::evaluate`], plus parse errors. Errors carry the
    /// source text.
    pub fn evaluate_source(&self, source: &str, ctx: &EvaluationContext) -> Result<Vec<EntityId>> {
        let expr = parse_scope(source)?;
        self.evaluate(&expr, ctx).map_err(|e| e.in_source(source))
    }

    /// Parses and evaluates through a cache.
    ///
    /// Results are keyed by the context fingerprint, the registry digest and
    /// the depth limit, so evaluators with different named scopes can share
    /// one cache.
    ///
    /// # Errors
    ///
    /// As [`ScopeEvaluator::evaluate_source`]. Failed evaluations are not cached.
    pub fn evaluate_cached(
        &self,
        source: &str,
        ctx: &EvaluationContext,
        cache: &mut ScopeCache,
    ) -> Result<Vec<EntityId>> {
        let fingerprint = self.cache_key(ctx);
        if let Some(hit) = cache.lookup(source, fingerprint) {
            tracing::trace!(expression = source, count = hit.len(), "scope cache hit");
            return Ok(hit);
        }
        let expr = cache.parse(source)?;
        let entities = self.evaluate(&expr, ctx).map_err(|e| e.in_source(source))?;
        cache.store(source, fingerprint, entities.clone());
        Ok(entities)
    }

    fn cache_key(&self, ctx: &EvaluationContext) -> u64 {
        let mut hasher = DefaultHasher::new();
        ctx.fingerprint().hash(&mut hasher);
        self.registry.digest().hash(&mut hasher);
        self.max_depth.hash(&mut hasher);
        hasher.finish()
    }

    // =========================================================================
    // Expressions and sources
    // =========================================================================

    fn eval_expr(&self, expr: &ScopeExpr, ctx: &EvaluationContext, walk: &mut Walk) -> Result<Vec<Value>> {
        match expr {
            ScopeExpr::Path { source, steps } => {
                let mut values = self.eval_source(source, ctx, walk)?;
                for step in steps {
                    values = self.apply_step(step, values, ctx, walk)?;
                }
                Ok(values)
            }
            ScopeExpr::Union(terms) => {
                let mut values = Vec::new();
                for term in terms {
                    values.extend(self.eval_expr(term, ctx, walk)?);
                }
                Ok(values)
            }
        }
    }

    fn eval_source(&self, source: &Source, ctx: &EvaluationContext, walk: &mut Walk) -> Result<Vec<Value>> {
        let values = match source {
            Source::Actor => vec![Value::EntityRef(ctx.actor)],
            Source::Location => ctx.location.map(Value::EntityRef).into_iter().collect(),
            Source::Game => vec![ctx.game.clone()],
            Source::Target => ctx.target.map(Value::EntityRef).into_iter().collect(),
            Source::Targets => ctx.targets_value().into_iter().collect(),
            Source::None => Vec::new(),
            Source::Entities(component) => self
                .gateway
                .entities_with(component)
                .into_iter()
                .map(Value::EntityRef)
                .collect(),
            Source::At(inner) => {
                let holders = self.nested(walk, |walk| self.eval_expr(inner, ctx, walk))?;
                collect_entities(&holders)
                    .into_iter()
                    .flat_map(|location| self.gateway.entities_at(location))
                    .map(Value::EntityRef)
                    .collect()
            }
            Source::Group(inner) => self.nested(walk, |walk| self.eval_expr(inner, ctx, walk))?,
            Source::Named(name) => self.eval_named(name, ctx, walk)?,
        };
        Ok(values)
    }

    fn eval_named(&self, name: &str, ctx: &EvaluationContext, walk: &mut Walk) -> Result<Vec<Value>> {
        if let Some(start) = walk.chain.iter().position(|n| n == name) {
            let mut cycle = walk.chain[start..].to_vec();
            cycle.push(name.to_string());
            return Err(Error::new(ErrorKind::ScopeCycle(cycle)));
        }
        let expr = self.registry.resolve(name)?;

        walk.chain.push(name.to_string());
        let result = self.nested(walk, |walk| self.eval_expr(&expr, ctx, walk));
        walk.chain.pop();
        result.map_err(|e| e.in_frame(name))
    }

    fn nested<T>(&self, walk: &mut Walk, f: impl FnOnce(&mut Walk) -> Result<T>) -> Result<T> {
        if walk.depth >= self.max_depth {
            return Err(Error::limit_exceeded(SemanticLimit::MaxScopeDepth {
                limit: self.max_depth,
            }));
        }
        walk.depth += 1;
        let result = f(walk);
        walk.depth -= 1;
        result
    }

    // =========================================================================
    // Steps
    // =========================================================================

    fn apply_step(
        &self,
        step: &Step,
        values: Vec<Value>,
        ctx: &EvaluationContext,
        walk: &Walk,
    ) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        match step {
            Step::Field(name) => {
                for value in &values {
                    self.field(value, name, &mut out)?;
                }
            }
            Step::Each => {
                for value in values {
                    each(value, &mut out)?;
                }
            }
            Step::Filter(predicate) => self.filter(predicate, values, ctx, walk, &mut out)?,
        }
        Ok(out)
    }

    fn field(&self, value: &Value, name: &str, out: &mut Vec<Value>) -> Result<()> {
        match value {
            Value::EntityRef(id) => out.extend(self.gateway.component(*id, name)),
            Value::Map(fields) => out.extend(fields.get(name).cloned()),
            Value::Vec(items) => {
                for item in items {
                    self.field(item, name, out)?;
                }
            }
            Value::Nil => {}
            other => {
                return Err(Error::type_mismatch(
                    format!("entity or map for `.{name}`"),
                    other.value_type(),
                ));
            }
        }
        Ok(())
    }

    fn filter(
        &self,
        predicate: &Predicate,
        values: Vec<Value>,
        ctx: &EvaluationContext,
        walk: &Walk,
        out: &mut Vec<Value>,
    ) -> Result<()> {
        let env = ctx
            .environment(self.gateway)
            .with_max_depth(self.max_depth)
            .with_depth(walk.depth);

        let items = values.into_iter().flat_map(|value| match value {
            Value::Vec(items) => items.into_iter().collect::<Vec<_>>(),
            other => vec![other],
        });
        for item in items {
            let bound = env.clone().with_binding("entity", item.clone());
            if self.predicates.evaluate(predicate, &bound)? {
                out.push(item);
            }
        }
        Ok(())
    }
}

/// `[]` on one value.
fn each(value: Value, out: &mut Vec<Value>) -> Result<()> {
    match value {
        Value::Vec(items) => out.extend(items),
        Value::Map(fields) => out.extend(fields.values().cloned()),
        Value::Nil => {}
        other => return Err(Error::type_mismatch("collection for `[]`", other.value_type())),
    }
    Ok(())
}

/// Collects terminal values as entity ids, first occurrence wins.
///
/// Entity refs are kept, vecs contribute their entity-ref elements, and
/// everything else is skipped.
fn collect_entities(values: &[Value]) -> Vec<EntityId> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut push = |id: EntityId| {
        if seen.insert(id) {
            out.push(id);
        }
    };
    for value in values {
        match value {
            Value::EntityRef(id) => push(*id),
            Value::Vec(items) => items.iter().filter_map(Value::as_entity).for_each(&mut push),
            _ => {}
        }
    }
    out
}
