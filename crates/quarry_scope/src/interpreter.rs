//! Reference predicate interpreter.

use quarry_foundation::{Error, Result, Value};

use crate::environment::Environment;
use crate::predicate::{CollectionOp, LogicalOp, Predicate, PredicateEvaluator, values_equal};

/// Pure recursive predicate interpreter.
///
/// Missing variables and paths evaluate to `nil`, so predicates over optional
/// components simply fail instead of erroring.
#[derive(Clone, Copy, Debug, Default)]
pub struct Interpreter;

impl Interpreter {
    /// Creates a new interpreter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Evaluates a predicate to a value.
    ///
    /// # Errors
    ///
    /// Returns an error when a collection operation is applied to a
    /// non-collection, or when nested quantifiers exceed the depth limit.
    pub fn eval(&self, predicate: &Predicate, env: &Environment<'_>) -> Result<Value> {
        match predicate {
            Predicate::Literal(value) => Ok(value.clone()),
            Predicate::Var { name, path } => Ok(resolve_path(env, name, path)),
            Predicate::Comparison { op, left, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                Ok(Value::Bool(op.apply(&left, &right)))
            }
            Predicate::Logical { op, operands } => self.eval_logical(*op, operands, env),
            Predicate::CollectionOp(op) => self.eval_collection(op, env),
        }
    }

    fn eval_logical(&self, op: LogicalOp, operands: &[Predicate], env: &Environment<'_>) -> Result<Value> {
        let result = match op {
            LogicalOp::And => {
                let mut all = true;
                for operand in operands {
                    if !self.eval(operand, env)?.is_truthy() {
                        all = false;
                        break;
                    }
                }
                all
            }
            LogicalOp::Or => {
                let mut any = false;
                for operand in operands {
                    if self.eval(operand, env)?.is_truthy() {
                        any = true;
                        break;
                    }
                }
                any
            }
            LogicalOp::Not => match operands.first() {
                Some(operand) => !self.eval(operand, env)?.is_truthy(),
                None => return Err(Error::arity_mismatch("not", "1", 0)),
            },
        };
        Ok(Value::Bool(result))
    }

    fn eval_collection(&self, op: &CollectionOp, env: &Environment<'_>) -> Result<Value> {
        match op {
            CollectionOp::In { item, collection } => {
                let needle = self.eval(item, env)?;
                let haystack = self.eval(collection, env)?;
                let found = match &haystack {
                    Value::Nil => false,
                    Value::Vec(items) => items.iter().any(|v| values_equal(v, &needle)),
                    Value::Map(fields) => needle.as_str().is_some_and(|key| fields.contains_key(key)),
                    other => return Err(Error::type_mismatch("collection for `in`", other.value_type())),
                };
                Ok(Value::Bool(found))
            }
            CollectionOp::Any { collection, body } => {
                let items = elements(&self.eval(collection, env)?, "any")?;
                for item in items {
                    let inner = env.nested("item", item)?;
                    if self.eval(body, &inner)?.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            CollectionOp::All { collection, body } => {
                let items = elements(&self.eval(collection, env)?, "all")?;
                for item in items {
                    let inner = env.nested("item", item)?;
                    if !self.eval(body, &inner)?.is_truthy() {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            CollectionOp::Count(collection) => {
                let items = elements(&self.eval(collection, env)?, "count")?;
                Ok(Value::Int(i64::try_from(items.len()).unwrap_or(i64::MAX)))
            }
        }
    }
}

impl PredicateEvaluator for Interpreter {
    fn evaluate(&self, predicate: &Predicate, env: &Environment<'_>) -> Result<bool> {
        Ok(self.eval(predicate, env)?.is_truthy())
    }
}

/// Follows a dotted path from a bound variable.
///
/// Entity references step into components through the gateway, maps step into
/// fields. Anything else, or any missing link, yields `nil`.
fn resolve_path(env: &Environment<'_>, name: &str, path: &[String]) -> Value {
    let mut current = env.get(name).cloned().unwrap_or(Value::Nil);
    for segment in path {
        current = match &current {
            Value::EntityRef(id) => env.gateway().component(*id, segment).unwrap_or(Value::Nil),
            Value::Map(fields) => fields.get(segment).cloned().unwrap_or(Value::Nil),
            _ => return Value::Nil,
        };
    }
    current
}

/// Elements of a collection value; `nil` is empty and maps yield their values.
fn elements(value: &Value, operator: &str) -> Result<Vec<Value>> {
    match value {
        Value::Nil => Ok(Vec::new()),
        Value::Vec(items) => Ok(items.iter().cloned().collect()),
        Value::Map(fields) => Ok(fields.values().cloned().collect()),
        other => Err(Error::type_mismatch(
            format!("collection for `{operator}`"),
            other.value_type(),
        )),
    }
}
