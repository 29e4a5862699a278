//! Expression evaluation
//!
//! Expressions evaluate to collections of JSON values. Navigation flattens
//! arrays, so `Patient.name.given` yields every given name of every name.

use crate::ast::{AstNode, EqualityOperator, Function, Invocation, Literal};
use crate::error::{Error, Result};
use crate::parser;
use crate::resolver::{resolve_local, ResourceResolver};
use serde_json::Value;
use std::sync::Arc;

/// Result of an evaluation: an ordered collection of values
pub type Collection = Vec<Value>;

/// A parsed expression, reusable across evaluations
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: AstNode,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self {
            source: source.to_string(),
            ast: parser::parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &AstNode {
        &self.ast
    }
}

/// Evaluator with an optional external [`ResourceResolver`]
#[derive(Clone, Default)]
pub struct Engine {
    resource_resolver: Option<Arc<dyn ResourceResolver>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `resolver` for references `resolve()` cannot find locally.
    pub fn with_resolver(resolver: Arc<dyn ResourceResolver>) -> Self {
        Self {
            resource_resolver: Some(resolver),
        }
    }

    pub fn resource_resolver(&self) -> Option<&Arc<dyn ResourceResolver>> {
        self.resource_resolver.as_ref()
    }

    pub fn compile(&self, expr: &str) -> Result<Expression> {
        Expression::parse(expr)
    }

    /// Evaluate against `resource`, which is also the only local resource for
    /// `resolve()`.
    pub fn evaluate(&self, expr: &Expression, resource: &Value) -> Result<Collection> {
        self.evaluate_with_resources(expr, resource, &[])
    }

    /// Evaluate against `resource`; `resolve()` also searches `resources`.
    pub fn evaluate_with_resources(
        &self,
        expr: &Expression,
        resource: &Value,
        resources: &[Value],
    ) -> Result<Collection> {
        let mut local = Vec::with_capacity(resources.len() + 1);
        local.push(resource);
        local.extend(resources.iter());

        let evaluation = Evaluation {
            engine: self,
            resources: local,
        };
        evaluation.eval(&expr.ast, &vec![resource.clone()])
    }

    /// Parse and evaluate in one step.
    pub fn evaluate_expr(&self, expr: &str, resource: &Value) -> Result<Collection> {
        let expr = self.compile(expr)?;
        self.evaluate(&expr, resource)
    }
}

struct Evaluation<'e> {
    engine: &'e Engine,
    resources: Vec<&'e Value>,
}

impl<'e> Evaluation<'e> {
    fn eval(&self, node: &AstNode, focus: &Collection) -> Result<Collection> {
        match node {
            AstNode::Literal(literal) => Ok(vec![literal_value(literal)]),
            AstNode::Empty => Ok(Vec::new()),
            AstNode::Term(invocation) => self.invoke(invocation, focus, true),
            AstNode::Invocation {
                expression,
                invocation,
            } => {
                let input = self.eval(expression, focus)?;
                self.invoke(invocation, &input, false)
            }
            AstNode::Equality {
                left,
                operator,
                right,
            } => {
                let left = self.eval(left, focus)?;
                let right = self.eval(right, focus)?;
                if left.is_empty() || right.is_empty() {
                    return Ok(Vec::new());
                }
                let equal = left.len() == right.len()
                    && left.iter().zip(&right).all(|(l, r)| values_equal(l, r));
                let result = match operator {
                    EqualityOperator::Equal => equal,
                    EqualityOperator::NotEqual => !equal,
                };
                Ok(vec![Value::Bool(result)])
            }
            AstNode::And { left, right } => {
                let left = to_boolean(&self.eval(left, focus)?)?;
                let right = to_boolean(&self.eval(right, focus)?)?;
                Ok(match (left, right) {
                    (Some(false), _) | (_, Some(false)) => vec![Value::Bool(false)],
                    (Some(true), Some(true)) => vec![Value::Bool(true)],
                    _ => Vec::new(),
                })
            }
            AstNode::Or { left, right } => {
                let left = to_boolean(&self.eval(left, focus)?)?;
                let right = to_boolean(&self.eval(right, focus)?)?;
                Ok(match (left, right) {
                    (Some(true), _) | (_, Some(true)) => vec![Value::Bool(true)],
                    (Some(false), Some(false)) => vec![Value::Bool(false)],
                    _ => Vec::new(),
                })
            }
        }
    }

    /// `leading` marks the first segment of a path, where a resource type
    /// name selects the matching focus items instead of navigating.
    fn invoke(&self, invocation: &Invocation, input: &Collection, leading: bool) -> Result<Collection> {
        match invocation {
            Invocation::This => Ok(input.clone()),
            Invocation::Member(name) => {
                if leading && name.starts_with(|c: char| c.is_ascii_uppercase()) {
                    let typed: Collection = input
                        .iter()
                        .filter(|item| {
                            item.get("resourceType").and_then(Value::as_str) == Some(name.as_str())
                        })
                        .cloned()
                        .collect();
                    if !typed.is_empty() {
                        return Ok(typed);
                    }
                }
                Ok(input.iter().flat_map(|item| navigate(item, name)).collect())
            }
            Invocation::Function { name, args } => self.call(*name, args, input),
        }
    }

    fn call(&self, function: Function, args: &[AstNode], input: &Collection) -> Result<Collection> {
        match function {
            Function::First => Ok(input.first().cloned().into_iter().collect()),
            Function::Last => Ok(input.last().cloned().into_iter().collect()),
            Function::Where => self.filter(input, &args[0]),
            Function::Exists => {
                let matched = match args.first() {
                    Some(criteria) => !self.filter(input, criteria)?.is_empty(),
                    None => !input.is_empty(),
                };
                Ok(vec![Value::Bool(matched)])
            }
            Function::StartsWith => {
                let Some(subject) = singleton_string(input, "startsWith")? else {
                    return Ok(Vec::new());
                };
                let prefix = self.eval(&args[0], input)?;
                let Some(prefix) = singleton_string(&prefix, "startsWith")? else {
                    return Ok(Vec::new());
                };
                Ok(vec![Value::Bool(subject.starts_with(prefix.as_str()))])
            }
            Function::Resolve => self.resolve(input),
        }
    }

    fn filter(&self, input: &Collection, criteria: &AstNode) -> Result<Collection> {
        let mut kept = Vec::new();
        for item in input {
            let focus = vec![item.clone()];
            if to_boolean(&self.eval(criteria, &focus)?)? == Some(true) {
                kept.push(item.clone());
            }
        }
        Ok(kept)
    }

    /// Each item is a reference string or a `Reference` object.
    fn resolve(&self, input: &Collection) -> Result<Collection> {
        let mut resolved = Vec::new();
        for item in input {
            let reference = match item {
                Value::String(s) => s.as_str(),
                other => match other.get("reference").and_then(Value::as_str) {
                    Some(reference) => reference,
                    None => continue,
                },
            };

            if let Some(found) = resolve_local(reference, &self.resources) {
                resolved.push(found.clone());
                continue;
            }
            match self.engine.resource_resolver() {
                Some(resolver) => match resolver.resolve(reference)? {
                    Some(found) => resolved.push(found),
                    None => tracing::debug!(reference, "reference not found by resolver"),
                },
                None => tracing::debug!(reference, "reference not found locally"),
            }
        }
        Ok(resolved)
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::String(s) => Value::String(s.clone()),
        Literal::Number(n) => Value::Number(n.clone()),
        Literal::Boolean(b) => Value::Bool(*b),
    }
}

/// Child values of `item` named `name`, flattening arrays. A name without an
/// exact match picks up a choice element (`value` finds `valueQuantity`).
fn navigate(item: &Value, name: &str) -> Collection {
    let Some(object) = item.as_object() else {
        return Vec::new();
    };
    let found = object.get(name).or_else(|| {
        object.iter().find_map(|(key, value)| {
            key.strip_prefix(name)
                .filter(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
                .map(|_| value)
        })
    });
    match found {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter(|v| !v.is_null()).cloned().collect(),
        Some(value) => vec![value.clone()],
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_i64(), r.as_i64()) {
            (Some(l), Some(r)) => l == r,
            _ => l.as_f64() == r.as_f64(),
        },
        _ => left == right,
    }
}

/// Singleton evaluation of a collection as a boolean: empty is unknown, a
/// single non-boolean item counts as true.
fn to_boolean(collection: &Collection) -> Result<Option<bool>> {
    match collection.as_slice() {
        [] => Ok(None),
        [Value::Bool(b)] => Ok(Some(*b)),
        [_] => Ok(Some(true)),
        items => Err(Error::TypeError(format!(
            "expected a single boolean, got a collection of {} items",
            items.len()
        ))),
    }
}

fn singleton_string(collection: &Collection, function: &str) -> Result<Option<String>> {
    match collection.as_slice() {
        [] => Ok(None),
        [Value::String(s)] => Ok(Some(s.clone())),
        [other] => Err(Error::TypeError(format!(
            "{}() expects a string, got {}",
            function, other
        ))),
        items => Err(Error::TypeError(format!(
            "{}() expects a single item, got {}",
            function,
            items.len()
        ))),
    }
}
