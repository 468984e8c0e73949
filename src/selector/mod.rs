//! Selector interpreter
//!
//! Selectors arrive as Mongo-style JSON (`{ "val": { "$gt": 42 } }`) and are
//! compiled into a small typed AST before evaluation. Operators are tagged
//! predicates, so an unknown operator is rejected once at parse time instead
//! of silently failing to match.

pub mod compare;
mod eval;

use crate::error::{MutationError, MutationResult};
use serde_json::{Map, Value};

pub use compare::{compare_fields, compare_values, values_equal};

/// A single comparison against one field value
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    Not(Vec<Predicate>),
    Size(usize),
}

/// One top-level condition of a selector
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// All predicates must hold for the value at `path`
    Field {
        path: String,
        predicates: Vec<Predicate>,
    },
    And(Vec<Selector>),
    Or(Vec<Selector>),
    Nor(Vec<Selector>),
}

/// Compiled selector; an empty selector matches every document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    clauses: Vec<Clause>,
}

impl Selector {
    /// Selector that matches everything
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Whether the selector has no conditions
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Compiled clauses
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Parse a selector from any JSON value (`null` is the empty selector)
    pub fn parse(value: &Value) -> MutationResult<Self> {
        match value {
            Value::Null => Ok(Self::match_all()),
            Value::Object(map) => Self::parse_map(map),
            other => Err(MutationError::selector(
                "$",
                format!("expected an object, found {}", kind_name(other)),
            )),
        }
    }

    /// Parse a selector from a JSON object
    pub fn parse_map(map: &Map<String, Value>) -> MutationResult<Self> {
        let mut clauses = Vec::with_capacity(map.len());
        for (key, value) in map {
            clauses.push(parse_clause(key, value)?);
        }
        Ok(Self { clauses })
    }
}

fn parse_clause(key: &str, value: &Value) -> MutationResult<Clause> {
    match key {
        "$and" => Ok(Clause::And(parse_branches(key, value)?)),
        "$or" => Ok(Clause::Or(parse_branches(key, value)?)),
        "$nor" => Ok(Clause::Nor(parse_branches(key, value)?)),
        op if op.starts_with('$') => Err(MutationError::UnsupportedOperator(op.to_string())),
        path => Ok(Clause::Field {
            path: path.to_string(),
            predicates: parse_condition(path, value)?,
        }),
    }
}

fn parse_branches(op: &str, value: &Value) -> MutationResult<Vec<Selector>> {
    let items = value
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| MutationError::selector(op, "expected a non-empty array"))?;

    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => Selector::parse_map(map),
            other => Err(MutationError::selector(
                op,
                format!("expected an object branch, found {}", kind_name(other)),
            )),
        })
        .collect()
}

/// Parse the condition for one field: either an operator object or a literal
fn parse_condition(path: &str, value: &Value) -> MutationResult<Vec<Predicate>> {
    let Value::Object(map) = value else {
        return Ok(vec![Predicate::Eq(value.clone())]);
    };

    let operators = map.keys().filter(|k| k.starts_with('$')).count();
    if operators == 0 {
        return Ok(vec![Predicate::Eq(value.clone())]);
    }
    if operators != map.len() {
        return Err(MutationError::selector(
            path,
            "cannot mix operators and literal fields",
        ));
    }

    map.iter()
        .map(|(op, operand)| parse_predicate(path, op, operand))
        .collect()
}

fn parse_predicate(path: &str, op: &str, operand: &Value) -> MutationResult<Predicate> {
    let predicate = match op {
        "$eq" => Predicate::Eq(operand.clone()),
        "$ne" => Predicate::Ne(operand.clone()),
        "$gt" => Predicate::Gt(operand.clone()),
        "$gte" => Predicate::Gte(operand.clone()),
        "$lt" => Predicate::Lt(operand.clone()),
        "$lte" => Predicate::Lte(operand.clone()),
        "$in" => Predicate::In(expect_array(path, op, operand)?),
        "$nin" => Predicate::Nin(expect_array(path, op, operand)?),
        "$exists" => Predicate::Exists(truthy(operand)),
        "$size" => {
            let size = operand
                .as_u64()
                .ok_or_else(|| MutationError::selector(path, "$size expects a non-negative integer"))?;
            let size = usize::try_from(size)
                .map_err(|_| MutationError::selector(path, "$size is out of range"))?;
            Predicate::Size(size)
        }
        "$not" => match operand {
            Value::Object(_) => {
                let inner = parse_condition(path, operand)?;
                if inner.iter().all(|p| matches!(p, Predicate::Eq(_))) {
                    return Err(MutationError::selector(path, "$not expects an operator object"));
                }
                Predicate::Not(inner)
            }
            _ => return Err(MutationError::selector(path, "$not expects an operator object")),
        },
        other => return Err(MutationError::UnsupportedOperator(other.to_string())),
    };
    Ok(predicate)
}

fn expect_array(path: &str, op: &str, operand: &Value) -> MutationResult<Vec<Value>> {
    operand
        .as_array()
        .cloned()
        .ok_or_else(|| MutationError::selector(path, format!("{op} expects an array")))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => true,
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
