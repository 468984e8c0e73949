//! List query cache keys
//!
//! The document cache stores list queries under their resolver name with the
//! JSON-serialized variables appended: `foos({"input":{"terms":{}}})`.

use crate::error::{MutationError, MutationResult};
use serde_json::{json, Map, Value};
use std::fmt;

/// A list query identified by resolver name and variables
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub resolver_name: String,
    pub variables: Value,
    key: String,
}

impl ListQuery {
    pub fn new(resolver_name: impl Into<String>, variables: Value) -> Self {
        let resolver_name = resolver_name.into();
        let key = canonical_key(&resolver_name, &variables);
        Self {
            resolver_name,
            variables,
            key,
        }
    }

    /// Query variables wrapping `terms` the way list containers send them
    pub fn with_terms(resolver_name: impl Into<String>, terms: Value) -> Self {
        Self::new(resolver_name, json!({ "input": { "terms": terms } }))
    }

    /// Raw cache key for this query
    ///
    /// A parsed query keeps the exact key it was read from, so writes land on
    /// the same entry even when the store serialized variables differently.
    pub fn cache_key(&self) -> String {
        self.key.clone()
    }

    /// Parse a raw cache key
    ///
    /// A bare resolver name is a query without variables.
    pub fn parse_key(key: &str) -> MutationResult<Self> {
        let Some(open) = key.find('(') else {
            if key.is_empty() || !key.chars().all(is_name_char) {
                return Err(malformed(key, "not a resolver name"));
            }
            return Ok(Self::new(key, Value::Object(Map::new())));
        };

        let resolver_name = &key[..open];
        if resolver_name.is_empty() || !resolver_name.chars().all(is_name_char) {
            return Err(malformed(key, "not a resolver name"));
        }

        let arguments = key[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| malformed(key, "missing closing parenthesis"))?;

        let variables: Value = serde_json::from_str(arguments)
            .map_err(|e| malformed(key, &format!("variables are not JSON: {e}")))?;
        if !variables.is_object() {
            return Err(malformed(key, "variables must be an object"));
        }

        Ok(Self {
            resolver_name: resolver_name.to_string(),
            variables,
            key: key.to_string(),
        })
    }

    /// Whether `key` is a cache key of `resolver_name`, without parsing it
    pub fn key_belongs_to(key: &str, resolver_name: &str) -> bool {
        match key.strip_prefix(resolver_name) {
            Some(rest) => rest.is_empty() || rest.starts_with('('),
            None => false,
        }
    }

    /// Terms embedded in the variables
    ///
    /// Looks at `input.terms`, then a top-level `terms`, and falls back to `{}`.
    pub fn terms(&self) -> Value {
        self.variables
            .pointer("/input/terms")
            .or_else(|| self.variables.get("terms"))
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

impl fmt::Display for ListQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cache_key())
    }
}

fn canonical_key(resolver_name: &str, variables: &Value) -> String {
    match variables {
        Value::Null => resolver_name.to_string(),
        Value::Object(map) if map.is_empty() => resolver_name.to_string(),
        variables => format!("{resolver_name}({variables})"),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn malformed(key: &str, reason: &str) -> MutationError {
    MutationError::CacheKeyMalformed {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
