//! Mutation response normalization
//!
//! Every mutation answers with `{ data: { <operation>: { data, __typename } } }`.
//! Server-reported errors are shaped into `MutationError::Graphql`.

use crate::document::Document;
use crate::error::{MutationError, MutationResult};
use serde_json::{json, Map, Value};

/// The affected document of a successful mutation
#[derive(Debug, Clone, PartialEq)]
pub struct MutationResponse {
    operation_name: String,
    document: Document,
    typename: Option<String>,
}

impl MutationResponse {
    pub fn new(operation_name: impl Into<String>, document: Document) -> Self {
        let typename = document.typename().map(str::to_string);
        Self {
            operation_name: operation_name.into(),
            document,
            typename,
        }
    }

    /// Normalize a raw GraphQL response body
    pub fn from_body(operation_name: &str, body: &Value) -> MutationResult<Self> {
        Self::check_errors(operation_name, body)?;

        let payload = payload(operation_name, body).ok_or_else(|| MutationError::MissingPayload {
            operation: operation_name.to_string(),
        })?;

        let document = payload
            .get("data")
            .cloned()
            .and_then(Document::from_value)
            .ok_or_else(|| MutationError::MissingPayload {
                operation: operation_name.to_string(),
            })?;

        let typename = payload
            .get("__typename")
            .and_then(Value::as_str)
            .or_else(|| document.typename())
            .map(str::to_string);

        Ok(Self {
            operation_name: operation_name.to_string(),
            document,
            typename,
        })
    }

    /// Fail with `MutationError::Graphql` when the body carries errors
    pub fn check_errors(operation_name: &str, body: &Value) -> MutationResult<()> {
        let messages = error_messages(body);
        if messages.is_empty() {
            return Ok(());
        }
        Err(MutationError::Graphql {
            operation: operation_name.to_string(),
            messages,
        })
    }

    /// The mutated document at `data.<operation>.data`, if any
    pub fn extract_document(operation_name: &str, body: &Value) -> Option<Document> {
        payload(operation_name, body)?
            .get("data")
            .cloned()
            .and_then(Document::from_value)
    }

    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn typename(&self) -> Option<&str> {
        self.typename.as_deref()
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Body shape handed to the cache updater and returned to callers
    pub fn to_value(&self) -> Value {
        let mut payload = json!({ "data": self.document.clone().into_value() });
        if let Some(typename) = &self.typename {
            payload["__typename"] = Value::String(typename.clone());
        }
        let mut data = Map::new();
        data.insert(self.operation_name.clone(), payload);
        json!({ "data": data })
    }
}

fn payload<'a>(operation_name: &str, body: &'a Value) -> Option<&'a Value> {
    body.get("data")?
        .get(operation_name)
        .filter(|payload| !payload.is_null())
}

fn error_messages(body: &Value) -> Vec<String> {
    body.get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .map(|error| match error.get("message").and_then(Value::as_str) {
                    Some(message) => message.to_string(),
                    None => error.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}
