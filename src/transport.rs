//! GraphQL transport
//!
//! Provides a trait for sending mutation requests so the binding layer can
//! run against a real endpoint or a set of canned responses.

use crate::config::schema::TransportConfig;
use crate::error::{MutationError, MutationResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// A GraphQL mutation request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRequest {
    /// Local id for log correlation, never sent
    #[serde(skip)]
    pub id: Uuid,
    pub operation_name: String,
    pub query: String,
    #[serde(skip_serializing_if = "is_empty_object")]
    pub variables: Value,
}

impl MutationRequest {
    pub fn new(operation_name: impl Into<String>, query: impl Into<String>, variables: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation_name: operation_name.into(),
            query: query.into(),
            variables,
        }
    }
}

fn is_empty_object(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Sends mutation requests and returns the raw response body
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request; GraphQL-level errors are left in the body
    async fn execute(&self, request: &MutationRequest) -> MutationResult<Value>;

    /// Human-readable name for display
    fn transport_name(&self) -> &'static str;
}

/// HTTP transport posting JSON to a GraphQL endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: String,
    timeout: Duration,
    headers: BTreeMap<String, String>,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(30),
            headers: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            headers: config.headers.clone(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post(&self, request: &MutationRequest) -> MutationResult<Value> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .http_status_as_error(false)
            .build()
            .into();

        let mut builder = agent.post(&self.endpoint);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder
            .send_json(request)
            .map_err(|e| map_ureq_error(&request.operation_name, e))?;

        let status = response.status();
        let body = response.body_mut().read_json::<Value>();
        if status.is_success() {
            return body.map_err(|e| map_ureq_error(&request.operation_name, e));
        }
        error_status_body(&request.operation_name, status.as_u16(), body.ok())
    }
}

/// Body of a non-2xx response
///
/// GraphQL servers answer validation failures with 4xx and an `errors` list;
/// that body is returned so the messages reach the caller. Anything else is
/// an HTTP failure.
fn error_status_body(operation: &str, status: u16, body: Option<Value>) -> MutationResult<Value> {
    match body {
        Some(body)
            if body
                .get("errors")
                .and_then(Value::as_array)
                .is_some_and(|errors| !errors.is_empty()) =>
        {
            debug!("HTTP {status} for {operation} carries GraphQL errors");
            Ok(body)
        }
        _ => Err(MutationError::HttpStatus {
            operation: operation.to_string(),
            status,
        }),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &MutationRequest) -> MutationResult<Value> {
        debug!(
            "POST {} {} ({})",
            self.endpoint, request.operation_name, request.id
        );

        // ureq is blocking; keep it off the async workers.
        let transport = self.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || transport.post(&request))
            .await
            .map_err(|e| MutationError::Internal(format!("transport task failed: {e}")))?
    }

    fn transport_name(&self) -> &'static str {
        "http"
    }
}

fn map_ureq_error(operation: &str, error: ureq::Error) -> MutationError {
    match error {
        ureq::Error::StatusCode(status) => MutationError::HttpStatus {
            operation: operation.to_string(),
            status,
        },
        ureq::Error::Timeout(_) => MutationError::Timeout(operation.to_string()),
        other => MutationError::Transport(format!("{operation}: {other}")),
    }
}

/// A canned response for `MockTransport`
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub query: String,
    pub variables: Value,
    pub result: Value,
}

/// In-process transport answering from canned responses
///
/// A request matches a response when both the query text and the variables
/// are equal. Each response is used once; unmatched requests fail.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    responses: Arc<Mutex<Vec<MockResponse>>>,
    requests: Arc<Mutex<Vec<MutationRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::default(),
        }
    }

    /// Queue a response for `query` with `variables`
    pub fn respond(&self, query: impl Into<String>, variables: Value, result: Value) {
        self.lock_responses().push(MockResponse {
            query: query.into(),
            variables,
            result,
        });
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<MutationRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, Vec<MockResponse>> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: &MutationRequest) -> MutationResult<Value> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let variables = match &request.variables {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };

        let mut responses = self.lock_responses();
        let position = responses
            .iter()
            .position(|r| r.query == request.query && r.variables == variables);

        match position {
            Some(index) => Ok(responses.remove(index).result),
            None => Err(MutationError::Transport(format!(
                "no mocked response for {} with variables {}",
                request.operation_name, variables
            ))),
        }
    }

    fn transport_name(&self) -> &'static str {
        "mock"
    }
}
