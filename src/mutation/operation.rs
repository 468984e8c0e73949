//! Mutation binding layer
//!
//! Two surfaces share one core. Hook-style adapters (`use_create`, ...) hand
//! out a cloneable [`MutationHandle`] that can be invoked right away.
//! Wrapped-component adapters (`with_create`, ...) return a
//! [`MutationEnhancer`] that injects the same handle into a set of props under
//! the operation name (`createFoo`, `updateFoo`, ...).
//!
//! A handle sends its document through the client's transport, shapes
//! GraphQL errors, then patches cached list queries. A failed cache patch is
//! logged and never turns a successful mutation into an error.

use crate::cache::CacheHandle;
use crate::collection::Collection;
use crate::error::{MutationError, MutationResult};
use crate::fragment::{Fragment, FragmentRegistry};
use crate::mutation::builder::{build_custom_mutation, build_query, MutationDocument, MutationInput, MutationKind};
use crate::mutation::response::MutationResponse;
use crate::mutation::updater::MultiQueryUpdater;
use crate::transport::{MutationRequest, Transport};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

/// Observable state of one mutation
#[derive(Debug, Clone, Default)]
pub struct MutationState {
    /// A request is in flight
    pub loading: bool,
    /// `mutate` has been invoked at least once
    pub called: bool,
    /// Body of the last successful response
    pub data: Option<Value>,
    /// Message of the last failed call
    pub error: Option<String>,
}

/// Shared collaborators of every mutation: transport, cache and fragments
#[derive(Clone)]
pub struct MutationClient {
    transport: Arc<dyn Transport>,
    cache: CacheHandle,
    fragments: Arc<RwLock<FragmentRegistry>>,
}

impl MutationClient {
    pub fn new(transport: Arc<dyn Transport>, cache: CacheHandle) -> Self {
        Self {
            transport,
            cache,
            fragments: Arc::default(),
        }
    }

    /// Use an existing fragment registry
    pub fn with_fragments(mut self, fragments: FragmentRegistry) -> Self {
        self.fragments = Arc::new(RwLock::new(fragments));
        self
    }

    /// Register a fragment; operations built earlier see it on their next send
    pub async fn register_fragment(&self, fragment: Fragment) {
        self.fragments.write().await.register(fragment);
    }

    pub fn cache(&self) -> &CacheHandle {
        &self.cache
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

impl fmt::Debug for MutationClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationClient")
            .field("transport", &self.transport.transport_name())
            .finish_non_exhaustive()
    }
}

/// Collection and fragment a collection mutation is built for
#[derive(Debug, Clone)]
pub struct MutationOptions {
    pub collection: Collection,
    pub fragment: Fragment,
}

impl MutationOptions {
    pub fn new(collection: Collection, fragment: Fragment) -> Self {
        Self { collection, fragment }
    }
}

/// Shared core behind every handle of one operation
pub struct MutationOperation {
    document: MutationDocument,
    client: MutationClient,
    updater: Option<MultiQueryUpdater>,
    state: watch::Sender<MutationState>,
    mounted: AtomicBool,
}

impl MutationOperation {
    fn new(document: MutationDocument, client: MutationClient, updater: Option<MultiQueryUpdater>) -> Self {
        let (state, _) = watch::channel(MutationState::default());
        Self {
            document,
            client,
            updater,
            state,
            mounted: AtomicBool::new(true),
        }
    }

    fn variables(&self, input: &MutationInput) -> MutationResult<Value> {
        match self.document.kind {
            Some(kind) => kind.variables(input),
            // Custom mutations take their variables as-is.
            None => match &input.data {
                Some(Value::Object(map)) => Ok(Value::Object(map.clone())),
                Some(other) => Err(MutationError::User(format!(
                    "{} variables must be an object, found {other}",
                    self.document.operation_name
                ))),
                None => Ok(Value::Object(Map::new())),
            },
        }
    }

    fn check_body(&self, body: &Value) -> MutationResult<()> {
        match self.document.kind {
            Some(_) => MutationResponse::from_body(&self.document.operation_name, body).map(|_| ()),
            None => MutationResponse::check_errors(&self.document.operation_name, body),
        }
    }

    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    fn publish(&self, update: impl FnOnce(&mut MutationState)) {
        if self.is_mounted() {
            self.state.send_modify(update);
        }
    }

    async fn send(&self, input: MutationInput) -> MutationResult<Value> {
        let variables = self.variables(&input)?;
        let query = self.client.fragments.read().await.resolve(&self.document.text)?;
        let request = MutationRequest::new(&self.document.operation_name, query, variables);

        debug!(
            "Sending {} via {} ({})",
            request.operation_name,
            self.client.transport.transport_name(),
            request.id
        );
        let body = self.client.transport.execute(&request).await?;
        self.check_body(&body)?;
        Ok(body)
    }

    async fn mutate(&self, input: MutationInput) -> MutationResult<Value> {
        self.publish(|state| {
            state.loading = true;
            state.called = true;
        });

        let body = match self.send(input).await {
            Ok(body) => body,
            Err(e) => {
                self.publish(|state| {
                    state.loading = false;
                    state.error = Some(e.to_string());
                });
                return Err(e);
            }
        };

        if !self.is_mounted() {
            debug!(
                "{} finished after teardown, cache left untouched",
                self.document.operation_name
            );
            return Ok(body);
        }

        if let Some(updater) = &self.updater {
            let mut cache = self.client.cache.lock().await;
            match updater.update(&mut *cache, &body) {
                Ok(report) => debug!("{}: {}", self.document.operation_name, report),
                Err(e) => warn!(
                    "{} succeeded but the cache could not be updated: {}",
                    self.document.operation_name, e
                ),
            }
        }

        self.publish(|state| {
            state.loading = false;
            state.data = Some(body.clone());
            state.error = None;
        });
        Ok(body)
    }
}

/// Cloneable, immediately usable mutation trigger
#[derive(Clone)]
pub struct MutationHandle {
    operation: Arc<MutationOperation>,
}

impl MutationHandle {
    fn new(operation: MutationOperation) -> Self {
        Self {
            operation: Arc::new(operation),
        }
    }

    /// Run the mutation and return the response body
    ///
    /// The body is returned as the server sent it, e.g.
    /// `{ data: { createFoo: { data, __typename } } }`. Transport and GraphQL
    /// errors are returned and recorded in the state; the cache is not touched.
    pub async fn mutate(&self, input: MutationInput) -> MutationResult<Value> {
        self.operation.mutate(input).await
    }

    /// Run a collection mutation and normalize its response
    pub async fn mutate_document(&self, input: MutationInput) -> MutationResult<MutationResponse> {
        let body = self.mutate(input).await?;
        MutationResponse::from_body(&self.operation.document.operation_name, &body)
    }

    /// Snapshot of the current state
    pub fn state(&self) -> MutationState {
        self.operation.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<MutationState> {
        self.operation.state.subscribe()
    }

    pub fn operation_name(&self) -> &str {
        &self.operation.document.operation_name
    }

    pub fn document(&self) -> &MutationDocument {
        &self.operation.document
    }

    /// Tear down: later responses no longer patch the cache or publish state
    pub fn unmount(&self) {
        self.operation.mounted.store(false, Ordering::SeqCst);
    }

    pub fn is_mounted(&self) -> bool {
        self.operation.is_mounted()
    }
}

impl fmt::Debug for MutationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationHandle")
            .field("operation", &self.operation.document.operation_name)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

fn collection_handle(client: &MutationClient, options: &MutationOptions, kind: MutationKind) -> MutationHandle {
    let document = build_query(kind, options.collection.type_name(), &options.fragment);
    let updater = MultiQueryUpdater::new(options.collection.clone(), &document.operation_name, kind);
    MutationHandle::new(MutationOperation::new(document, client.clone(), Some(updater)))
}

/// `createFoo` handle
pub fn use_create(client: &MutationClient, options: &MutationOptions) -> MutationHandle {
    collection_handle(client, options, MutationKind::Create)
}

/// `updateFoo` handle
pub fn use_update(client: &MutationClient, options: &MutationOptions) -> MutationHandle {
    collection_handle(client, options, MutationKind::Update)
}

/// `upsertFoo` handle
pub fn use_upsert(client: &MutationClient, options: &MutationOptions) -> MutationHandle {
    collection_handle(client, options, MutationKind::Upsert)
}

/// `deleteFoo` handle
pub fn use_delete(client: &MutationClient, options: &MutationOptions) -> MutationHandle {
    collection_handle(client, options, MutationKind::Delete)
}

/// Custom mutation handle
///
/// The fragment only has to be registered by the time the mutation is sent.
pub fn use_mutation(
    client: &MutationClient,
    name: &str,
    args: &[(String, String)],
    fragment_name: Option<&str>,
) -> MutationHandle {
    let document = build_custom_mutation(name, args, fragment_name);
    MutationHandle::new(MutationOperation::new(document, client.clone(), None))
}

/// A prop handed to a wrapped component
#[derive(Debug, Clone)]
pub enum PropValue {
    Value(Value),
    Mutation(MutationHandle),
}

/// Named props of a wrapped component
#[derive(Debug, Clone, Default)]
pub struct Props(BTreeMap<String, PropValue>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain value prop
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.0.insert(name.into(), PropValue::Value(value));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: PropValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.0.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.0.get(name) {
            Some(PropValue::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn mutation(&self, name: &str) -> Option<&MutationHandle> {
        match self.0.get(name) {
            Some(PropValue::Mutation(handle)) => Some(handle),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Injects a mutation handle into props
#[derive(Debug, Clone)]
pub struct MutationEnhancer {
    display_name: String,
    handle: MutationHandle,
}

impl MutationEnhancer {
    fn new(wrapper: &str, handle: MutationHandle) -> Self {
        Self {
            display_name: format!("{wrapper}({})", handle.operation_name()),
            handle,
        }
    }

    /// Pass every prop through and add the handle under its operation name
    pub fn wrap(&self, mut props: Props) -> Props {
        props.insert(
            self.handle.operation_name().to_string(),
            PropValue::Mutation(self.handle.clone()),
        );
        props
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn handle(&self) -> &MutationHandle {
        &self.handle
    }
}

pub fn with_create(client: &MutationClient, options: &MutationOptions) -> MutationEnhancer {
    MutationEnhancer::new("withCreate", use_create(client, options))
}

pub fn with_update(client: &MutationClient, options: &MutationOptions) -> MutationEnhancer {
    MutationEnhancer::new("withUpdate", use_update(client, options))
}

pub fn with_upsert(client: &MutationClient, options: &MutationOptions) -> MutationEnhancer {
    MutationEnhancer::new("withUpsert", use_upsert(client, options))
}

pub fn with_delete(client: &MutationClient, options: &MutationOptions) -> MutationEnhancer {
    MutationEnhancer::new("withDelete", use_delete(client, options))
}

/// Wrap a custom mutation, building it even if its fragment is unknown yet
pub fn with_mutation(
    client: &MutationClient,
    name: &str,
    args: &[(String, String)],
    fragment_name: Option<&str>,
) -> MutationEnhancer {
    MutationEnhancer::new("withMutation", use_mutation(client, name, args, fragment_name))
}
