//! Document cache collaborator
//!
//! The cache is an explicit resource handle passed to every operation. It
//! exposes the raw root key space (needed to discover every cached list query
//! of a collection) and typed read/write primitives for list results.

use crate::cache::key::ListQuery;
use crate::document::Document;
use crate::error::{MutationError, MutationResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// Root object name in cache snapshots
pub const ROOT_QUERY: &str = "ROOT_QUERY";

/// Shared, lockable cache handle
pub type CacheHandle = Arc<Mutex<dyn DocumentCache>>;

/// Wrap a cache into a shareable handle
pub fn cache_handle<C: DocumentCache + 'static>(cache: C) -> CacheHandle {
    Arc::new(Mutex::new(cache))
}

/// Cached value of a list query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListResult {
    #[serde(default)]
    pub results: Vec<Document>,
    #[serde(rename = "totalCount", default)]
    pub total_count: u64,
}

impl ListResult {
    pub fn new(results: Vec<Document>, total_count: u64) -> Self {
        Self {
            results,
            total_count,
        }
    }

    /// Position of the document sharing `doc`'s identity
    pub fn position_of(&self, doc: &Document) -> Option<usize> {
        self.results.iter().position(|d| d.same_identity(doc))
    }
}

/// Read/write access to cached list queries
pub trait DocumentCache: Send {
    /// Every raw key currently stored under the root query
    fn root_keys(&self) -> Vec<String>;

    /// Read a list query; `CacheMiss` when it is not cached
    fn read_query(&self, query: &ListQuery) -> MutationResult<ListResult>;

    /// Store a list query result
    fn write_query(&mut self, query: &ListQuery, data: &ListResult) -> MutationResult<()>;
}

/// In-memory cache keyed by raw root keys
///
/// Snapshots use the shape `{"ROOT_QUERY": {"foos({...})": {results, totalCount}}}`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    root: BTreeMap<String, Value>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a list result under `query`, replacing any previous value
    pub fn insert(&mut self, query: &ListQuery, data: ListResult) -> MutationResult<()> {
        self.write_query(query, &data)
    }

    /// Insert a raw root entry (used for keys that are not list queries)
    pub fn insert_raw(&mut self, key: impl Into<String>, value: Value) {
        self.root.insert(key.into(), value);
    }

    /// Number of root entries
    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Build from a snapshot value
    pub fn from_snapshot(snapshot: &Value) -> MutationResult<Self> {
        let root = match snapshot.get(ROOT_QUERY) {
            Some(Value::Object(root)) => root,
            Some(_) => {
                return Err(MutationError::User(format!(
                    "cache snapshot {ROOT_QUERY} must be an object"
                )))
            }
            None => return Ok(Self::new()),
        };

        Ok(Self {
            root: root.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        })
    }

    /// Serialize into a snapshot value
    pub fn to_snapshot(&self) -> Value {
        let root: Map<String, Value> = self
            .root
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let mut snapshot = Map::new();
        snapshot.insert(ROOT_QUERY.to_string(), Value::Object(root));
        Value::Object(snapshot)
    }

    /// Load a snapshot file; a missing file is an empty cache
    pub async fn load(path: &Path) -> MutationResult<Self> {
        if !path.exists() {
            debug!("Cache snapshot {} not found, starting empty", path.display());
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| MutationError::io(format!("reading cache snapshot {}", path.display()), e))?;

        let snapshot: Value = serde_json::from_str(&content)?;
        Self::from_snapshot(&snapshot)
    }

    /// Save a snapshot file
    pub async fn save(&self, path: &Path) -> MutationResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| MutationError::io("creating cache snapshot directory", e))?;
        }

        let content = serde_json::to_string_pretty(&self.to_snapshot())?;
        fs::write(path, content)
            .await
            .map_err(|e| MutationError::io(format!("writing cache snapshot {}", path.display()), e))?;

        debug!("Saved cache snapshot to {}", path.display());
        Ok(())
    }
}

impl DocumentCache for InMemoryCache {
    fn root_keys(&self) -> Vec<String> {
        self.root.keys().cloned().collect()
    }

    fn read_query(&self, query: &ListQuery) -> MutationResult<ListResult> {
        let key = query.cache_key();
        let value = self
            .root
            .get(&key)
            .ok_or_else(|| MutationError::cache_miss(&key))?;

        // An entry that was enumerated but never filled in behaves like a miss.
        if value.as_object().is_some_and(|o| o.is_empty()) {
            return Err(MutationError::cache_miss(key));
        }

        Ok(serde_json::from_value(value.clone())?)
    }

    fn write_query(&mut self, query: &ListQuery, data: &ListResult) -> MutationResult<()> {
        self.root.insert(query.cache_key(), serde_json::to_value(data)?);
        Ok(())
    }
}
