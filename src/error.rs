//! Error types for vulcan-mutations
//!
//! All modules use `MutationResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mutation and cache operations
pub type MutationResult<T> = Result<T, MutationError>;

/// All errors that can occur while building, sending or applying mutations
#[derive(Error, Debug)]
pub enum MutationError {
    // Cache errors
    #[error("Cache miss: {key}")]
    CacheMiss { key: String },

    #[error("Malformed cache key {key}: {reason}")]
    CacheKeyMalformed { key: String, reason: String },

    // Selector / query errors
    #[error("Unsupported selector operator: {0}")]
    UnsupportedOperator(String),

    #[error("Malformed selector at {path}: {reason}")]
    SelectorMalformed { path: String, reason: String },

    #[error("Malformed sort specification: {0}")]
    SortMalformed(String),

    #[error("Failed to resolve query parameters for {collection}: {reason}")]
    Parameters { collection: String, reason: String },

    // Mutation errors
    #[error("Mutation response has no payload for {operation}")]
    MissingPayload { operation: String },

    #[error("GraphQL error in {operation}: {}", messages.join("; "))]
    Graphql {
        operation: String,
        messages: Vec<String>,
    },

    #[error("Fragment not registered: {0}")]
    FragmentNotRegistered(String),

    #[error("Invalid fragment: {0}")]
    FragmentInvalid(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    // Transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server responded with HTTP {status} for {operation}")]
    HttpStatus { operation: String, status: u16 },

    #[error("Request for {0} timed out")]
    Timeout(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl MutationError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a malformed selector error
    pub fn selector(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SelectorMalformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a cache miss error for a raw cache key
    pub fn cache_miss(key: impl Into<String>) -> Self {
        Self::CacheMiss { key: key.into() }
    }

    /// Whether this error is a cache miss (read of an entry that is not cached)
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, Self::CacheMiss { .. })
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnknownCollection(_) => {
                Some("Add a [[collections]] entry to your config, see: vulcan-mutations config show")
            }
            Self::FragmentNotRegistered(_) => {
                Some("Register the fragment before sending the mutation")
            }
            Self::ConfigNotFound(_) => Some("Run: vulcan-mutations config init"),
            Self::Timeout(_) => Some("Increase transport.timeout_secs in your config"),
            _ => None,
        }
    }
}
