//! CLI command implementations

pub mod apply;
pub mod build;
pub mod collections;
pub mod config;
pub mod mutate;

pub use apply::execute as apply;
pub use build::execute as build;
pub use collections::execute as collections;
pub use config::execute as config;
pub use mutate::execute as mutate;

use crate::collection::Collection;
use crate::config::Config;
use crate::error::{MutationError, MutationResult};
use crate::fragment::Fragment;
use std::path::PathBuf;

/// Look up a configured collection and its default fragment
pub(crate) fn resolve_collection(config: &Config, name: &str) -> MutationResult<(Collection, Fragment)> {
    let entry = config
        .collection(name)
        .ok_or_else(|| MutationError::UnknownCollection(name.to_string()))?;
    let collection = Collection::from_config(entry)?;
    let fragment = Fragment::parse(&entry.fragment_text())?;
    Ok((collection, fragment))
}

/// Snapshot path from the command line, falling back to `cache.snapshot`
pub(crate) fn resolve_snapshot(explicit: Option<PathBuf>, config: &Config) -> Option<PathBuf> {
    explicit.or_else(|| config.cache.snapshot.clone())
}
