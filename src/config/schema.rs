//! Configuration schema
//!
//! Configuration is stored at `~/.config/vulcan-mutations/config.toml`, with an
//! optional project-local `.vulcan.toml` layered on top.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// GraphQL endpoint settings
    pub transport: TransportConfig,

    /// Cache snapshot settings
    pub cache: CacheConfig,

    /// Known collections
    pub collections: Vec<CollectionConfig>,
}

impl Config {
    /// Find a collection by collection name or type name
    pub fn collection(&self, name: &str) -> Option<&CollectionConfig> {
        self.collections
            .iter()
            .find(|c| c.collection_name == name || c.type_name == name)
    }

    /// Names of every configured collection
    pub fn collection_names(&self) -> Vec<&str> {
        self.collections
            .iter()
            .map(|c| c.collection_name.as_str())
            .collect()
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// GraphQL transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// GraphQL endpoint URL
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Extra HTTP headers sent with every request
    pub headers: BTreeMap<String, String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/graphql".to_string(),
            timeout_secs: 30,
            headers: BTreeMap::new(),
        }
    }
}

/// Cache snapshot settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Snapshot file used when `--cache` is not given
    pub snapshot: Option<PathBuf>,
}

/// A collection descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// GraphQL type name (`Foo`)
    pub type_name: String,

    /// Collection name (`Foos`)
    pub collection_name: String,

    /// List resolver name (`foos`)
    pub multi_resolver_name: String,

    /// Default fragment name; `<CollectionName>DefaultFragment` when empty
    pub fragment_name: Option<String>,

    /// Fragment selection set, e.g. `_id title`
    pub fragment: Option<String>,

    /// Default sort fields, `-field` for descending
    pub default_sort: Vec<String>,

    /// Default page size
    pub default_limit: Option<u64>,
}

impl CollectionConfig {
    pub fn fragment_name(&self) -> String {
        self.fragment_name
            .clone()
            .unwrap_or_else(|| format!("{}DefaultFragment", self.collection_name))
    }

    /// Full fragment text built from the configured selection set
    ///
    /// The selection is kept as written. A single enclosing `{ ... }` pair is
    /// dropped, and `__typename` is appended unless already selected at the
    /// top level. Without a selection set the fragment selects `_id`.
    pub fn fragment_text(&self) -> String {
        let selection = self
            .fragment
            .as_deref()
            .map(strip_enclosing_braces)
            .filter(|s| !s.is_empty())
            .unwrap_or("_id");

        let mut lines: Vec<&str> = selection
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if !selects_top_level(selection, "__typename") {
            lines.push("__typename");
        }

        format!(
            "fragment {} on {} {{\n  {}\n}}",
            self.fragment_name(),
            self.type_name,
            lines.join("\n  ")
        )
    }
}

/// Byte offset of the brace closing the one at `open`
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Drop one `{ ... }` pair, only when it encloses the whole selection
fn strip_enclosing_braces(selection: &str) -> &str {
    let selection = selection.trim();
    if selection.starts_with('{') && matching_brace(selection, 0) == Some(selection.len() - 1) {
        selection[1..selection.len() - 1].trim()
    } else {
        selection
    }
}

/// Whether `field` is selected outside every sub-selection
fn selects_top_level(selection: &str, field: &str) -> bool {
    let mut depth = 0usize;
    let mut token = String::new();
    for c in selection.chars().chain(std::iter::once(' ')) {
        if depth == 0 && (c.is_ascii_alphanumeric() || c == '_') {
            token.push(c);
            continue;
        }
        if token == field {
            return true;
        }
        token.clear();
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    false
}
