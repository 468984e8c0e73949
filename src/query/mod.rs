//! List query parameters
//!
//! A collection translates opaque query terms into `QueryParameters`: a raw
//! selector plus sort/limit/skip options. The updater compiles them per cache
//! entry so a bad selector only affects the entry it belongs to.

pub mod sort;

use crate::document::Document;
use crate::error::MutationResult;
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use sort::{SortDirection, SortKey, SortSpec};

/// Options half of a parameter pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// `{ field: 1 | -1 }`, key order is significant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Map<String, Value>>,

    /// Page size, when explicitly requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Offset of the page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
}

/// Selector and options produced by a collection for a set of terms
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParameters {
    pub selector: Map<String, Value>,
    pub options: QueryOptions,
}

impl QueryParameters {
    /// Parameters with an empty selector and no options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the selector
    pub fn with_selector(mut self, selector: Map<String, Value>) -> Self {
        self.selector = selector;
        self
    }

    /// Set the sort specification
    pub fn with_sort(mut self, sort: Map<String, Value>) -> Self {
        self.options.sort = Some(sort);
        self
    }

    /// Set the page size
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Compile the selector and sort for evaluation
    pub fn compile(&self) -> MutationResult<CompiledQuery> {
        let selector = Selector::parse_map(&self.selector)?;
        let sort = match &self.options.sort {
            Some(sort) => SortSpec::from_map(sort)?,
            None => SortSpec::default(),
        };
        Ok(CompiledQuery {
            selector,
            sort,
            limit: self.options.limit,
            skip: self.options.skip,
        })
    }
}

/// Parameters ready for evaluation against documents
#[derive(Debug, Clone, Default)]
pub struct CompiledQuery {
    pub selector: Selector,
    pub sort: SortSpec,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

impl CompiledQuery {
    /// Whether `doc` belongs to the query's result set
    pub fn matches(&self, doc: &Document) -> bool {
        self.selector.matches(doc)
    }
}
