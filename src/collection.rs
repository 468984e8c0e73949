//! Collection descriptors
//!
//! A collection names an entity type and knows how to turn opaque list-query
//! terms into a selector and query options.

use crate::config::schema::CollectionConfig;
use crate::error::{MutationError, MutationResult};
use crate::query::{QueryParameters, SortDirection, SortKey};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Names identifying a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionOptions {
    /// GraphQL type name (`Foo`)
    pub type_name: String,
    /// Collection name (`Foos`)
    pub collection_name: String,
    /// Resolver name of the list query, used as the cache key prefix (`foos`)
    pub multi_resolver_name: String,
}

impl CollectionOptions {
    pub fn new(
        type_name: impl Into<String>,
        collection_name: impl Into<String>,
        multi_resolver_name: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            collection_name: collection_name.into(),
            multi_resolver_name: multi_resolver_name.into(),
        }
    }
}

/// Translates query terms into query parameters
pub trait ParameterResolver: Send + Sync {
    fn get_parameters(&self, terms: &Value) -> MutationResult<QueryParameters>;
}

impl<F> ParameterResolver for F
where
    F: Fn(&Value) -> MutationResult<QueryParameters> + Send + Sync,
{
    fn get_parameters(&self, terms: &Value) -> MutationResult<QueryParameters> {
        self(terms)
    }
}

/// Declarative terms translation
///
/// Terms may carry `selector`, `sort` (or `orderBy`), `limit` and
/// `offset` (or `skip`). Defaults apply when the terms leave them out.
#[derive(Debug, Clone, Default)]
pub struct TermsParameters {
    default_sort: Vec<SortKey>,
    default_limit: Option<u64>,
}

impl TermsParameters {
    pub fn new(default_sort: Vec<SortKey>, default_limit: Option<u64>) -> Self {
        Self {
            default_sort,
            default_limit,
        }
    }

    fn default_sort_map(&self) -> Option<Map<String, Value>> {
        if self.default_sort.is_empty() {
            return None;
        }
        let map = self
            .default_sort
            .iter()
            .map(|key| {
                let direction = match key.direction {
                    SortDirection::Ascending => 1,
                    SortDirection::Descending => -1,
                };
                (key.field.clone(), Value::from(direction))
            })
            .collect();
        Some(map)
    }
}

impl ParameterResolver for TermsParameters {
    fn get_parameters(&self, terms: &Value) -> MutationResult<QueryParameters> {
        let terms = match terms {
            Value::Null => return Ok(self.apply_defaults(QueryParameters::new())),
            Value::Object(map) => map,
            other => {
                return Err(MutationError::Parameters {
                    collection: "terms".to_string(),
                    reason: format!("terms must be an object, found {other}"),
                })
            }
        };

        let mut parameters = QueryParameters::new();

        if let Some(selector) = terms.get("selector") {
            parameters.selector = object_term("selector", selector)?;
        }
        if let Some(sort) = terms.get("sort").or_else(|| terms.get("orderBy")) {
            parameters.options.sort = Some(object_term("sort", sort)?);
        }
        if let Some(limit) = terms.get("limit").filter(|v| !v.is_null()) {
            parameters.options.limit = Some(integer_term("limit", limit)?);
        }
        if let Some(skip) = terms
            .get("offset")
            .or_else(|| terms.get("skip"))
            .filter(|v| !v.is_null())
        {
            parameters.options.skip = Some(integer_term("offset", skip)?);
        }

        Ok(self.apply_defaults(parameters))
    }
}

impl TermsParameters {
    fn apply_defaults(&self, mut parameters: QueryParameters) -> QueryParameters {
        if parameters.options.sort.is_none() {
            parameters.options.sort = self.default_sort_map();
        }
        if parameters.options.limit.is_none() {
            parameters.options.limit = self.default_limit;
        }
        parameters
    }
}

fn object_term(name: &str, value: &Value) -> MutationResult<Map<String, Value>> {
    value
        .as_object()
        .cloned()
        .ok_or_else(|| MutationError::Parameters {
            collection: "terms".to_string(),
            reason: format!("'{name}' must be an object"),
        })
}

fn integer_term(name: &str, value: &Value) -> MutationResult<u64> {
    value.as_u64().ok_or_else(|| MutationError::Parameters {
        collection: "terms".to_string(),
        reason: format!("'{name}' must be a non-negative integer"),
    })
}

/// Collection descriptor: names plus terms translation
#[derive(Clone)]
pub struct Collection {
    options: CollectionOptions,
    parameters: Arc<dyn ParameterResolver>,
}

impl Collection {
    /// Create a collection using declarative terms translation
    pub fn new(options: CollectionOptions) -> Self {
        Self {
            options,
            parameters: Arc::new(TermsParameters::default()),
        }
    }

    /// Replace the terms translation
    pub fn with_parameters(mut self, parameters: impl ParameterResolver + 'static) -> Self {
        self.parameters = Arc::new(parameters);
        self
    }

    /// Build a collection from a `[[collections]]` config entry
    pub fn from_config(config: &CollectionConfig) -> MutationResult<Self> {
        let default_sort = config
            .default_sort
            .iter()
            .map(|spec| SortKey::from_shorthand(spec))
            .collect::<MutationResult<Vec<_>>>()?;

        Ok(Self::new(CollectionOptions::new(
            &config.type_name,
            &config.collection_name,
            &config.multi_resolver_name,
        ))
        .with_parameters(TermsParameters::new(default_sort, config.default_limit)))
    }

    pub fn options(&self) -> &CollectionOptions {
        &self.options
    }

    pub fn type_name(&self) -> &str {
        &self.options.type_name
    }

    pub fn collection_name(&self) -> &str {
        &self.options.collection_name
    }

    pub fn multi_resolver_name(&self) -> &str {
        &self.options.multi_resolver_name
    }

    /// Translate terms into parameters, tagging failures with the collection name
    pub fn get_parameters(&self, terms: &Value) -> MutationResult<QueryParameters> {
        self.parameters
            .get_parameters(terms)
            .map_err(|e| match e {
                MutationError::Parameters { reason, .. } => MutationError::Parameters {
                    collection: self.options.collection_name.clone(),
                    reason,
                },
                other => other,
            })
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
