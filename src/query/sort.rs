//! Multi-key sort specifications

use crate::document::Document;
use crate::error::{MutationError, MutationResult};
use crate::selector::compare_fields;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Sort direction for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// One field of a sort specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    /// Parse `field` (ascending) or `-field` (descending)
    pub fn from_shorthand(spec: &str) -> MutationResult<Self> {
        let (field, direction) = match spec.strip_prefix('-') {
            Some(rest) => (rest, SortDirection::Descending),
            None => (spec.strip_prefix('+').unwrap_or(spec), SortDirection::Ascending),
        };
        if field.is_empty() {
            return Err(MutationError::SortMalformed(format!("empty sort field in '{spec}'")));
        }
        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// Ordered list of sort keys; the first key wins ties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    /// Build from already parsed keys
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self { keys }
    }

    /// Parse `{ field: 1 | -1, ... }` preserving key order
    pub fn from_map(map: &Map<String, Value>) -> MutationResult<Self> {
        let mut keys = Vec::with_capacity(map.len());
        for (field, direction) in map {
            let direction = match direction.as_i64() {
                Some(1) => SortDirection::Ascending,
                Some(-1) => SortDirection::Descending,
                _ => match direction.as_str() {
                    Some("asc") | Some("ascending") => SortDirection::Ascending,
                    Some("desc") | Some("descending") => SortDirection::Descending,
                    _ => {
                        return Err(MutationError::SortMalformed(format!(
                            "direction for '{field}' must be 1 or -1, found {direction}"
                        )))
                    }
                },
            };
            keys.push(SortKey {
                field: field.clone(),
                direction,
            });
        }
        Ok(Self { keys })
    }

    /// Whether no sort is active
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sort keys in priority order
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Compare two documents under this specification
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for key in &self.keys {
            let ordering = key
                .direction
                .apply(compare_fields(a.get_path(&key.field), b.get_path(&key.field)));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Position at which `doc` keeps `results` ordered
    ///
    /// Returns the first index whose element sorts strictly after `doc`, so a
    /// document lands after any equal neighbours. Without keys this is the end.
    pub fn insertion_index(&self, results: &[Document], doc: &Document) -> usize {
        if self.is_empty() {
            return results.len();
        }
        results.partition_point(|existing| self.compare(existing, doc) != Ordering::Greater)
    }

    /// Whether `results` is ordered under this specification
    pub fn is_sorted(&self, results: &[Document]) -> bool {
        results
            .windows(2)
            .all(|pair| self.compare(&pair[0], &pair[1]) != Ordering::Greater)
    }
}
