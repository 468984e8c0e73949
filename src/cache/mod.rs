//! Client-side document cache
//!
//! List queries are cached under `resolverName(<variables>)` keys. The
//! updater enumerates those keys to find every cached page of a collection.
//!
//! # Entry Shape
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `results` | Ordered page of documents |
//! | `totalCount` | Server-side size of the full matching set |

pub mod key;
pub mod store;

pub use key::ListQuery;
pub use store::{cache_handle, CacheHandle, DocumentCache, InMemoryCache, ListResult, ROOT_QUERY};
