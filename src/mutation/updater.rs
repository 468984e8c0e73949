//! Multi-query cache updater
//!
//! After a single-document mutation, every cached list query of the owning
//! collection is re-evaluated against the mutated document and patched in
//! place: inserted at its sort position, replaced, repositioned or removed.
//! No refetch happens, so `totalCount` is only adjusted by one per entry.

use crate::cache::{DocumentCache, ListQuery, ListResult};
use crate::collection::Collection;
use crate::document::Document;
use crate::error::MutationResult;
use crate::mutation::builder::MutationKind;
use crate::mutation::response::MutationResponse;
use crate::query::CompiledQuery;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use tracing::{debug, warn};

/// What happened to one cached list query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPatch {
    /// Document added to the page
    Inserted,
    /// Document already present, content refreshed (and possibly moved)
    Replaced,
    /// Document dropped from the set
    Removed,
    /// Document does not concern this entry
    Unchanged,
}

/// Counters for one updater run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    /// Cache keys belonging to the collection's list resolver
    pub scanned: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Keys that could not be parsed
    pub skipped: usize,
    /// Entries whose patch failed (bad selector, unreadable value, failed write)
    pub failed: usize,
    /// Entries written back to the cache
    pub written: usize,
}

impl UpdateReport {
    fn record(&mut self, patch: EntryPatch) {
        match patch {
            EntryPatch::Inserted => self.inserted += 1,
            EntryPatch::Replaced => self.replaced += 1,
            EntryPatch::Removed => self.removed += 1,
            EntryPatch::Unchanged => self.unchanged += 1,
        }
    }
}

impl fmt::Display for UpdateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} scanned, {} inserted, {} replaced, {} removed, {} unchanged, {} skipped, {} failed",
            self.scanned,
            self.inserted,
            self.replaced,
            self.removed,
            self.unchanged,
            self.skipped,
            self.failed
        )
    }
}

/// Cache updater bound to one collection and one mutation
#[derive(Debug, Clone)]
pub struct MultiQueryUpdater {
    collection: Collection,
    resolver_name: String,
    kind: MutationKind,
}

impl MultiQueryUpdater {
    /// Bind to a collection, the mutation's resolver name and its kind
    pub fn new(collection: Collection, resolver_name: impl Into<String>, kind: MutationKind) -> Self {
        Self {
            collection,
            resolver_name: resolver_name.into(),
            kind,
        }
    }

    /// Bind using the canonical operation name (`createFoo`) for `kind`
    pub fn for_kind(collection: Collection, kind: MutationKind) -> Self {
        let resolver_name = kind.operation_name(collection.type_name());
        Self::new(collection, resolver_name, kind)
    }

    pub fn resolver_name(&self) -> &str {
        &self.resolver_name
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    /// Patch every cached list query of the collection after a mutation
    ///
    /// `response` is the mutation body (`{ data: { <resolver>: { data } } }`).
    /// A response without a document is a no-op. Failures to translate terms
    /// into parameters propagate; every other per-entry failure is logged and
    /// counted while the remaining entries are still processed.
    pub fn update(&self, cache: &mut dyn DocumentCache, response: &Value) -> MutationResult<UpdateReport> {
        let mut report = UpdateReport::default();

        let Some(doc) = MutationResponse::extract_document(&self.resolver_name, response) else {
            debug!("No document in {} response, cache left untouched", self.resolver_name);
            return Ok(report);
        };

        let list_resolver = self.collection.multi_resolver_name();
        for key in cache.root_keys() {
            if !ListQuery::key_belongs_to(&key, list_resolver) {
                continue;
            }
            report.scanned += 1;

            let query = match ListQuery::parse_key(&key) {
                Ok(query) => query,
                Err(e) => {
                    debug!("Skipping cache key: {}", e);
                    report.skipped += 1;
                    continue;
                }
            };

            let parameters = self.collection.get_parameters(&query.terms())?;
            let compiled = match parameters.compile() {
                Ok(compiled) => compiled,
                Err(e) => {
                    warn!("Cannot evaluate {} against {}: {}", self.resolver_name, key, e);
                    report.failed += 1;
                    continue;
                }
            };

            let current = match cache.read_query(&query) {
                Ok(current) => current,
                Err(e) if e.is_cache_miss() => ListResult::default(),
                Err(e) => {
                    warn!("Cannot read {}: {}", key, e);
                    report.failed += 1;
                    continue;
                }
            };

            let (patched, outcome) = self.patch(&compiled, current.clone(), &doc);
            debug!("{} on {}: {:?}", self.resolver_name, key, outcome);
            report.record(outcome);

            if patched == current {
                continue;
            }
            match cache.write_query(&query, &patched) {
                Ok(()) => report.written += 1,
                Err(e) => {
                    warn!("Cannot write {}: {}", key, e);
                    report.failed += 1;
                }
            }
        }

        debug!("{} cache update: {}", self.resolver_name, report);
        Ok(report)
    }

    /// Compute the new value of one list entry
    pub fn patch(&self, query: &CompiledQuery, mut list: ListResult, doc: &Document) -> (ListResult, EntryPatch) {
        let position = list.position_of(doc);
        let matches = query.matches(doc);

        if self.kind.is_removal() {
            let outcome = match position {
                Some(index) => {
                    list.results.remove(index);
                    list.total_count = list.total_count.saturating_sub(1);
                    EntryPatch::Removed
                }
                // Counted server-side even though it is not on this page.
                None if matches && list.total_count > 0 => {
                    list.total_count -= 1;
                    EntryPatch::Removed
                }
                None => EntryPatch::Unchanged,
            };
            return (list, outcome);
        }

        let outcome = match (position, matches) {
            (None, false) => EntryPatch::Unchanged,
            (None, true) => {
                let index = query.sort.insertion_index(&list.results, doc);
                list.results.insert(index, doc.clone());
                list.total_count += 1;
                EntryPatch::Inserted
            }
            (Some(index), true) => {
                if still_in_order(query, &list.results, index, doc) {
                    list.results[index] = doc.clone();
                } else {
                    list.results.remove(index);
                    let index = query.sort.insertion_index(&list.results, doc);
                    list.results.insert(index, doc.clone());
                }
                EntryPatch::Replaced
            }
            (Some(index), false) => {
                list.results.remove(index);
                list.total_count = list.total_count.saturating_sub(1);
                EntryPatch::Removed
            }
        };

        // Only an explicit page size bounds the list; otherwise it may grow.
        if let Some(limit) = query.limit.filter(|limit| *limit > 0) {
            list.results.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }

        (list, outcome)
    }
}

/// Whether `doc` can take the slot at `index` without breaking the sort
fn still_in_order(query: &CompiledQuery, results: &[Document], index: usize, doc: &Document) -> bool {
    if query.sort.is_empty() {
        return true;
    }
    let after_previous = index == 0 || query.sort.compare(&results[index - 1], doc) != Ordering::Greater;
    let before_next = results
        .get(index + 1)
        .map_or(true, |next| query.sort.compare(doc, next) != Ordering::Greater);
    after_previous && before_next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::collection::CollectionOptions;
    use crate::error::{MutationError, MutationResult};
    use crate::query::QueryParameters;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Cache double recording every write, like a spy on `writeQuery`
    #[derive(Default)]
    struct SpyCache {
        keys: Vec<String>,
        content: HashMap<String, ListResult>,
        writes: Arc<Mutex<Vec<(String, ListResult)>>>,
    }

    impl SpyCache {
        fn with_entry(key: String, content: Option<ListResult>) -> Self {
            let mut cache = Self::default();
            if let Some(content) = content {
                cache.content.insert(key.clone(), content);
            }
            cache.keys.push(key);
            cache
        }

        fn writes(&self) -> Vec<(String, ListResult)> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl DocumentCache for SpyCache {
        fn root_keys(&self) -> Vec<String> {
            self.keys.clone()
        }

        fn read_query(&self, query: &ListQuery) -> MutationResult<ListResult> {
            self.content
                .get(&query.cache_key())
                .cloned()
                .ok_or_else(|| MutationError::cache_miss(query.cache_key()))
        }

        fn write_query(&mut self, query: &ListQuery, data: &ListResult) -> MutationResult<()> {
            self.writes
                .lock()
                .unwrap()
                .push((query.cache_key(), data.clone()));
            self.content.insert(query.cache_key(), data.clone());
            Ok(())
        }
    }

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    fn foo() -> Value {
        json!({"_id": 1, "hello": "world", "__typename": "Foo"})
    }

    fn foos_key() -> String {
        ListQuery::with_terms("foos", json!({})).cache_key()
    }

    fn collection_with(parameters: QueryParameters) -> Collection {
        Collection::new(CollectionOptions::new("Foo", "Foos", "foos")).with_parameters(
            move |_terms: &Value| -> MutationResult<QueryParameters> { Ok(parameters.clone()) },
        )
    }

    fn params(value: Value) -> QueryParameters {
        serde_json::from_value(value).unwrap()
    }

    fn response(operation: &str, document: Value) -> Value {
        json!({"data": {operation: {"data": document}}})
    }

    fn empty_page() -> Option<ListResult> {
        Some(ListResult::new(vec![], 0))
    }

    fn create_updater(parameters: QueryParameters) -> MultiQueryUpdater {
        MultiQueryUpdater::new(collection_with(parameters), "createFoo", MutationKind::Create)
    }

    #[test]
    fn adds_document_after_creation() {
        let mut cache = SpyCache::with_entry(foos_key(), empty_page());
        let updater = create_updater(QueryParameters::new());

        let report = updater.update(&mut cache, &response("createFoo", foo())).unwrap();

        let writes = cache.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, ListResult::new(vec![doc(foo())], 1));
        assert_eq!(report.inserted, 1);
        assert_eq!(report.written, 1);
    }

    #[test]
    fn replaces_document_already_present() {
        let mut cache = SpyCache::with_entry(foos_key(), Some(ListResult::new(vec![doc(foo())], 1)));
        let updater = create_updater(QueryParameters::new());
        let mut updated = foo();
        updated["UPDATED"] = json!(true);

        updater
            .update(&mut cache, &response("createFoo", updated.clone()))
            .unwrap();

        let writes = cache.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, ListResult::new(vec![doc(updated)], 1));
    }

    #[test]
    fn skips_document_not_matching_selector() {
        let mut cache = SpyCache::with_entry(foos_key(), empty_page());
        let updater = create_updater(params(json!({"selector": {"val": {"$gt": 42}}})));
        let mut candidate = foo();
        candidate["val"] = json!(41);

        let report = updater.update(&mut cache, &response("createFoo", candidate)).unwrap();

        assert!(cache.writes().is_empty());
        assert_eq!(report.unchanged, 1);
    }

    #[test]
    fn adds_document_matching_selector() {
        let mut cache = SpyCache::with_entry(foos_key(), empty_page());
        let updater = create_updater(params(json!({"selector": {"val": {"$gt": 42}}})));
        let mut candidate = foo();
        candidate["val"] = json!(46);

        updater.update(&mut cache, &response("createFoo", candidate)).unwrap();

        assert_eq!(cache.writes().len(), 1);
    }

    #[test]
    fn inserts_at_sort_position() {
        let page = ListResult::new(vec![doc(json!({"val": 40})), doc(json!({"val": 43}))], 2);
        let mut cache = SpyCache::with_entry(foos_key(), Some(page));
        let updater = create_updater(params(json!({"options": {"sort": {"val": 1}}})));
        let mut candidate = foo();
        candidate["val"] = json!(42);

        updater
            .update(&mut cache, &response("createFoo", candidate.clone()))
            .unwrap();

        let written = &cache.writes()[0].1;
        assert_eq!(written.results.len(), 3);
        assert_eq!(written.results[1], doc(candidate));
        assert_eq!(written.total_count, 3);
    }

    #[test]
    fn cache_miss_reads_as_empty_page() {
        let mut cache = SpyCache::with_entry(foos_key(), None);
        let updater = create_updater(QueryParameters::new());

        updater.update(&mut cache, &response("createFoo", foo())).unwrap();

        assert_eq!(cache.writes()[0].1.total_count, 1);
    }

    #[test]
    fn reapplying_is_idempotent() {
        let mut cache = SpyCache::with_entry(foos_key(), empty_page());
        let updater = create_updater(params(json!({"options": {"sort": {"hello": 1}}})));
        let body = response("createFoo", foo());

        updater.update(&mut cache, &body).unwrap();
        let report = updater.update(&mut cache, &body).unwrap();

        assert_eq!(cache.writes().len(), 1);
        assert_eq!(report.replaced, 1);
        assert_eq!(report.written, 0);
    }

    #[test]
    fn update_repositions_changed_sort_key() {
        let page = ListResult::new(
            vec![
                doc(json!({"_id": 1, "val": 1})),
                doc(json!({"_id": 2, "val": 2})),
                doc(json!({"_id": 3, "val": 3})),
            ],
            3,
        );
        let mut cache = SpyCache::with_entry(foos_key(), Some(page));
        let updater = MultiQueryUpdater::new(
            collection_with(params(json!({"options": {"sort": {"val": 1}}}))),
            "updateFoo",
            MutationKind::Update,
        );

        updater
            .update(&mut cache, &response("updateFoo", json!({"_id": 1, "val": 10})))
            .unwrap();

        let written = &cache.writes()[0].1;
        let ids: Vec<_> = written.results.iter().map(|d| d.id().cloned().unwrap()).collect();
        assert_eq!(ids, vec![json!(2), json!(3), json!(1)]);
        assert_eq!(written.total_count, 3);
    }

    #[test]
    fn update_out_of_selector_removes() {
        let page = ListResult::new(vec![doc(json!({"_id": 1, "status": 2}))], 5);
        let mut cache = SpyCache::with_entry(foos_key(), Some(page));
        let updater = MultiQueryUpdater::new(
            collection_with(params(json!({"selector": {"status": 2}}))),
            "updateFoo",
            MutationKind::Update,
        );

        let report = updater
            .update(&mut cache, &response("updateFoo", json!({"_id": 1, "status": 4})))
            .unwrap();

        assert_eq!(cache.writes()[0].1, ListResult::new(vec![], 4));
        assert_eq!(report.removed, 1);
    }

    #[test]
    fn delete_removes_by_identity() {
        let page = ListResult::new(vec![doc(json!({"_id": 1})), doc(json!({"_id": 2}))], 2);
        let mut cache = SpyCache::with_entry(foos_key(), Some(page));
        let updater = MultiQueryUpdater::for_kind(collection_with(QueryParameters::new()), MutationKind::Delete);
        assert_eq!(updater.resolver_name(), "deleteFoo");

        updater
            .update(&mut cache, &response("deleteFoo", json!({"_id": 2})))
            .unwrap();

        assert_eq!(
            cache.writes()[0].1,
            ListResult::new(vec![doc(json!({"_id": 1}))], 1)
        );
    }

    #[test]
    fn delete_off_page_decrements_matching_count() {
        let page = ListResult::new(vec![doc(json!({"_id": 1}))], 10);
        let mut cache = SpyCache::with_entry(foos_key(), Some(page));
        let updater = MultiQueryUpdater::for_kind(collection_with(QueryParameters::new()), MutationKind::Delete);

        updater
            .update(&mut cache, &response("deleteFoo", json!({"_id": 99})))
            .unwrap();

        let written = &cache.writes()[0].1;
        assert_eq!(written.results.len(), 1);
        assert_eq!(written.total_count, 9);
    }

    #[test]
    fn delete_on_empty_cache_writes_nothing() {
        let mut cache = SpyCache::with_entry(foos_key(), None);
        let updater = MultiQueryUpdater::for_kind(collection_with(QueryParameters::new()), MutationKind::Delete);

        updater
            .update(&mut cache, &response("deleteFoo", json!({"_id": 1})))
            .unwrap();

        assert!(cache.writes().is_empty());
    }

    #[test]
    fn explicit_limit_truncates_page() {
        let page = ListResult::new(vec![doc(json!({"_id": 1, "val": 1})), doc(json!({"_id": 2, "val": 3}))], 8);
        let mut cache = SpyCache::with_entry(foos_key(), Some(page));
        let updater = create_updater(params(json!({"options": {"sort": {"val": 1}, "limit": 2}})));

        updater
            .update(&mut cache, &response("createFoo", json!({"_id": 3, "val": 2})))
            .unwrap();

        let written = &cache.writes()[0].1;
        let ids: Vec<_> = written.results.iter().map(|d| d.id().cloned().unwrap()).collect();
        assert_eq!(ids, vec![json!(1), json!(3)]);
        assert_eq!(written.total_count, 9);
    }

    #[test]
    fn no_limit_lets_page_grow() {
        let page = ListResult::new((0..5).map(|i| doc(json!({"_id": i}))).collect(), 5);
        let mut cache = SpyCache::with_entry(foos_key(), Some(page));
        let updater = create_updater(QueryParameters::new());

        updater
            .update(&mut cache, &response("createFoo", json!({"_id": 5})))
            .unwrap();

        assert_eq!(cache.writes()[0].1.results.len(), 6);
    }

    #[test]
    fn missing_document_is_noop() {
        let mut cache = SpyCache::with_entry(foos_key(), empty_page());
        let updater = create_updater(QueryParameters::new());

        let report = updater
            .update(&mut cache, &json!({"data": {"createFoo": null}}))
            .unwrap();

        assert!(cache.writes().is_empty());
        assert_eq!(report, UpdateReport::default());
    }

    #[test]
    fn other_collections_and_bad_keys_untouched() {
        let mut cache = SpyCache::with_entry(foos_key(), empty_page());
        cache.keys.push(ListQuery::with_terms("bars", json!({})).cache_key());
        cache.keys.push("foos({broken".to_string());
        cache.keys.push("currentUser".to_string());
        let updater = create_updater(QueryParameters::new());

        let report = updater.update(&mut cache, &response("createFoo", foo())).unwrap();

        let writes = cache.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, foos_key());
        assert_eq!(report.scanned, 2);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn bad_selector_only_fails_its_entry() {
        let good = ListQuery::with_terms("foos", json!({"view": "good"})).cache_key();
        let bad = ListQuery::with_terms("foos", json!({"view": "bad"})).cache_key();
        let mut cache = SpyCache::with_entry(good.clone(), empty_page());
        cache.keys.push(bad);
        cache.content.insert(cache.keys[1].clone(), ListResult::default());

        let collection = Collection::new(CollectionOptions::new("Foo", "Foos", "foos")).with_parameters(
            |terms: &Value| -> MutationResult<QueryParameters> {
                if terms["view"] == "bad" {
                    Ok(serde_json::from_value(json!({"selector": {"val": {"$where": "1"}}}))?)
                } else {
                    Ok(QueryParameters::new())
                }
            },
        );
        let updater = MultiQueryUpdater::new(collection, "createFoo", MutationKind::Create);

        let report = updater.update(&mut cache, &response("createFoo", foo())).unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(cache.writes()[0].0, good);
    }

    #[test]
    fn parameter_failure_propagates() {
        let mut cache = SpyCache::with_entry(foos_key(), empty_page());
        let collection = Collection::new(CollectionOptions::new("Foo", "Foos", "foos")).with_parameters(
            |_terms: &Value| -> MutationResult<QueryParameters> {
                Err(MutationError::Parameters {
                    collection: "Foos".to_string(),
                    reason: "boom".to_string(),
                })
            },
        );
        let updater = MultiQueryUpdater::new(collection, "createFoo", MutationKind::Create);

        assert!(updater.update(&mut cache, &response("createFoo", foo())).is_err());
        assert!(cache.writes().is_empty());
    }

    #[test]
    fn membership_and_order_hold_for_many_inserts() {
        let mut cache = InMemoryCache::new();
        let query = ListQuery::with_terms("foos", json!({}));
        cache.insert(&query, ListResult::default()).unwrap();
        let updater = create_updater(params(json!({
            "selector": {"val": {"$gte": 10}},
            "options": {"sort": {"val": -1, "_id": 1}}
        })));

        let values = [12, 3, 40, 10, 25, 9, 40, 18];
        for (id, val) in values.iter().enumerate() {
            updater
                .update(&mut cache, &response("createFoo", json!({"_id": id, "val": val})))
                .unwrap();
        }

        let page = cache.read_query(&query).unwrap();
        let compiled = updater.collection.get_parameters(&json!({})).unwrap().compile().unwrap();
        assert!(compiled.sort.is_sorted(&page.results));
        assert!(page.results.iter().all(|d| compiled.matches(d)));
        let expected = values.iter().filter(|v| **v >= 10).count();
        assert_eq!(page.results.len(), expected);
        assert_eq!(page.total_count, expected as u64);
    }

    #[test]
    fn works_with_in_memory_cache_snapshot_keys() {
        let mut cache = InMemoryCache::new();
        let key = r#"foos({"input": {"terms": {}}})"#;
        cache.insert_raw(key, json!({}));
        let updater = create_updater(QueryParameters::new());

        updater.update(&mut cache, &response("createFoo", foo())).unwrap();

        let query = ListQuery::parse_key(key).unwrap();
        assert_eq!(cache.read_query(&query).unwrap().total_count, 1);
        assert_eq!(cache.len(), 1);
    }
}
