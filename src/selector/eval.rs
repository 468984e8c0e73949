//! Selector evaluation against documents

use super::compare::{comparable_order, values_equal};
use super::{Clause, Predicate, Selector};
use crate::document::Document;
use serde_json::Value;
use std::cmp::Ordering;

impl Selector {
    /// Whether `doc` satisfies every clause of this selector
    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|clause| clause.matches(doc))
    }
}

impl Clause {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Clause::Field { path, predicates } => {
                let value = doc.get_path(path);
                predicates.iter().all(|p| p.matches(value))
            }
            Clause::And(branches) => branches.iter().all(|s| s.matches(doc)),
            Clause::Or(branches) => branches.iter().any(|s| s.matches(doc)),
            Clause::Nor(branches) => !branches.iter().any(|s| s.matches(doc)),
        }
    }
}

impl Predicate {
    /// Evaluate against a field value (`None` when the field is missing)
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Predicate::Eq(operand) => matches_eq(value, operand),
            Predicate::Ne(operand) => !matches_eq(value, operand),
            Predicate::Gt(operand) => matches_range(value, operand, |o| o == Ordering::Greater),
            Predicate::Gte(operand) => matches_range(value, operand, |o| o != Ordering::Less),
            Predicate::Lt(operand) => matches_range(value, operand, |o| o == Ordering::Less),
            Predicate::Lte(operand) => matches_range(value, operand, |o| o != Ordering::Greater),
            Predicate::In(operands) => operands.iter().any(|op| matches_eq(value, op)),
            Predicate::Nin(operands) => !operands.iter().any(|op| matches_eq(value, op)),
            Predicate::Exists(expected) => value.is_some() == *expected,
            Predicate::Not(inner) => !inner.iter().all(|p| p.matches(value)),
            Predicate::Size(size) => value
                .and_then(Value::as_array)
                .is_some_and(|items| items.len() == *size),
        }
    }
}

/// Equality where a missing field equals null and arrays match by element
fn matches_eq(value: Option<&Value>, operand: &Value) -> bool {
    match value {
        None => operand.is_null(),
        Some(v) => {
            values_equal(v, operand)
                || v
                    .as_array()
                    .is_some_and(|items| items.iter().any(|item| values_equal(item, operand)))
        }
    }
}

fn matches_range(value: Option<&Value>, operand: &Value, accept: fn(Ordering) -> bool) -> bool {
    let Some(v) = value else {
        return false;
    };

    if comparable_order(v, operand).is_some_and(accept) {
        return true;
    }

    v.as_array().is_some_and(|items| {
        items
            .iter()
            .any(|item| comparable_order(item, operand).is_some_and(accept))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    fn matches(selector: Value, document: Value) -> bool {
        Selector::parse(&selector).unwrap().matches(&doc(document))
    }

    #[test]
    fn empty_selector_matches_everything() {
        assert!(matches(json!({}), json!({"_id": 1})));
    }

    #[test]
    fn gt_threshold() {
        assert!(!matches(json!({"val": {"$gt": 42}}), json!({"val": 41})));
        assert!(!matches(json!({"val": {"$gt": 42}}), json!({"val": 42})));
        assert!(matches(json!({"val": {"$gt": 42}}), json!({"val": 46})));
    }

    #[test]
    fn large_integer_thresholds_are_exact() {
        let doc = json!({"val": 9_007_199_254_740_993_u64});
        assert!(matches(json!({"val": {"$gt": 9_007_199_254_740_992_u64}}), doc.clone()));
        assert!(!matches(json!({"val": 9_007_199_254_740_992_u64}), doc.clone()));
        assert!(matches(json!({"val": {"$eq": 9_007_199_254_740_993_u64}}), doc));
    }

    #[test]
    fn range_bounds() {
        let selector = json!({"val": {"$gte": 10, "$lt": 20}});
        assert!(matches(selector.clone(), json!({"val": 10})));
        assert!(matches(selector.clone(), json!({"val": 19.5})));
        assert!(!matches(selector.clone(), json!({"val": 20})));
        assert!(!matches(selector, json!({"val": 9})));
        assert!(matches(json!({"val": {"$lte": 3}}), json!({"val": 3})));
    }

    #[test]
    fn range_never_crosses_types() {
        assert!(!matches(json!({"val": {"$gt": 1}}), json!({"val": "5"})));
        assert!(!matches(json!({"val": {"$lt": 1}}), json!({})));
    }

    #[test]
    fn equality_on_missing_field() {
        assert!(matches(json!({"deletedAt": null}), json!({"_id": 1})));
        assert!(!matches(json!({"status": 2}), json!({"_id": 1})));
    }

    #[test]
    fn array_field_matches_any_element() {
        let post = json!({"tags": ["rust", "graphql"], "scores": [1, 9]});
        assert!(matches(json!({"tags": "rust"}), post.clone()));
        assert!(matches(json!({"tags": ["rust", "graphql"]}), post.clone()));
        assert!(!matches(json!({"tags": "go"}), post.clone()));
        assert!(matches(json!({"scores": {"$gt": 5}}), post.clone()));
        assert!(matches(json!({"tags": {"$size": 2}}), post));
    }

    #[test]
    fn in_and_nin() {
        let selector = json!({"status": {"$in": [1, 2]}});
        assert!(matches(selector.clone(), json!({"status": 2})));
        assert!(!matches(selector, json!({"status": 3})));
        assert!(matches(json!({"status": {"$nin": [1, 2]}}), json!({"status": 3})));
        assert!(matches(json!({"status": {"$in": [null]}}), json!({})));
    }

    #[test]
    fn ne_and_exists() {
        assert!(matches(json!({"a": {"$ne": 1}}), json!({})));
        assert!(!matches(json!({"a": {"$ne": 1}}), json!({"a": 1})));
        assert!(matches(json!({"a": {"$exists": true}}), json!({"a": null})));
        assert!(matches(json!({"a": {"$exists": false}}), json!({"b": 1})));
    }

    #[test]
    fn logical_operators() {
        let or = json!({"$or": [{"a": 1}, {"b": 2}]});
        assert!(matches(or.clone(), json!({"b": 2})));
        assert!(!matches(or, json!({"a": 2})));

        let and = json!({"$and": [{"a": {"$gt": 0}}, {"a": {"$lt": 5}}]});
        assert!(matches(and.clone(), json!({"a": 3})));
        assert!(!matches(and, json!({"a": 7})));

        assert!(matches(json!({"$nor": [{"a": 1}]}), json!({"a": 2})));
        assert!(matches(json!({"a": {"$not": {"$gt": 5}}}), json!({"a": 2})));
        assert!(!matches(json!({"a": {"$not": {"$gt": 5}}}), json!({"a": 9})));
    }

    #[test]
    fn dotted_paths() {
        let document = json!({"author": {"karma": 12}});
        assert!(matches(json!({"author.karma": {"$gte": 10}}), document.clone()));
        assert!(!matches(json!({"author.karma": {"$gte": 20}}), document));
    }
}
