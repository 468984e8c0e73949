//! Fragments and the fragment registry
//!
//! A fragment is a value object: a name plus its GraphQL text. Builders only
//! need that pair, so documents can be built before any registry knows about
//! the fragment. The registry is consulted when a request is sent, to append
//! definitions for spreads that the document does not define itself.

use crate::error::{MutationError, MutationResult};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Named, reusable field selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    name: String,
    text: String,
}

impl Fragment {
    /// Create a fragment from a known name and its full text
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Parse `fragment Name on Type { ... }`, taking the name from the text
    pub fn parse(text: &str) -> MutationResult<Self> {
        let mut tokens = text.split_whitespace();
        if tokens.next() != Some("fragment") {
            return Err(MutationError::FragmentInvalid(
                "text must start with 'fragment'".to_string(),
            ));
        }

        let name = tokens
            .next()
            .filter(|name| is_name(name))
            .ok_or_else(|| MutationError::FragmentInvalid("missing fragment name".to_string()))?;

        if tokens.next() != Some("on") || tokens.next().is_none() {
            return Err(MutationError::FragmentInvalid(format!(
                "fragment {name} must declare 'on <Type>'"
            )));
        }

        Ok(Self::new(name, text.trim()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Explicit fragment lookup table, consulted at send time
#[derive(Debug, Clone, Default)]
pub struct FragmentRegistry {
    fragments: HashMap<String, Fragment>,
}

impl FragmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a fragment under its name
    pub fn register(&mut self, fragment: Fragment) {
        debug!("Registered fragment {}", fragment.name());
        self.fragments.insert(fragment.name().to_string(), fragment);
    }

    pub fn get(&self, name: &str) -> Option<&Fragment> {
        self.fragments.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }

    /// Append definitions for every spread the document uses but lacks
    ///
    /// Spreads inside appended fragments are resolved too.
    pub fn resolve(&self, document: &str) -> MutationResult<String> {
        let mut resolved = document.to_string();
        let mut defined = defined_fragments(document);

        loop {
            let missing: BTreeSet<String> = fragment_spreads(&resolved)
                .into_iter()
                .filter(|name| !defined.contains(name))
                .collect();
            if missing.is_empty() {
                return Ok(resolved);
            }

            for name in missing {
                let fragment = self
                    .get(&name)
                    .ok_or_else(|| MutationError::FragmentNotRegistered(name.clone()))?;
                resolved.push('\n');
                resolved.push_str(fragment.text());
                defined.insert(name);
            }
        }
    }
}

fn is_name(token: &str) -> bool {
    let mut chars = token.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Names used as `...Name` spreads (inline `... on Type` is ignored)
pub fn fragment_spreads(document: &str) -> BTreeSet<String> {
    let mut spreads = BTreeSet::new();
    let mut rest = document;
    while let Some(pos) = rest.find("...") {
        rest = &rest[pos + 3..];
        let name: String = rest
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if !name.is_empty() && name != "on" && is_name(&name) {
            spreads.insert(name);
        }
    }
    spreads
}

/// Names of fragments defined in the document
pub fn defined_fragments(document: &str) -> BTreeSet<String> {
    let tokens: Vec<&str> = document.split_whitespace().collect();
    tokens
        .windows(3)
        .filter(|w| w[0] == "fragment" && w[2] == "on" && is_name(w[1]))
        .map(|w| w[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOOS_FRAGMENT: &str = "fragment FoosDefaultFragment on Foo {
        _id
        hello
        __typename
    }";

    #[test]
    fn parse_takes_name_from_text() {
        let fragment = Fragment::parse(FOOS_FRAGMENT).unwrap();
        assert_eq!(fragment.name(), "FoosDefaultFragment");
        assert!(fragment.text().ends_with('}'));
    }

    #[test]
    fn parse_rejects_invalid_text() {
        assert!(Fragment::parse("query Foo { x }").is_err());
        assert!(Fragment::parse("fragment { x }").is_err());
        assert!(Fragment::parse("fragment Foo { x }").is_err());
    }

    #[test]
    fn spreads_ignore_inline_fragments() {
        let spreads = fragment_spreads("{ data { ...A ... on Foo { x } ... B } }");
        assert_eq!(spreads.into_iter().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn resolve_appends_missing_definitions() {
        let mut registry = FragmentRegistry::new();
        registry.register(Fragment::parse(FOOS_FRAGMENT).unwrap());

        let resolved = registry
            .resolve("mutation m { m { data { ...FoosDefaultFragment } } }")
            .unwrap();
        assert!(resolved.contains("fragment FoosDefaultFragment on Foo"));
    }

    #[test]
    fn resolve_leaves_defined_fragments_alone() {
        let registry = FragmentRegistry::new();
        let document = format!("mutation m {{ m {{ data {{ ...FoosDefaultFragment }} }} }}\n{FOOS_FRAGMENT}");
        assert_eq!(registry.resolve(&document).unwrap(), document);
    }

    #[test]
    fn resolve_follows_nested_spreads() {
        let mut registry = FragmentRegistry::new();
        registry.register(Fragment::new("Outer", "fragment Outer on Foo { ...Inner }"));
        registry.register(Fragment::new("Inner", "fragment Inner on Foo { _id }"));

        let resolved = registry.resolve("{ x { ...Outer } }").unwrap();
        assert!(resolved.contains("fragment Outer on Foo"));
        assert!(resolved.contains("fragment Inner on Foo"));
    }

    #[test]
    fn resolve_fails_for_unregistered_fragment() {
        let registry = FragmentRegistry::new();
        let err = registry.resolve("{ x { ...foobar } }").unwrap_err();
        assert!(matches!(err, MutationError::FragmentNotRegistered(name) if name == "foobar"));
    }
}
