//! Mutation document builders
//!
//! One canonical document per operation. Every document selects the affected
//! document through the caller's fragment and wraps it in the uniform
//! `{ data, __typename }` envelope the cache updater relies on.

use crate::error::{MutationError, MutationResult};
use crate::fragment::Fragment;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// The four collection mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Upsert,
    Delete,
}

impl MutationKind {
    /// Operation name prefix (`create`)
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Upsert => "upsert",
            Self::Delete => "delete",
        }
    }

    fn input_prefix(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Upsert => "Upsert",
            Self::Delete => "Delete",
        }
    }

    /// `createFoo`, `deleteFoo`, ...
    pub fn operation_name(self, type_name: &str) -> String {
        format!("{}{}", self.prefix(), type_name)
    }

    /// Whether the mutation removes its document
    pub fn is_removal(self) -> bool {
        matches!(self, Self::Delete)
    }

    pub fn all() -> [Self; 4] {
        [Self::Create, Self::Update, Self::Upsert, Self::Delete]
    }

    /// Infer the kind from an operation name such as `createFoo`
    pub fn from_operation_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|kind| {
            name.strip_prefix(kind.prefix())
                .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
        })
    }

    /// Build the variables object for this mutation
    ///
    /// Create takes `{data}`, update and upsert take `{data}` plus an optional
    /// selector, delete takes `{selector}`. A bare document id becomes
    /// `{ documentId }`.
    pub fn variables(self, input: &MutationInput) -> MutationResult<Value> {
        let mut variables = Map::new();

        if self.is_removal() {
            let selector = input.selector_value().ok_or_else(|| {
                MutationError::User(format!("{} requires a selector or document id", self.prefix()))
            })?;
            variables.insert("selector".to_string(), selector);
            return Ok(Value::Object(variables));
        }

        if self != Self::Create {
            if let Some(selector) = input.selector_value() {
                variables.insert("selector".to_string(), selector);
            }
        }

        let data = input
            .data
            .clone()
            .ok_or_else(|| MutationError::User(format!("{} requires data", self.prefix())))?;
        variables.insert("data".to_string(), data);

        Ok(Value::Object(variables))
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

impl FromStr for MutationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "upsert" => Ok(Self::Upsert),
            "delete" => Ok(Self::Delete),
            _ => Self::from_operation_name(s)
                .ok_or_else(|| format!("unknown mutation '{s}', expected create, update, upsert or delete")),
        }
    }
}

/// Arguments of a mutation call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationInput {
    pub data: Option<Value>,
    pub selector: Option<Value>,
    pub document_id: Option<String>,
}

impl MutationInput {
    pub fn with_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn with_selector(selector: Value) -> Self {
        Self {
            selector: Some(selector),
            ..Self::default()
        }
    }

    pub fn with_document_id(document_id: impl Into<String>) -> Self {
        Self {
            document_id: Some(document_id.into()),
            ..Self::default()
        }
    }

    /// Add a selector to an existing input
    pub fn selector(mut self, selector: Value) -> Self {
        self.selector = Some(selector);
        self
    }

    fn selector_value(&self) -> Option<Value> {
        self.selector
            .clone()
            .or_else(|| self.document_id.as_ref().map(|id| json!({ "documentId": id })))
    }
}

/// A built mutation document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationDocument {
    /// `None` for custom mutations
    pub kind: Option<MutationKind>,
    pub operation_name: String,
    pub text: String,
    pub fragment_name: Option<String>,
}

impl MutationDocument {
    /// SHA-256 of the document text, hex encoded (persisted query id)
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for MutationDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn build_collection_mutation(kind: MutationKind, type_name: &str, fragment: &Fragment) -> MutationDocument {
    let operation_name = kind.operation_name(type_name);
    let data_input = format!("{}{}DataInput!", kind.input_prefix(), type_name);
    let selector_input = format!("{type_name}SelectorUniqueInput");

    let (declarations, arguments) = match kind {
        MutationKind::Create => (format!("$data: {data_input}"), "data: $data".to_string()),
        MutationKind::Update | MutationKind::Upsert => (
            format!("$selector: {selector_input}, $data: {data_input}"),
            "selector: $selector, data: $data".to_string(),
        ),
        MutationKind::Delete => (
            format!("$selector: {selector_input}!"),
            "selector: $selector".to_string(),
        ),
    };

    let text = format!(
        "mutation {operation_name}({declarations}) {{\n  {operation_name}({arguments}) {{\n    data {{\n      ...{fragment_name}\n    }}\n    __typename\n  }}\n}}\n{fragment_text}\n",
        fragment_name = fragment.name(),
        fragment_text = fragment.text(),
    );

    MutationDocument {
        kind: Some(kind),
        operation_name,
        text,
        fragment_name: Some(fragment.name().to_string()),
    }
}

/// `createFoo(data: CreateFooDataInput!)`
pub fn build_create_query(type_name: &str, fragment: &Fragment) -> MutationDocument {
    build_collection_mutation(MutationKind::Create, type_name, fragment)
}

/// `updateFoo(selector: FooSelectorUniqueInput, data: UpdateFooDataInput!)`
pub fn build_update_query(type_name: &str, fragment: &Fragment) -> MutationDocument {
    build_collection_mutation(MutationKind::Update, type_name, fragment)
}

/// `upsertFoo(selector: FooSelectorUniqueInput, data: UpsertFooDataInput!)`
pub fn build_upsert_query(type_name: &str, fragment: &Fragment) -> MutationDocument {
    build_collection_mutation(MutationKind::Upsert, type_name, fragment)
}

/// `deleteFoo(selector: FooSelectorUniqueInput!)`
pub fn build_delete_query(type_name: &str, fragment: &Fragment) -> MutationDocument {
    build_collection_mutation(MutationKind::Delete, type_name, fragment)
}

/// Build the document for `kind`
pub fn build_query(kind: MutationKind, type_name: &str, fragment: &Fragment) -> MutationDocument {
    build_collection_mutation(kind, type_name, fragment)
}

/// Build a free-form mutation
///
/// `args` maps argument names to GraphQL types. With a fragment name the
/// result is selected through `...fragmentName`; the fragment itself is only
/// looked up when the request is sent.
pub fn build_custom_mutation(
    name: &str,
    args: &[(String, String)],
    fragment_name: Option<&str>,
) -> MutationDocument {
    let (declarations, arguments) = if args.is_empty() {
        (String::new(), String::new())
    } else {
        let declarations = args
            .iter()
            .map(|(arg, ty)| format!("${arg}: {ty}"))
            .collect::<Vec<_>>()
            .join(", ");
        let arguments = args
            .iter()
            .map(|(arg, _)| format!("{arg}: ${arg}"))
            .collect::<Vec<_>>()
            .join(", ");
        (format!("({declarations})"), format!("({arguments})"))
    };

    let selection = match fragment_name {
        Some(fragment) => format!(" {{\n    ...{fragment}\n  }}"),
        None => String::new(),
    };

    MutationDocument {
        kind: None,
        operation_name: name.to_string(),
        text: format!("mutation {name}{declarations} {{\n  {name}{arguments}{selection}\n}}\n"),
        fragment_name: fragment_name.map(str::to_string),
    }
}
