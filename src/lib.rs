//! Vulcan mutations
//!
//! Builds single-document GraphQL mutations for Vulcan-style collections and
//! keeps every cached list query of a collection consistent after a mutation,
//! without refetching.

pub mod cache;
pub mod cli;
pub mod collection;
pub mod config;
pub mod document;
pub mod error;
pub mod fragment;
pub mod mutation;
pub mod query;
pub mod selector;
pub mod transport;
pub mod ui;

pub use error::{MutationError, MutationResult};
