//! Single-document mutations
//!
//! | Module      | Role                                                   |
//! |-------------|--------------------------------------------------------|
//! | `builder`   | create/update/upsert/delete and custom documents       |
//! | `response`  | response envelope normalization and error shaping      |
//! | `updater`   | patches cached list queries after a mutation           |
//! | `operation` | hook-style handles and prop-injecting enhancers        |

pub mod builder;
pub mod operation;
pub mod response;
pub mod updater;

pub use builder::{
    build_create_query, build_custom_mutation, build_delete_query, build_query, build_update_query,
    build_upsert_query, MutationDocument, MutationInput, MutationKind,
};
pub use operation::{
    use_create, use_delete, use_mutation, use_update, use_upsert, with_create, with_delete,
    with_mutation, with_update, with_upsert, MutationClient, MutationEnhancer, MutationHandle,
    MutationOperation, MutationOptions, MutationState, PropValue, Props,
};
pub use response::MutationResponse;
pub use updater::{EntryPatch, MultiQueryUpdater, UpdateReport};
