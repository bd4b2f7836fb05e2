//! Convenient re-exports of commonly used types from personlayer.
//!
//! ```ignore
//! use personlayer::prelude::*;
//! ```

pub use crate::{
    completion::{Completer, Completion, Pending, channel},
    config::StoreConfig,
    error::{PersonError, PersonResult},
    person::{Person, PersonDraft, ValidationError},
    repository::PersonRepository,
};

pub use personlayer_core::{
    backend::{RemovalSummary, StoreBackend, StoreBackendBuilder},
    document::{Document, DocumentExt},
    query::{Expr, Filter, Projection, SortDirection},
    store::DocumentStore,
};
