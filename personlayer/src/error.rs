//! Repository-level error taxonomy.
//!
//! Store errors are folded into four kinds callers can act on. Every repository
//! operation surfaces at most one of these and never retries.

use thiserror::Error;

use personlayer_core::error::DocumentStoreError;

use crate::{config::ConfigError, person::ValidationError};

#[derive(Error, Debug)]
pub enum PersonError {
    /// The store connection could not be established or was lost.
    #[error("Connection error: {0}")]
    Connection(String),
    /// Input failed the Person contract before reaching the store.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A lookup that required a match found nothing.
    #[error("Person not found: {0}")]
    NotFound(String),
    /// Any other backend failure.
    #[error("Store error: {0}")]
    Store(String),
}

pub type PersonResult<T> = Result<T, PersonError>;

impl From<DocumentStoreError> for PersonError {
    fn from(err: DocumentStoreError) -> Self {
        match err {
            DocumentStoreError::Connection(message) => PersonError::Connection(message),
            DocumentStoreError::DocumentNotFound(id, _) => PersonError::NotFound(id),
            other => PersonError::Store(other.to_string()),
        }
    }
}

impl From<ConfigError> for PersonError {
    fn from(err: ConfigError) -> Self {
        PersonError::Connection(err.to_string())
    }
}
