//! Storage backend abstraction for the document store.
//!
//! This module defines the narrow contract the access layer needs from a document
//! database. Backends receive and return uninterpreted BSON documents; typing and
//! validation happen above this layer.
//!
//! # Overview
//!
//! The [`StoreBackend`] trait provides a unified async interface for the store
//! primitives: insert, find (with a compiled query pipeline), find-one, find-by-id,
//! replace, find-one-and-update, find-by-id-and-remove and remove-many.
//! Implementations are required to be thread-safe (`Send + Sync`) and support
//! concurrent access. Document-level atomicity is the backend's responsibility.
//!
//! # Identifiers
//!
//! Documents are inserted without an identifier. The backend assigns a fresh
//! [`Uuid`] to each one and stores it under [`ID_FIELD`](crate::document::ID_FIELD);
//! every document a backend returns carries that field.
//!
//! # Examples
//!
//! ```ignore
//! use personlayer_core::backend::StoreBackend;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//!
//! let stored = backend
//!     .insert_documents(vec![doc! { "name": "Alice", "age": 30 }], "people")
//!     .await?;
//! let id = stored[0].get_binary_generic("id")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Document, Uuid};
use std::fmt::Debug;

use crate::{error::DocumentStoreResult, query::{Expr, Query}, update::Update};

/// Outcome of a bulk removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalSummary {
    /// Number of documents removed. Zero when nothing matched.
    pub deleted_count: u64,
}

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. There is no ordering guarantee between concurrently issued calls.
///
/// # Error Handling
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult).
/// A lookup that matches nothing is not an error at this layer: it is reported as
/// `Ok(None)` (or an empty vector / zero count) and the caller decides whether that
/// is a failure.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection, assigning each a fresh identifier.
    ///
    /// The batch is all-or-nothing: if any document cannot be stored, none are.
    /// Any identifier already present in an input document is replaced.
    ///
    /// # Arguments
    ///
    /// * `documents` - The documents to insert, without identifiers
    /// * `collection` - The name of the collection to insert into. Created automatically if it doesn't exist.
    ///
    /// # Returns
    ///
    /// The stored documents, identifiers included, in input order.
    async fn insert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Executes a compiled query pipeline in a single request.
    ///
    /// The pipeline is evaluated as filter, sort, skip, limit, then projection,
    /// regardless of how the query was assembled.
    ///
    /// # Arguments
    ///
    /// * `query` - The [`Query`] object specifying filters, sorts, limits, offsets and projection
    /// * `collection` - The name of the collection to query
    ///
    /// # Returns
    ///
    /// The matching documents, shaped by the query's projection. A missing collection
    /// yields an empty vector.
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Returns the first document matching `filter` in the store's natural order.
    ///
    /// A `None` filter matches every document.
    async fn find_one(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Retrieves a single document by its identifier.
    async fn get_document(
        &self,
        id: Uuid,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Replaces the stored content of an existing document.
    ///
    /// The identifier of the stored document is kept. This is a plain write: it offers
    /// no protection against a concurrent writer that modified the document since the
    /// caller last read it.
    ///
    /// # Returns
    ///
    /// The document as stored, or `None` if no document with `id` exists any more.
    async fn replace_document(
        &self,
        id: Uuid,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Atomically applies `update` to the first document matching `filter`.
    ///
    /// # Returns
    ///
    /// The document after the update was applied, or `None` if nothing matched.
    async fn find_one_and_update(
        &self,
        filter: Expr,
        update: Update,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Removes a document by its identifier.
    ///
    /// # Returns
    ///
    /// The document as it was before removal, or `None` if it was not present.
    async fn remove_document(
        &self,
        id: Uuid,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Removes every document matching `filter`.
    ///
    /// Matching nothing is a success with a `deleted_count` of zero.
    async fn remove_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<RemovalSummary>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op, but backends with external
    /// connections should override this.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Factory for backend instances. Building is where the connection is established,
/// so failures surface as [`DocumentStoreError::Connection`](crate::error::DocumentStoreError::Connection).
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
