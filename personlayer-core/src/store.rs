//! Document store handle wrapping a backend connection.
//!
//! The store is an explicit value: whoever needs store access is handed one,
//! there is no process-wide connection.
//!
//! # Example
//!
//! ```ignore
//! use personlayer_core::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend);
//! let people = store.typed_collection::<Person>();
//! ```

use crate::{
    backend::StoreBackend,
    collection::TypedCollection,
    document::Document,
    error::DocumentStoreResult,
};

/// A document store bound to a specific backend implementation.
///
/// The backend is shared read-only by everything that borrows from the store;
/// the store never reconfigures it after construction.
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Gets a typed collection for the specified document type.
    ///
    /// The collection name is determined by the document type's `collection_name()` method.
    pub fn typed_collection<'a, D: Document>(&'a self) -> TypedCollection<'a, B, D> {
        TypedCollection::new(D::collection_name().to_string(), &self.backend)
    }

    /// Returns a reference to the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Consumes the store and shuts down the backend.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}
