//! In-memory storage implementation for document stores.
//!
//! This module provides a simple backend that keeps documents as BSON in
//! insertion order behind an async-safe read-write lock.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, Uuid};

use personlayer_core::{
    backend::{RemovalSummary, StoreBackend, StoreBackendBuilder},
    document::ID_FIELD,
    error::DocumentStoreResult,
    query::{Expr, Query},
    update::Update,
};

use crate::evaluator::{DocumentEvaluator, apply_update, compare_documents, project};

/// Documents of one collection in natural (insertion) order.
type CollectionDocs = Vec<Document>;
type StoreMap = HashMap<String, CollectionDocs>;

fn position_of(documents: &[Document], id: Uuid) -> Option<usize> {
    let key = Bson::from(id);

    documents
        .iter()
        .position(|doc| doc.get(ID_FIELD) == Some(&key))
}

/// Thread-safe in-memory document storage backend.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// Every primitive runs under a single lock acquisition, so `find_one_and_update`,
/// `remove_document` and `remove_documents` are atomic with respect to other calls.
/// A read followed by a separate `replace_document` is not.
///
/// # Performance
///
/// Queries scan all documents in a collection (no indexing). That is fine for tests
/// and development; use a real database for anything else.
///
/// # Example
///
/// ```ignore
/// use personlayer_memory::InMemoryStore;
/// use personlayer_core::backend::StoreBackend;
/// use bson::doc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::new();
///
///     let stored = store
///         .insert_documents(vec![doc! { "name": "Alice", "age": 30 }], "people")
///         .await?;
///     assert!(stored[0].contains_key("id"));
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Returns the number of documents currently held in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(&self, documents: Vec<Document>, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let stored = documents
            .into_iter()
            .map(|mut doc| {
                doc.insert(ID_FIELD, Uuid::new());
                doc
            })
            .collect::<Vec<_>>();

        self.store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .extend(stored.iter().cloned());

        tracing::debug!(collection, count = stored.len(), "inserted documents");

        Ok(stored)
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut matched = Vec::new();
        for doc in documents {
            if DocumentEvaluator::matches(doc, query.filter.as_ref())? {
                matched.push(doc.clone());
            }
        }

        // Stable, so ties keep natural order
        if !query.sort.is_empty() {
            matched.sort_by(|a, b| compare_documents(a, b, &query.sort));
        }

        let results = matched
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.max_results().unwrap_or(usize::MAX))
            .map(|doc| project(doc, query.projection.as_ref()))
            .collect::<Vec<_>>();

        tracing::debug!(collection, count = results.len(), "queried documents");

        Ok(results)
    }

    async fn find_one(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<Option<Document>> {
        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(None);
        };

        for doc in documents {
            if DocumentEvaluator::matches(doc, filter.as_ref())? {
                return Ok(Some(doc.clone()));
            }
        }

        Ok(None)
    }

    async fn get_document(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Document>> {
        let store = self.store.read().await;

        Ok(store
            .get(collection)
            .and_then(|documents| position_of(documents, id).map(|index| documents[index].clone())))
    }

    async fn replace_document(&self, id: Uuid, document: Document, collection: &str) -> DocumentStoreResult<Option<Document>> {
        let mut store = self.store.write().await;
        let Some(documents) = store.get_mut(collection) else {
            return Ok(None);
        };

        let Some(index) = position_of(documents, id) else {
            tracing::warn!(collection, %id, "replace target is missing");
            return Ok(None);
        };

        let mut replacement = document;
        replacement.insert(ID_FIELD, id);
        documents[index] = replacement.clone();

        Ok(Some(replacement))
    }

    async fn find_one_and_update(&self, filter: Expr, update: Update, collection: &str) -> DocumentStoreResult<Option<Document>> {
        let mut store = self.store.write().await;
        let Some(documents) = store.get_mut(collection) else {
            return Ok(None);
        };

        for doc in documents.iter_mut() {
            if DocumentEvaluator::matches(doc, Some(&filter))? {
                apply_update(doc, &update)?;
                return Ok(Some(doc.clone()));
            }
        }

        Ok(None)
    }

    async fn remove_document(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Document>> {
        let mut store = self.store.write().await;
        let Some(documents) = store.get_mut(collection) else {
            return Ok(None);
        };

        match position_of(documents, id) {
            Some(index) => Ok(Some(documents.remove(index))),
            None => {
                tracing::warn!(collection, %id, "remove target is missing");
                Ok(None)
            }
        }
    }

    async fn remove_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<RemovalSummary> {
        let mut store = self.store.write().await;
        let Some(documents) = store.get_mut(collection) else {
            return Ok(RemovalSummary::default());
        };

        // Evaluate everything first so an evaluation error removes nothing
        let mut keep = Vec::with_capacity(documents.len());
        for doc in documents.iter() {
            keep.push(!DocumentEvaluator::matches(doc, filter.as_ref())?);
        }

        let before = documents.len();
        let mut flags = keep.into_iter();
        documents.retain(|_| flags.next().unwrap_or(true));
        let deleted_count = (before - documents.len()) as u64;

        tracing::debug!(collection, deleted_count, "removed documents");

        Ok(RemovalSummary { deleted_count })
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance. This always succeeds.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
