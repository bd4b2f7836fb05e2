use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Bson, Document, Uuid, doc};
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions, ReturnDocument},
};
use personlayer_core::{
    backend::{RemovalSummary, StoreBackend, StoreBackendBuilder},
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query},
    update::Update,
};

use crate::query::{
    MONGO_ID_FIELD, filter_document, ids_filter, projection_document, sort_document, update_document,
};


fn backend_error(err: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    /// Moves the layer's `id` into MongoDB's `_id`.
    fn prepare_document(&self, id: Uuid, document: Document) -> Document {
        std::iter::once((MONGO_ID_FIELD.to_string(), Bson::from(id)))
            .chain(
                document
                    .into_iter()
                    .filter(|(k, _)| k != ID_FIELD && k != MONGO_ID_FIELD),
            )
            .collect()
    }

    /// Moves MongoDB's `_id` back into the layer's `id`.
    fn restore_document(&self, document: Document) -> Document {
        let mut restored = Document::new();
        let mut rest = Document::new();

        for (key, value) in document {
            if key == MONGO_ID_FIELD {
                restored.insert(ID_FIELD, value);
            } else {
                rest.insert(key, value);
            }
        }

        restored.extend(rest);
        restored
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(&self, documents: Vec<Document>, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let ids = documents.iter().map(|_| Uuid::new()).collect::<Vec<_>>();
        let prepared = ids
            .iter()
            .zip(documents)
            .map(|(id, doc)| self.prepare_document(*id, doc))
            .collect::<Vec<_>>();

        let target = self.get_collection(collection);

        if let Err(err) = target.insert_many(prepared.iter()).await {
            // Ordered inserts keep every document before the failing one
            if let Err(cleanup) = target.delete_many(ids_filter(&ids)).await {
                tracing::warn!(collection, error = %cleanup, "could not roll back partial insert");
            }

            return Err(backend_error(err));
        }

        tracing::debug!(collection, count = prepared.len(), "inserted documents");

        Ok(prepared
            .into_iter()
            .map(|doc| self.restore_document(doc))
            .collect())
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let mut options = FindOptions::default();

        if !query.sort.is_empty() {
            options.sort = Some(sort_document(&query.sort));
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        if let Some(limit) = query.max_results() {
            options.limit = Some(limit as i64);
        }
        if let Some(projection) = &query.projection {
            options.projection = Some(projection_document(projection));
        }

        let results = self.get_collection(collection)
            .find(filter_document(query.filter.as_ref())?)
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?;

        tracing::debug!(collection, count = results.len(), "queried documents");

        Ok(results
            .into_iter()
            .map(|doc| self.restore_document(doc))
            .collect())
    }

    async fn find_one(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<Option<Document>> {
        Ok(self.get_collection(collection)
            .find_one(filter_document(filter.as_ref())?)
            .await
            .map_err(backend_error)?
            .map(|doc| self.restore_document(doc)))
    }

    async fn get_document(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Document>> {
        Ok(self.get_collection(collection)
            .find_one(doc! { MONGO_ID_FIELD: id })
            .await
            .map_err(backend_error)?
            .map(|doc| self.restore_document(doc)))
    }

    async fn replace_document(&self, id: Uuid, document: Document, collection: &str) -> DocumentStoreResult<Option<Document>> {
        let replaced = self.get_collection(collection)
            .find_one_and_replace(doc! { MONGO_ID_FIELD: id }, self.prepare_document(id, document))
            .return_document(ReturnDocument::After)
            .await
            .map_err(backend_error)?;

        if replaced.is_none() {
            tracing::warn!(collection, %id, "replace target is missing");
        }

        Ok(replaced.map(|doc| self.restore_document(doc)))
    }

    async fn find_one_and_update(&self, filter: Expr, update: Update, collection: &str) -> DocumentStoreResult<Option<Document>> {
        Ok(self.get_collection(collection)
            .find_one_and_update(filter_document(Some(&filter))?, update_document(&update)?)
            .return_document(ReturnDocument::After)
            .await
            .map_err(backend_error)?
            .map(|doc| self.restore_document(doc)))
    }

    async fn remove_document(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Document>> {
        let removed = self.get_collection(collection)
            .find_one_and_delete(doc! { MONGO_ID_FIELD: id })
            .await
            .map_err(backend_error)?;

        if removed.is_none() {
            tracing::warn!(collection, %id, "remove target is missing");
        }

        Ok(removed.map(|doc| self.restore_document(doc)))
    }

    async fn remove_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<RemovalSummary> {
        let result = self.get_collection(collection)
            .delete_many(filter_document(filter.as_ref())?)
            .await
            .map_err(backend_error)?;

        tracing::debug!(collection, deleted_count = result.deleted_count, "removed documents");

        Ok(RemovalSummary { deleted_count: result.deleted_count })
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| DocumentStoreError::Connection(e.to_string()))?;

        let client = Client::with_options(options)
            .map_err(|e| DocumentStoreError::Connection(e.to_string()))?;

        // The driver connects lazily; ping so a bad URI fails here rather than on first use
        client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DocumentStoreError::Connection(e.to_string()))?;

        tracing::debug!(database = %self.database, "connected to mongodb");

        Ok(MongoDbStore::new(client, self.database))
    }
}
