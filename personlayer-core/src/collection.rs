//! Typed collection handle and the lazy `find` chain.
//!
//! A [`TypedCollection`] binds a document type to a backend and turns typed
//! requests into store primitives. Multi-stage reads go through [`Find`], which
//! only records stages until [`Find::execute`] sends the whole pipeline at once.
//!
//! # Example
//!
//! ```ignore
//! # async fn example(store: &personlayer_core::store::DocumentStore<impl personlayer_core::backend::StoreBackend>) -> personlayer_core::error::DocumentStoreResult<()> {
//! let people = store.typed_collection::<Person>();
//!
//! let two_burrito_fans = people
//!     .find(Some(Filter::eq("favoriteFoods", "burritos")))
//!     .sort("name", SortDirection::Asc)
//!     .limit(2)
//!     .select(Projection::exclude(["age"]))
//!     .execute()
//!     .await?;
//! # Ok(()) }
//! ```

use bson::Uuid;
use serde::Serialize;
use std::marker::PhantomData;

use crate::{
    backend::{RemovalSummary, StoreBackend},
    document::{Document, DocumentExt, to_document},
    error::DocumentStoreResult,
    query::{Expr, Projection, QueryBuilder, SortDirection, Stage},
    update::Update,
};

/// A type-safe view of one collection.
#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend, D: Document> {
    name: String,
    backend: &'a B,
    _marker: PhantomData<D>,
}

impl<'a, B: StoreBackend, D: Document> TypedCollection<'a, B, D> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { name, backend, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts new documents and returns them as stored, in input order.
    ///
    /// `drafts` are any serializable values shaped like `D` without an identifier;
    /// the backend assigns one to each.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if serialization or insertion fails.
    pub async fn insert<N>(&self, drafts: Vec<N>) -> DocumentStoreResult<Vec<D>>
    where
        N: Serialize + Send + Sync,
    {
        let documents = drafts
            .iter()
            .map(to_document)
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        self.backend
            .insert_documents(documents, self.name())
            .await?
            .into_iter()
            .map(D::from_document)
            .collect()
    }

    /// Starts a lazy query chain. `None` matches every document.
    ///
    /// No store interaction happens until [`Find::execute`] is awaited.
    pub fn find(&self, filter: Option<Expr>) -> Find<'a, B, D> {
        let builder = match filter {
            Some(expr) => QueryBuilder::new().filter(expr),
            None => QueryBuilder::new(),
        };

        Find {
            name: self.name.clone(),
            backend: self.backend,
            builder,
            _marker: PhantomData,
        }
    }

    /// Returns the first document matching `filter` in the store's natural order.
    pub async fn find_one(&self, filter: Option<Expr>) -> DocumentStoreResult<Option<D>> {
        self.backend
            .find_one(filter, self.name())
            .await?
            .map(D::from_document)
            .transpose()
    }

    /// Retrieves a document by its identifier.
    pub async fn get(&self, id: Uuid) -> DocumentStoreResult<Option<D>> {
        self.backend
            .get_document(id, self.name())
            .await?
            .map(D::from_document)
            .transpose()
    }

    /// Writes the full content of `document` over the stored copy with the same identifier.
    ///
    /// Returns `None` if that document no longer exists.
    pub async fn replace(&self, document: &D) -> DocumentStoreResult<Option<D>> {
        self.backend
            .replace_document(*document.id(), document.to_document()?, self.name())
            .await?
            .map(D::from_document)
            .transpose()
    }

    /// Atomically updates the first document matching `filter` and returns its new state.
    pub async fn find_one_and_update(
        &self,
        filter: Expr,
        update: Update,
    ) -> DocumentStoreResult<Option<D>> {
        self.backend
            .find_one_and_update(filter, update, self.name())
            .await?
            .map(D::from_document)
            .transpose()
    }

    /// Removes a document by identifier and returns the removed snapshot.
    pub async fn remove(&self, id: Uuid) -> DocumentStoreResult<Option<D>> {
        self.backend
            .remove_document(id, self.name())
            .await?
            .map(D::from_document)
            .transpose()
    }

    /// Removes every document matching `filter`.
    pub async fn remove_many(&self, filter: Option<Expr>) -> DocumentStoreResult<RemovalSummary> {
        self.backend
            .remove_documents(filter, self.name())
            .await
    }
}

/// A deferred `find` against one collection.
///
/// Stage methods consume the chain and return it with one more stage recorded.
/// The chain is `Clone`, so a partially built read can be forked.
#[derive(Debug)]
pub struct Find<'a, B: StoreBackend, D: Document> {
    name: String,
    backend: &'a B,
    builder: QueryBuilder,
    _marker: PhantomData<D>,
}

impl<'a, B: StoreBackend, D: Document> Clone for Find<'a, B, D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            backend: self.backend,
            builder: self.builder.clone(),
            _marker: PhantomData,
        }
    }
}

impl<'a, B: StoreBackend, D: Document> Find<'a, B, D> {
    /// Narrows the result with an additional filter.
    pub fn filter(self, expr: Expr) -> Self {
        self.stage(|builder| builder.filter(expr))
    }

    pub fn sort(self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.stage(|builder| builder.sort(field, direction))
    }

    pub fn skip(self, offset: usize) -> Self {
        self.stage(|builder| builder.skip(offset))
    }

    /// Caps the result count. Zero means unbounded.
    pub fn limit(self, limit: usize) -> Self {
        self.stage(|builder| builder.limit(limit))
    }

    /// Shapes each result document. The identifier is always kept.
    ///
    /// Results are still deserialized as `D`, so a projection may only drop fields
    /// that `D` can do without (`Option` or `#[serde(default)]` fields). Dropping a
    /// required field makes [`Find::execute`] fail with
    /// [`DocumentStoreError::Serialization`](crate::error::DocumentStoreError::Serialization).
    pub fn select(self, projection: Projection) -> Self {
        self.stage(|builder| builder.select(projection))
    }

    /// Returns the stages recorded so far, in call order.
    pub fn stages(&self) -> &[Stage] {
        self.builder.stages()
    }

    /// Compiles the recorded stages and sends them to the store as one request.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`](crate::error::DocumentStoreError::InvalidQuery)
    /// without contacting the store if the stages conflict, or any error the backend reports.
    pub async fn execute(self) -> DocumentStoreResult<Vec<D>> {
        let query = self.builder.build()?;

        tracing::trace!(collection = %self.name, ?query, "executing query");

        self.backend
            .query_documents(query, &self.name)
            .await?
            .into_iter()
            .map(D::from_document)
            .collect()
    }

    fn stage(self, apply: impl FnOnce(QueryBuilder) -> QueryBuilder) -> Self {
        Self {
            name: self.name,
            backend: self.backend,
            builder: apply(self.builder),
            _marker: PhantomData,
        }
    }
}
