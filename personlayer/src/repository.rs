//! The public CRUD and query surface for Person documents.
//!
//! Each operation validates its input, issues one or more store primitives and
//! returns a [`Completion`] that resolves exactly once. Multi-step operations stop at
//! the first failure. Nothing is retried and nothing is logged here; surfacing errors
//! is the caller's job.
//!
//! # Concurrency
//!
//! Calls are independent requests against a shared backend and may complete in any
//! order. [`PersonRepository::update_via_load_modify_save`] reads and then writes in
//! two separate round trips with no isolation between them: a concurrent writer that
//! changes the same document in between has its change overwritten. Use
//! [`PersonRepository::update_via_find_one_and_update`] when that matters.

use bson::Uuid;

use personlayer_core::{
    backend::{RemovalSummary, StoreBackend},
    collection::TypedCollection,
    query::{Filter, Projection, SortDirection},
    store::DocumentStore,
    update::Update,
};

use crate::{
    completion::Completion,
    error::{PersonError, PersonResult},
    person::{Person, PersonDraft, fields},
};

/// Food appended by [`PersonRepository::update_via_load_modify_save`].
pub const DEFAULT_FOOD_TO_ADD: &str = "hamburger";
/// Age conventionally set through [`PersonRepository::update_via_find_one_and_update`].
pub const DEFAULT_AGE_TO_SET: i32 = 20;
/// Name removed by [`PersonRepository::delete_many_default`].
pub const DEFAULT_NAME_TO_REMOVE: &str = "Mary";
/// Food searched by [`PersonRepository::query_chain`].
pub const DEFAULT_FOOD_TO_SEARCH: &str = "burritos";
/// Result cap of the query chain.
pub const QUERY_CHAIN_LIMIT: usize = 2;

#[derive(Debug)]
pub struct PersonRepository<B: StoreBackend> {
    store: DocumentStore<B>,
}

impl<B: StoreBackend> PersonRepository<B> {
    pub fn new(backend: B) -> Self {
        Self::from_store(DocumentStore::new(backend))
    }

    pub fn from_store(store: DocumentStore<B>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DocumentStore<B> {
        &self.store
    }

    /// Releases the underlying connection.
    pub async fn shutdown(self) -> PersonResult<()> {
        Ok(self.store.shutdown().await?)
    }

    fn people(&self) -> TypedCollection<'_, B, Person> {
        self.store.typed_collection::<Person>()
    }

    /// Stores one Person and returns it with its assigned id.
    ///
    /// Fails with [`PersonError::Validation`] before touching the store if the name is empty.
    pub fn create_one(&self, draft: PersonDraft) -> Completion<'_, Person> {
        Completion::new(async move {
            draft.validate()?;

            self.people()
                .insert(vec![draft])
                .await?
                .pop()
                .ok_or_else(|| PersonError::Store("insert returned no document".to_string()))
        })
    }

    /// Stores a batch of Persons and returns them in input order.
    ///
    /// The batch is validated as a whole first; one invalid draft fails the call
    /// and nothing is stored.
    pub fn create_many(&self, drafts: Vec<PersonDraft>) -> Completion<'_, Vec<Person>> {
        Completion::new(async move {
            for draft in &drafts {
                draft.validate()?;
            }

            let expected = drafts.len();
            let stored = self.people().insert(drafts).await?;

            if stored.len() != expected {
                return Err(PersonError::Store(format!(
                    "insert stored {} of {expected} documents",
                    stored.len()
                )));
            }

            Ok(stored)
        })
    }

    /// All Persons whose name matches exactly. Possibly empty.
    pub fn find_by_name(&self, name: impl Into<String>) -> Completion<'_, Vec<Person>> {
        let name = name.into();

        Completion::new(async move {
            Ok(self
                .people()
                .find(Some(Filter::eq(fields::NAME, name)))
                .execute()
                .await?)
        })
    }

    /// The first Person (in store order) whose favorite foods include `food`.
    ///
    /// Resolves to `None` when nobody matches; that is not an error.
    pub fn find_one_by_food(&self, food: impl Into<String>) -> Completion<'_, Option<Person>> {
        let food = food.into();

        Completion::new(async move {
            Ok(self
                .people()
                .find_one(Some(Filter::eq(fields::FAVORITE_FOODS, food)))
                .await?)
        })
    }

    pub fn find_by_id(&self, id: Uuid) -> Completion<'_, Person> {
        Completion::new(async move {
            self.people()
                .get(id)
                .await?
                .ok_or_else(|| PersonError::NotFound(id.to_string()))
        })
    }

    /// Appends `food` to a Person's favorites by loading, editing and saving.
    ///
    /// Two round trips, not atomic. If the load fails or finds nothing, the save is
    /// never attempted. If the document disappears between load and save, the call
    /// fails with [`PersonError::NotFound`].
    pub fn add_favorite_food(&self, id: Uuid, food: impl Into<String>) -> Completion<'_, Person> {
        let food = food.into();

        Completion::new(async move {
            let people = self.people();

            let mut person = people
                .get(id)
                .await?
                .ok_or_else(|| PersonError::NotFound(id.to_string()))?;

            person.favorite_foods.push(food);
            person.validate()?;

            people
                .replace(&person)
                .await?
                .ok_or_else(|| PersonError::NotFound(id.to_string()))
        })
    }

    /// Appends `"hamburger"` to a Person's favorites via load-modify-save.
    ///
    /// See [`PersonRepository::add_favorite_food`] for the consistency caveats.
    pub fn update_via_load_modify_save(&self, id: Uuid) -> Completion<'_, Person> {
        self.add_favorite_food(id, DEFAULT_FOOD_TO_ADD)
    }

    /// Atomically sets the age of the first Person named `name` and returns the
    /// updated document.
    pub fn update_via_find_one_and_update(&self, name: impl Into<String>, age: i32) -> Completion<'_, Person> {
        let name = name.into();

        Completion::new(async move {
            self.people()
                .find_one_and_update(
                    Filter::eq(fields::NAME, name.as_str()),
                    Update::new().set(fields::AGE, age),
                )
                .await?
                .ok_or(PersonError::NotFound(name))
        })
    }

    /// Removes a Person and returns it as it was before removal.
    pub fn delete_by_id(&self, id: Uuid) -> Completion<'_, Person> {
        Completion::new(async move {
            self.people()
                .remove(id)
                .await?
                .ok_or_else(|| PersonError::NotFound(id.to_string()))
        })
    }

    /// Removes every Person named `name`. Zero matches is a success.
    pub fn delete_many(&self, name: impl Into<String>) -> Completion<'_, RemovalSummary> {
        let name = name.into();

        Completion::new(async move {
            Ok(self
                .people()
                .remove_many(Some(Filter::eq(fields::NAME, name)))
                .await?)
        })
    }

    /// Removes every Person named `"Mary"`.
    pub fn delete_many_default(&self) -> Completion<'_, RemovalSummary> {
        self.delete_many(DEFAULT_NAME_TO_REMOVE)
    }

    /// Persons who like `food`, sorted by name ascending, at most two, without their age.
    pub fn query_chain_for(&self, food: impl Into<String>) -> Completion<'_, Vec<Person>> {
        let food = food.into();

        Completion::new(async move {
            Ok(self
                .people()
                .find(Some(Filter::eq(fields::FAVORITE_FOODS, food)))
                .sort(fields::NAME, SortDirection::Asc)
                .limit(QUERY_CHAIN_LIMIT)
                .select(Projection::exclude([fields::AGE]))
                .execute()
                .await?)
        })
    }

    /// [`PersonRepository::query_chain_for`] with `"burritos"`.
    pub fn query_chain(&self) -> Completion<'_, Vec<Person>> {
        self.query_chain_for(DEFAULT_FOOD_TO_SEARCH)
    }
}
