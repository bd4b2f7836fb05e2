//! The Person entity and its validation rule.
//!
//! [`Person`] is what the store hands back; [`PersonDraft`] is what callers create
//! from, since the identifier is always assigned by the store. Validation is a plain
//! function over the data so it can run before any store call.

use bson::Uuid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use personlayer_core::document::Document;

/// Collection holding Person documents.
pub const PEOPLE_COLLECTION: &str = "people";

/// Field names as stored.
pub mod fields {
    pub const NAME: &str = "name";
    pub const AGE: &str = "age";
    pub const FAVORITE_FOODS: &str = "favoriteFoods";
}

/// Reasons a Person is rejected before it reaches the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Validation error: name is required and must not be empty")]
    EmptyName,
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    Ok(())
}

/// A persisted Person.
///
/// `age` is omitted from the stored document when absent, and also when a query
/// projected it away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

impl Person {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)
    }
}

impl Document for Person {
    fn id(&self) -> &Uuid {
        &self.id
    }

    fn collection_name() -> &'static str {
        PEOPLE_COLLECTION
    }
}

/// A Person that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

impl PersonDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age: None,
            favorite_foods: Vec::new(),
        }
    }

    pub fn with_age(mut self, age: i32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_favorite_foods<I, S>(mut self, foods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.favorite_foods = foods.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)
    }
}
