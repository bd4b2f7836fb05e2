//! Persistence access layer for Person records in a document store.
//!
//! This crate is the entry point of the personlayer project. It defines the
//! [`Person`] entity, the [`PersonRepository`] with its CRUD and query operations,
//! and the [`completion`] contract every operation reports its outcome through.
//! Storage itself is delegated to a [`backend::StoreBackend`]: the in-memory
//! backend is always available, MongoDB behind the `mongodb` feature.
//!
//! # Features
//!
//! - **Validated entity** - Names are checked before anything reaches the store
//! - **Single-shot outcomes** - Every operation resolves exactly once, to a value or one error
//! - **Lazy query chain** - Filter, sort, limit and projection are composed first and run on `execute`
//! - **Two update styles** - Load-modify-save and atomic find-one-and-update
//!
//! # Quick Start
//!
//! ```ignore
//! use personlayer::{memory::InMemoryStore, prelude::*};
//!
//! #[tokio::main]
//! async fn main() -> PersonResult<()> {
//!     let repository = PersonRepository::new(InMemoryStore::new());
//!
//!     repository
//!         .create_many(vec![
//!             PersonDraft::new("Ann").with_age(31).with_favorite_foods(["burritos"]),
//!             PersonDraft::new("Bob").with_favorite_foods(["burritos", "sushi"]),
//!         ])
//!         .await?;
//!
//!     // At most two burrito fans, sorted by name, without their age
//!     let fans = repository.query_chain().await?;
//!     assert!(fans.iter().all(|person| person.age.is_none()));
//!
//!     repository.shutdown().await
//! }
//! ```
//!
//! # Connecting to MongoDB
//!
//! With the `mongodb` feature, [`config::StoreConfig`] reads `MONGO_URI` (and the
//! optional `MONGO_DATABASE`) from the environment or a `.env` file and opens a
//! repository over a live server:
//!
//! ```ignore
//! use personlayer::{config::StoreConfig, prelude::*};
//!
//! #[tokio::main]
//! async fn main() -> PersonResult<()> {
//!     let repository = StoreConfig::from_env()?.connect().await?;
//!
//!     repository
//!         .find_by_name("Mary")
//!         .on_complete(|outcome| match outcome {
//!             Ok(people) => println!("found {}", people.len()),
//!             Err(err) => eprintln!("{err}"),
//!         })
//!         .await;
//!
//!     repository.shutdown().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-process storage for development and testing
//! - `mongodb` - MongoDB backend (requires the `mongodb` feature)

pub mod completion;
pub mod config;
pub mod error;
pub mod person;
pub mod prelude;
pub mod repository;

pub use personlayer_core::{backend, collection, document, query, store, update};

pub use bson;

pub use error::{PersonError, PersonResult};
pub use person::{Person, PersonDraft};
pub use repository::PersonRepository;

/// In-memory storage backend.
pub mod memory {
    pub use personlayer_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use personlayer_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
