//! In-memory document storage backend for personlayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is the test double
//! for everything built on the access layer.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Full pipeline support** - Filtering, multi-key sorting, skip/limit and projection
//! - **Atomic single-document updates** - `find_one_and_update` runs under one write lock
//!
//! # Quick Start
//!
//! ```ignore
//! use personlayer::{memory::InMemoryStore, PersonDraft, PersonRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repository = PersonRepository::new(InMemoryStore::new());
//!
//!     let person = repository
//!         .create_one(PersonDraft::new("Alice").with_age(30))
//!         .await?;
//!
//!     println!("stored {}", person.id);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as personlayer_memory;

pub mod store;
pub(crate) mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
