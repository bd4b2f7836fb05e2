//! MongoDB backend implementation for personlayer.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! The query pipeline is handed to the server in one `find` call, with the filter
//! translated to a query document and sort, skip, limit and projection passed as
//! find options.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! personlayer = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Identifiers
//!
//! The layer's `id` field is stored as MongoDB's `_id` (a UUID binary) and mapped
//! back on every read.
//!
//! # Example
//!
//! ```ignore
//! use personlayer::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "people")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as personlayer_mongodb;

pub mod store;
pub(crate) mod query;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
