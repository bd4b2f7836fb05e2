//! Core of the personlayer project: a thin, typed access layer over a document store.
//!
//! This crate provides:
//!
//! - **Document traits** ([`document`]) - Core traits for typed documents and BSON conversion
//! - **Store backend contract** ([`backend`]) - The primitives a document database must offer
//! - **Query pipeline** ([`query`]) - Filter expressions, sort, limit and projection stages
//! - **Updates** ([`update`]) - Field-level modifications applied atomically by a backend
//! - **Collections interface** ([`collection`]) - Typed collection handle and the lazy `find` chain
//! - **Document store** ([`store`]) - Explicit store handle owning a backend connection
//! - **Error handling** ([`error`]) - Store-level error and result types
//!
//! # Example
//!
//! ```ignore
//! use personlayer_core::document::Document;
//! use bson::Uuid;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Pet {
//!     pub id: Uuid,
//!     pub name: String,
//! }
//!
//! impl Document for Pet {
//!     fn id(&self) -> &Uuid {
//!         &self.id
//!     }
//!
//!     fn collection_name() -> &'static str {
//!         "pets"
//!     }
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as personlayer_core;

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod query;
pub mod store;
pub mod update;
