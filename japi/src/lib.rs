//! Main japi crate providing a unified interface for JSON:API resource graphs.
//!
//! This crate is the primary entry point for users of the japi framework.
//! It re-exports the core types and functionality from various sub-crates and
//! provides convenient access to storage adapters.
//!
//! # Features
//!
//! - **Schema-driven resources** - Declare attributes and relationships once; the
//!   registry enforces them on every operation
//! - **Pluggable storage** - An `Adapter` trait with an in-memory implementation,
//!   extensible to any backend
//! - **Flexible querying** - Filters, multi-key sorting, sparse fieldsets, and
//!   pagination with independent total counts
//! - **JSON:API documents** - Resources serialize to compliant documents with
//!   links, relationship objects, and deduplicated compound documents
//!
//! # Quick Start
//!
//! ```ignore
//! use japi::{prelude::*, memory::MemoryStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Register resource types against an in-memory adapter
//!     let models = Models::builder()
//!         .register(
//!             Schema::builder("person")
//!                 .attribute("name", AttrType::String)
//!                 .has_many("pets", "pet")
//!                 .build(),
//!         )
//!         .register(
//!             Schema::builder("pet")
//!                 .attribute("name", AttrType::String)
//!                 .build(),
//!         )
//!         .build(MemoryStore::new())
//!         .unwrap();
//!
//!     let people = models.model("person").unwrap();
//!     let person = people
//!         .create(json!({"name": "Alice"}).as_object().unwrap().clone())
//!         .await
//!         .unwrap();
//!
//!     // Query with filters and serialize to a JSON:API document
//!     let results = people
//!         .find(FindOptions::builder().filter("name", FilterTerm::Eq(json!("Alice"))).build())
//!         .await
//!         .unwrap();
//!     let document = results.serialize(&SerializeOptions::default()).unwrap();
//!
//!     println!("{document}");
//!     let _ = person;
//! }
//! ```
//!
//! # Adapters
//!
//! - [`memory`] - Fast in-memory storage for development and testing

pub mod prelude;

pub use japi_core::{adapter, error, model, query, record, relationship, resource, schema};

/// In-memory storage adapter implementations.
pub mod memory {
    pub use japi_memory::{MemoryStore, MemoryStoreBuilder};
}
