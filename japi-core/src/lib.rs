//! Core types for a JSON:API-compliant resource layer.
//!
//! This crate provides:
//!
//! - **Schema declarations** ([`schema`]) - Attribute and relationship
//!   declarations per resource type, plus the naming strategy
//! - **Adapter abstraction** ([`adapter`]) - The storage contract backends
//!   implement, with generic one-hop sideloading
//! - **Query construction** ([`query`]) - Filter terms, sort keys, sparse
//!   fieldsets, and pagination for `find` calls
//! - **Models** ([`model`]) - Per-type façades over a shared adapter,
//!   built once into an immutable registry
//! - **Resources** ([`resource`]) - Resolved record views, relationship
//!   mutation, and JSON:API document serialization
//! - **Relationships** ([`relationship`]) - Lazy, memoized resolution of
//!   related resources
//! - **Records** ([`record`]) - The raw flat-record type and id coercion
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use japi_core::model::Models;
//! use japi_core::schema::{Schema, AttrType};
//! use serde_json::json;
//!
//! let models = Models::builder()
//!     .register(
//!         Schema::builder("person")
//!             .attribute("name", AttrType::String)
//!             .has_many("pets", "animal")
//!             .build(),
//!     )
//!     .register(Schema::builder("animal").attribute("name", AttrType::String).build())
//!     .build(adapter)?;
//!
//! let people = models.model("person")?;
//! let alice = people.create(json!({"name": "Alice"}).as_object().unwrap().clone()).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as japi_core;

pub mod adapter;
pub mod error;
pub mod model;
pub mod query;
pub mod record;
pub mod relationship;
pub mod resource;
pub mod schema;
