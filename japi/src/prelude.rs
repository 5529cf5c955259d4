//! Convenient re-exports of commonly used types from japi.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use japi::prelude::*;
//! ```
//!
//! This provides access to:
//! - Schema declaration and the model registry
//! - Adapter traits and builders
//! - Query construction and filtering
//! - Resources, relationships, and serialization
//! - Error types

pub use japi_core::{
    adapter::{Adapter, AdapterBuilder, RecordPage},
    error::{Error, Result},
    model::{Model, Models, ModelsBuilder, Related},
    query::{FilterOp, FilterTerm, FindOptions, FindOptionsBuilder, Page, Sort, SortDirection},
    record::Record,
    relationship::{Relationship, RelationshipChild},
    resource::{Fetched, RelatedTarget, Resource, ResourceArray, SerializeOptions},
    schema::{AttrType, Multiplicity, RelationshipDef, Schema, SchemaBuilder},
};
