//! Error and result types for resource-layer operations.
//!
//! All fallible operations in this workspace return [`Result<T>`]. Adapter and
//! model calls reject through their returned future; they do not panic on the
//! I/O path.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::schema::Multiplicity;

/// Represents all errors that can surface from the adapter, model, and
/// resource layers.
#[derive(Error, Debug)]
pub enum Error {
    /// No record exists for the requested type and id.
    #[error("resource not found: {type_name}/{id}")]
    NotFound {
        /// The resource type that was queried.
        type_name: String,
        /// The id that did not match any record.
        id: u64,
    },
    /// A relationship operation received a target whose arity does not match
    /// what the operation requires.
    #[error("{operation} expected a to-{expected} target but got to-{actual}")]
    Relationship {
        /// The mutation that was attempted (`set`, `append`, `remove`, `load`).
        operation: &'static str,
        /// The arity the operation requires.
        expected: Multiplicity,
        /// The arity that was supplied or declared.
        actual: Multiplicity,
    },
    /// A relationship names a resource type that was never registered.
    #[error("unknown resource type: {0}")]
    UnknownType(String),
    /// An operation names a field that is not a declared relationship.
    #[error("no relationship named {field} on type {type_name}")]
    UnknownField {
        /// The owning resource type.
        type_name: String,
        /// The undeclared field name.
        field: String,
    },
    /// A record could not be decoded into a resource.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// A model outlived the registry it was built from.
    #[error("model is detached from its registry")]
    Detached,
    /// An error surfaced by the underlying storage adapter.
    #[error("adapter error: {0}")]
    Adapter(String),
}

/// A specialized `Result` type for resource-layer operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<SerdeJsonError> for Error {
    fn from(err: SerdeJsonError) -> Self {
        Error::Serialization(err.to_string())
    }
}
