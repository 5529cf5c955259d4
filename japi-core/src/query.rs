//! Query construction for adapter `find` calls.
//!
//! [`FindOptions`] carries an optional id set, a filter specification, sort
//! keys, a sparse fieldset, and pagination. Options are usually built with the
//! fluent API:
//!
//! ```ignore
//! use japi_core::query::{FindOptions, FilterTerm, SortDirection};
//!
//! let options = FindOptions::builder()
//!     .filter("age", FilterTerm::ops([("$lt", 24.into())]))
//!     .sort("name", SortDirection::Asc)
//!     .offset(0)
//!     .limit(10)
//!     .build();
//! ```
//!
//! # Filter terms
//!
//! A filter maps a field name to a [`FilterTerm`], which is one of:
//!
//! - `Eq` — implicit loose (type-coercing) equality against a primitive. The
//!   wire layer may deliver stringified numbers, so `"22"` matches `22`.
//! - `Predicate` — an arbitrary pass/fail function over the field's raw value.
//! - `Ops` — an operator map (`$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$eq`);
//!   every listed operator must pass. Unrecognized operator names compare
//!   with strict equality.
//!
//! The shape of a term is resolved once at construction, never re-inspected
//! per record.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9).
    Asc,
    /// Descending order (Z to A, 9 to 0).
    Desc,
}

/// One sort key: field name plus direction.
///
/// Sort keys cascade in declaration order; the first key is the primary
/// comparator and later keys break ties.
#[derive(Debug, Clone)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Comparison operator inside an operator-map filter term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Membership of the record's value inside the filter array.
    In,
    /// Loose (type-coercing) equality.
    Eq,
    /// Strict equality; the fallback for unrecognized operator names.
    Strict,
}

impl FilterOp {
    /// Parses an operator key from the wire (`"$gt"`, `"$in"`, ...).
    ///
    /// Unknown names map to [`FilterOp::Strict`].
    pub fn parse(name: &str) -> FilterOp {
        match name {
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$in" => FilterOp::In,
            "$eq" => FilterOp::Eq,
            _ => FilterOp::Strict,
        }
    }
}

/// A single field's filter specification.
#[derive(Clone)]
pub enum FilterTerm {
    /// Implicit loose equality against a primitive value.
    Eq(Value),
    /// Custom pass/fail predicate over the field's raw value.
    Predicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
    /// Operator map; all listed operators must pass.
    Ops(Vec<(FilterOp, Value)>),
}

impl FilterTerm {
    /// Builds a term from a wire-shaped JSON value.
    ///
    /// An object whose keys all start with `$` becomes an operator map; any
    /// other value becomes an implicit equality term.
    pub fn from_value(value: Value) -> FilterTerm {
        match value {
            Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => {
                FilterTerm::Ops(
                    map.into_iter()
                        .map(|(name, v)| (FilterOp::parse(&name), v))
                        .collect(),
                )
            }
            other => FilterTerm::Eq(other),
        }
    }

    /// Builds an operator-map term from `(name, value)` pairs.
    pub fn ops<I, S>(pairs: I) -> FilterTerm
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        FilterTerm::Ops(
            pairs
                .into_iter()
                .map(|(name, v)| (FilterOp::parse(name.as_ref()), v))
                .collect(),
        )
    }

    /// Builds a custom predicate term.
    pub fn predicate(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> FilterTerm {
        FilterTerm::Predicate(Arc::new(f))
    }
}

impl fmt::Debug for FilterTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterTerm::Eq(value) => f.debug_tuple("Eq").field(value).finish(),
            FilterTerm::Predicate(_) => f.write_str("Predicate(..)"),
            FilterTerm::Ops(ops) => f.debug_tuple("Ops").field(ops).finish(),
        }
    }
}

/// Pagination window, applied with slice semantics.
///
/// Out-of-bounds offsets or limits yield an empty or truncated page, never an
/// error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    /// Number of records to skip.
    pub offset: Option<usize>,
    /// Maximum number of records to return.
    pub limit: Option<usize>,
}

/// Options for an adapter `find` call.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Restrict matches to this id set (numeric-coerced membership).
    pub ids: Option<Vec<u64>>,
    /// Filter specification; a record passes iff every field entry passes.
    pub filter: BTreeMap<String, FilterTerm>,
    /// Sort keys in priority order.
    pub sort: Vec<Sort>,
    /// Sparse fieldset; `id` is always retained regardless.
    pub fields: Option<Vec<String>>,
    /// Pagination window.
    pub page: Option<Page>,
}

impl FindOptions {
    /// Creates empty options matching every record of the type.
    pub fn new() -> Self {
        FindOptions::default()
    }

    /// Creates options restricted to an id set.
    pub fn with_ids(ids: Vec<u64>) -> Self {
        FindOptions {
            ids: Some(ids),
            ..FindOptions::default()
        }
    }

    /// Creates a builder for fluent construction.
    pub fn builder() -> FindOptionsBuilder {
        FindOptionsBuilder {
            options: FindOptions::default(),
        }
    }
}

/// Fluent builder for [`FindOptions`].
#[derive(Debug, Clone)]
pub struct FindOptionsBuilder {
    options: FindOptions,
}

impl FindOptionsBuilder {
    /// Restricts matches to the given id set.
    pub fn ids(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.options.ids = Some(ids.into_iter().collect());
        self
    }

    /// Adds one field's filter term.
    pub fn filter(mut self, field: impl Into<String>, term: FilterTerm) -> Self {
        self.options.filter.insert(field.into(), term);
        self
    }

    /// Appends a sort key.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.options.sort.push(Sort {
            field: field.into(),
            direction,
        });
        self
    }

    /// Sets the sparse fieldset.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the pagination offset.
    pub fn offset(mut self, offset: usize) -> Self {
        self.options.page.get_or_insert_with(Page::default).offset = Some(offset);
        self
    }

    /// Sets the pagination limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.options.page.get_or_insert_with(Page::default).limit = Some(limit);
        self
    }

    /// Builds and returns the final options.
    pub fn build(self) -> FindOptions {
        self.options
    }
}
