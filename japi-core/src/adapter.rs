//! Storage adapter abstraction.
//!
//! The [`Adapter`] trait is the persistence contract the model layer depends
//! on. Any storage backend, in-memory or external, implements it; models only
//! ever reach storage through `Arc<dyn Adapter>`.
//!
//! # Sideloading
//!
//! `find`, `find_record`, `create`, and `update` return *sideloaded* records:
//! every relationship field present on the record has its raw id(s) replaced
//! with the embedded related record(s), exactly one hop deep. Relationship
//! fields of the embedded records stay raw ids; the bound keeps response
//! trees finite on cyclic schemas. The generic [`Adapter::populate`] provided
//! method implements this in terms of [`Adapter::retrieve`], so backends get
//! sideloading for free.
//!
//! # Error handling
//!
//! Operations return [`Result`](crate::error::Result) and reject through the
//! future; they never panic for storage failures. `find_record`, `update`,
//! and `delete` reject with [`Error::NotFound`](crate::error::Error::NotFound)
//! when no record matches the requested id.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

use crate::error::{Error, Result};
use crate::model::Model;
use crate::query::FindOptions;
use crate::record::{coerce_id, coerce_ids, Record};
use crate::schema::Multiplicity;

/// One page of matching records.
///
/// `count` is the total number of matches before pagination, so
/// `count >= records.len()` always holds.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    /// The (possibly truncated) matching records.
    pub records: Vec<Record>,
    /// Total matches before pagination was applied.
    pub count: usize,
}

/// The persistence-layer contract implemented by storage backends.
#[async_trait]
pub trait Adapter: Send + Sync + Debug {
    /// Establishes the backend connection. In-memory backends may no-op.
    async fn connect(&self) -> Result<()>;

    /// Releases the backend connection.
    async fn disconnect(&self) -> Result<()>;

    /// Filters, sorts, paginates, projects, and sideloads records of the
    /// model's type.
    ///
    /// The pipeline is: id filter, declared filter, count, pagination, sort,
    /// field projection, then one-hop sideloading of each surviving record.
    /// The returned page's `count` reflects the pre-pagination match total.
    async fn find(&self, model: &Model, options: FindOptions) -> Result<RecordPage>;

    /// Returns raw (unpopulated) records matching the id set, or every record
    /// of the type when `ids` is `None`. Results follow the requested id
    /// order; missing ids are omitted, not errors.
    async fn retrieve(&self, model: &Model, ids: Option<Vec<u64>>) -> Result<Vec<Record>>;

    /// Returns one sideloaded record by id.
    async fn find_record(&self, model: &Model, id: u64) -> Result<Record> {
        let mut records = self.retrieve(model, Some(vec![id])).await?;
        match records.pop() {
            Some(record) => self.populate(model, record).await,
            None => Err(Error::NotFound {
                type_name: model.type_name().to_string(),
                id,
            }),
        }
    }

    /// Persists a new record, assigning it a fresh id, and returns the
    /// sideloaded result.
    ///
    /// Ids are assigned from a per-type monotonic counter and never recycled
    /// within a process lifetime, including after deletes.
    async fn create(&self, model: &Model, data: Record) -> Result<Record>;

    /// Shallow-merges a patch onto the existing record and returns the
    /// sideloaded result. Patch fields fully replace same-named fields.
    async fn update(&self, model: &Model, id: u64, patch: Record) -> Result<Record>;

    /// Removes the record, returning `true` on success.
    async fn delete(&self, model: &Model, id: u64) -> Result<bool>;

    /// Replaces raw relationship ids on a record with the embedded related
    /// records, one hop deep, through each relationship's target model.
    ///
    /// Fields absent from the record are skipped; values that are already
    /// embedded objects (or otherwise not coercible ids) are left untouched.
    async fn populate(&self, model: &Model, mut record: Record) -> Result<Record> {
        for (name, def) in model.schema().relationships() {
            let Some(value) = record.get(name) else {
                continue;
            };
            let target = model.related_model(name)?;
            let replacement = match def.multiplicity {
                Multiplicity::One => {
                    let Some(id) = coerce_id(value) else {
                        continue;
                    };
                    self.retrieve(&target, Some(vec![id]))
                        .await?
                        .pop()
                        .map(Value::Object)
                        .unwrap_or(Value::Null)
                }
                Multiplicity::Many => {
                    let Some(items) = value.as_array() else {
                        continue;
                    };
                    let ids = coerce_ids(value);
                    if ids.is_empty() && !items.is_empty() {
                        // Already embedded objects.
                        continue;
                    }
                    let related = self.retrieve(&target, Some(ids)).await?;
                    Value::Array(related.into_iter().map(Value::Object).collect())
                }
            };
            record.insert(name.clone(), replacement);
        }
        Ok(record)
    }
}

/// Factory trait for constructing adapter instances.
#[async_trait]
pub trait AdapterBuilder {
    /// The adapter type this builder produces.
    type Adapter: Adapter;

    /// Builds and returns a new adapter instance.
    async fn build(self) -> Result<Self::Adapter>;
}
