//! In-memory storage adapter.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mea::rwlock::RwLock;
use serde_json::json;

use japi_core::adapter::{Adapter, AdapterBuilder, RecordPage};
use japi_core::error::{Error, Result};
use japi_core::model::Model;
use japi_core::query::FindOptions;
use japi_core::record::{self, coerce_id, coerce_ids, record_id, Record};
use japi_core::schema::Multiplicity;

use crate::evaluator;

/// Per-type record storage.
///
/// `next_id` only ever grows, so ids are never recycled after a delete and
/// never collide with live records.
#[derive(Debug, Default)]
struct Collection {
    records: Vec<Record>,
    next_id: u64,
}

type TypeMap = HashMap<String, Collection>;

/// A storage adapter backed by per-type in-process collections.
///
/// Records are kept in insertion order; unsorted queries return them in that
/// order, and id-set lookups follow the requested id order. Cloning the
/// store clones the handle, not the data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    store: Arc<RwLock<TypeMap>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Returns a builder for use with a registry.
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::new()
    }
}

/// Rewrites relationship fields to their canonical stored shape.
///
/// Incoming payloads may carry stringified ids; stored records keep numeric
/// ids so id-set lookups and serialization do not re-coerce. Values that are
/// not coercible (embedded objects, null) are left as given.
fn normalize_relationships(model: &Model, record: &mut Record) {
    for (name, def) in model.schema().relationships() {
        let Some(value) = record.get(name) else {
            continue;
        };
        let normalized = match def.multiplicity {
            Multiplicity::One => coerce_id(value).map(|id| json!(id)),
            Multiplicity::Many => value
                .as_array()
                .filter(|items| items.iter().all(|item| coerce_id(item).is_some()))
                .map(|_| json!(coerce_ids(value))),
        };
        if let Some(normalized) = normalized {
            record.insert(name.clone(), normalized);
        }
    }
}

#[async_trait]
impl Adapter for MemoryStore {
    async fn connect(&self) -> Result<()> {
        tracing::debug!("memory store connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        tracing::debug!("memory store disconnected");
        Ok(())
    }

    async fn find(&self, model: &Model, options: FindOptions) -> Result<RecordPage> {
        // Snapshot the matching records so the read guard is released before
        // populate re-enters the store.
        let matched: Vec<Record> = {
            let guard = self.store.read().await;
            match guard.get(model.type_name()) {
                Some(collection) => {
                    // Id-set lookups follow the requested id order, so
                    // relationship member order survives the round trip.
                    let base: Vec<&Record> = match &options.ids {
                        Some(ids) => ids
                            .iter()
                            .filter_map(|id| {
                                collection.records.iter().find(|r| record_id(r) == Some(*id))
                            })
                            .collect(),
                        None => collection.records.iter().collect(),
                    };
                    base.into_iter()
                        .filter(|r| evaluator::matches_filter(r, &options.filter))
                        .cloned()
                        .collect()
                }
                None => Vec::new(),
            }
        };

        // The total count reflects every match, not just the returned page.
        let count = matched.len();
        let mut page = evaluator::paginate(matched, options.page.as_ref());
        evaluator::sort_records(&mut page, &options.sort);
        if let Some(fields) = &options.fields {
            for record in &mut page {
                evaluator::project_fields(record, fields);
            }
        }

        let mut records = Vec::with_capacity(page.len());
        for record in page {
            records.push(self.populate(model, record).await?);
        }
        tracing::debug!(
            r#type = model.type_name(),
            matched = count,
            returned = records.len(),
            "find"
        );
        Ok(RecordPage { records, count })
    }

    async fn retrieve(&self, model: &Model, ids: Option<Vec<u64>>) -> Result<Vec<Record>> {
        let guard = self.store.read().await;
        let Some(collection) = guard.get(model.type_name()) else {
            return Ok(Vec::new());
        };
        let records = match ids {
            None => collection.records.clone(),
            Some(ids) => ids
                .iter()
                .filter_map(|id| {
                    collection.records.iter().find(|r| record_id(r) == Some(*id))
                })
                .cloned()
                .collect(),
        };
        Ok(records)
    }

    async fn create(&self, model: &Model, mut data: Record) -> Result<Record> {
        normalize_relationships(model, &mut data);
        let record = {
            let mut guard = self.store.write().await;
            let collection = guard.entry(model.type_name().to_string()).or_default();
            collection.next_id += 1;
            data.insert("id".to_string(), json!(collection.next_id));
            collection.records.push(data.clone());
            data
        };
        tracing::debug!(
            r#type = model.type_name(),
            id = record_id(&record),
            "create"
        );
        self.populate(model, record).await
    }

    async fn update(&self, model: &Model, id: u64, mut patch: Record) -> Result<Record> {
        normalize_relationships(model, &mut patch);
        let not_found = || Error::NotFound {
            type_name: model.type_name().to_string(),
            id,
        };
        let record = {
            let mut guard = self.store.write().await;
            let collection = guard.get_mut(model.type_name()).ok_or_else(not_found)?;
            let record = collection
                .records
                .iter_mut()
                .find(|r| record_id(r) == Some(id))
                .ok_or_else(not_found)?;
            record::merge(record, patch);
            record.clone()
        };
        tracing::debug!(r#type = model.type_name(), id, "update");
        self.populate(model, record).await
    }

    async fn delete(&self, model: &Model, id: u64) -> Result<bool> {
        let mut guard = self.store.write().await;
        let collection = guard.get_mut(model.type_name()).ok_or_else(|| Error::NotFound {
            type_name: model.type_name().to_string(),
            id,
        })?;
        let index = collection
            .records
            .iter()
            .position(|r| record_id(r) == Some(id))
            .ok_or_else(|| Error::NotFound {
                type_name: model.type_name().to_string(),
                id,
            })?;
        collection.records.remove(index);
        tracing::debug!(r#type = model.type_name(), id, "delete");
        Ok(true)
    }
}

/// Builder for [`MemoryStore`].
#[derive(Debug, Default)]
pub struct MemoryStoreBuilder {
    _private: (),
}

impl MemoryStoreBuilder {
    pub fn new() -> Self {
        MemoryStoreBuilder::default()
    }
}

#[async_trait]
impl AdapterBuilder for MemoryStoreBuilder {
    type Adapter = MemoryStore;

    async fn build(self) -> Result<MemoryStore> {
        Ok(MemoryStore::new())
    }
}
