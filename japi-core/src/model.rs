//! Per-type model façades and the model registry.
//!
//! [`Models`] is the immutable registry built once from a set of schemas and
//! an adapter; each [`Model`] is a cheap, cloneable per-type façade binding
//! its schema to the shared adapter. Models reach sibling models (relationship
//! targets) through a weak reference back to the registry, so target models
//! are borrowed, never owned, and cyclic schemas cannot leak.
//!
//! # Example
//!
//! ```ignore
//! use japi_core::model::Models;
//! use japi_core::schema::{Schema, AttrType};
//!
//! let models = Models::builder()
//!     .register(
//!         Schema::builder("person")
//!             .attribute("name", AttrType::String)
//!             .has_many("pets", "animal")
//!             .build(),
//!     )
//!     .register(Schema::builder("animal").attribute("name", AttrType::String).build())
//!     .build(MemoryStore::new())?;
//!
//! let people = models.model("person")?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::adapter::Adapter;
use crate::error::{Error, Result};
use crate::query::FindOptions;
use crate::record::Record;
use crate::relationship::{Relationship, RelationshipChild};
use crate::resource::{RelatedLink, Resource, ResourceArray};
use crate::schema::{Multiplicity, Naming, Schema};

struct Registry {
    models: HashMap<String, Model>,
    naming: Naming,
    adapter: Arc<dyn Adapter>,
}

/// The immutable model registry.
///
/// Holds one [`Model`] per registered schema, the shared storage adapter, and
/// the process-wide naming strategy.
pub struct Models {
    inner: Arc<Registry>,
}

impl Models {
    /// Creates a registry builder.
    pub fn builder() -> ModelsBuilder {
        ModelsBuilder {
            schemas: Vec::new(),
        }
    }

    /// Returns the model registered for a type name.
    pub fn model(&self, type_name: &str) -> Result<Model> {
        self.inner
            .models
            .get(type_name)
            .cloned()
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))
    }

    /// Returns the shared naming strategy.
    pub fn naming(&self) -> &Naming {
        &self.inner.naming
    }

    /// Returns the shared storage adapter.
    pub fn adapter(&self) -> Arc<dyn Adapter> {
        Arc::clone(&self.inner.adapter)
    }

    /// Connects the underlying adapter.
    pub async fn connect(&self) -> Result<()> {
        self.inner.adapter.connect().await
    }

    /// Disconnects the underlying adapter.
    pub async fn disconnect(&self) -> Result<()> {
        self.inner.adapter.disconnect().await
    }
}

impl fmt::Debug for Models {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Models")
            .field("types", &self.inner.models.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder collecting schemas before the registry is sealed.
#[derive(Debug, Default)]
pub struct ModelsBuilder {
    schemas: Vec<Schema>,
}

impl ModelsBuilder {
    /// Registers one resource schema. Registering the same type name twice
    /// replaces the earlier declaration.
    pub fn register(mut self, schema: Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Seals the registry over the given adapter.
    ///
    /// Every relationship target must itself be registered; a dangling target
    /// rejects with [`Error::UnknownType`]. Plural collection names are
    /// computed here, once, for the registry's lifetime.
    pub fn build<A: Adapter + 'static>(self, adapter: A) -> Result<Models> {
        let registered: Vec<String> = self
            .schemas
            .iter()
            .map(|s| s.type_name().to_string())
            .collect();
        for schema in &self.schemas {
            for def in schema.relationships().values() {
                if !registered.contains(&def.target) {
                    return Err(Error::UnknownType(def.target.clone()));
                }
            }
        }

        let naming = Naming::new(registered.iter().map(String::as_str));
        let adapter: Arc<dyn Adapter> = Arc::new(adapter);
        let schemas = self.schemas;

        let inner = Arc::new_cyclic(|weak: &Weak<Registry>| {
            let models = schemas
                .into_iter()
                .map(|schema| {
                    let type_name = schema.type_name().to_string();
                    let model = Model {
                        inner: Arc::new(ModelInner {
                            schema,
                            registry: weak.clone(),
                        }),
                    };
                    (type_name, model)
                })
                .collect();
            Registry {
                models,
                naming,
                adapter,
            }
        });

        tracing::debug!(
            types = inner.models.len(),
            "model registry sealed"
        );
        Ok(Models { inner })
    }
}

struct ModelInner {
    schema: Schema,
    registry: Weak<Registry>,
}

/// Per-resource-type façade binding a schema to the shared adapter.
///
/// Cloning a model is cheap (reference count); clones share state.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

/// The result of [`Model::find_related`]: a to-one related resource or a
/// to-many relationship collection.
#[derive(Debug)]
pub enum Related {
    /// The to-one related resource, or `None` when the relationship is empty.
    One(Option<Resource>),
    /// The to-many relationship collection, carrying `related` link metadata.
    Many(ResourceArray),
}

impl Model {
    fn registry(&self) -> Result<Arc<Registry>> {
        self.inner.registry.upgrade().ok_or(Error::Detached)
    }

    fn adapter(&self) -> Result<Arc<dyn Adapter>> {
        Ok(Arc::clone(&self.registry()?.adapter))
    }

    /// Returns the (singular) resource type name.
    pub fn type_name(&self) -> &str {
        self.inner.schema.type_name()
    }

    /// Returns the model's schema.
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Returns the plural collection name for this type.
    pub fn plural(&self) -> Result<String> {
        Ok(self
            .registry()?
            .naming
            .plural(self.type_name())
            .to_string())
    }

    /// Returns the plural collection name for any registered type.
    pub fn plural_of(&self, type_name: &str) -> Result<String> {
        Ok(self.registry()?.naming.plural(type_name).to_string())
    }

    /// Returns the model a relationship field targets.
    pub fn related_model(&self, field: &str) -> Result<Model> {
        let def = self
            .inner
            .schema
            .relationship(field)
            .ok_or_else(|| Error::UnknownField {
                type_name: self.type_name().to_string(),
                field: field.to_string(),
            })?;
        self.registry()?
            .models
            .get(&def.target)
            .cloned()
            .ok_or_else(|| Error::UnknownType(def.target.clone()))
    }

    /// Finds resources matching the options.
    ///
    /// The returned array's `count` is the pre-pagination match total.
    pub async fn find(&self, options: FindOptions) -> Result<ResourceArray> {
        let page = self.adapter()?.find(self, options).await?;
        let resources = page
            .records
            .into_iter()
            .map(|record| Resource::from_record(self, record))
            .collect::<Result<Vec<_>>>()?;
        Ok(ResourceArray::new(self, resources, page.count))
    }

    /// Finds the first resource matching the options, if any.
    pub async fn find_one(&self, options: FindOptions) -> Result<Option<Resource>> {
        Ok(self
            .find(options)
            .await?
            .into_resources()
            .into_iter()
            .next())
    }

    /// Finds one resource by id, rejecting with `NotFound` on a miss.
    pub async fn find_resource(&self, id: u64) -> Result<Resource> {
        let record = self.adapter()?.find_record(self, id).await?;
        Resource::from_record(self, record)
    }

    /// Finds the resource(s) a parent's relationship points at.
    ///
    /// The raw relationship field may hold raw id(s) or embedded
    /// (pre-resolved) record(s); both shapes are honored. For to-many
    /// relationships the options' filter/sort/page apply within the
    /// relationship's id set, and the result carries `related` metadata so
    /// its `self` link names the relationship-collection endpoint.
    pub async fn find_related(
        &self,
        id: u64,
        field: &str,
        options: FindOptions,
    ) -> Result<Related> {
        let adapter = self.adapter()?;
        let mut parents = adapter.retrieve(self, Some(vec![id])).await?;
        let parent = parents.pop().ok_or_else(|| Error::NotFound {
            type_name: self.type_name().to_string(),
            id,
        })?;

        let def = self
            .inner
            .schema
            .relationship(field)
            .ok_or_else(|| Error::UnknownField {
                type_name: self.type_name().to_string(),
                field: field.to_string(),
            })?;
        let target = self.related_model(field)?;

        // Decode the raw field the same way resource loading does, so
        // embedded records survive instead of degrading to empty results.
        let mut rel = Relationship::from_value(field, def, parent.get(field), &target)?;

        match def.multiplicity {
            Multiplicity::One => {
                rel.resolve(&target).await?;
                match rel.take_child() {
                    RelationshipChild::ResolvedOne(resource) => Ok(Related::One(Some(*resource))),
                    _ => Ok(Related::One(None)),
                }
            }
            Multiplicity::Many => {
                let array = match rel.take_child() {
                    RelationshipChild::ResolvedMany(resources) => resources,
                    child => {
                        let mut options = options;
                        options.ids = Some(child.ids());
                        target.find(options).await?
                    }
                };
                Ok(Related::Many(array.with_related(RelatedLink {
                    type_name: self.type_name().to_string(),
                    id,
                    field: field.to_string(),
                })))
            }
        }
    }

    /// Persists a new record and returns it as a resource.
    pub async fn create(&self, data: Record) -> Result<Resource> {
        let record = self.adapter()?.create(self, data).await?;
        Resource::from_record(self, record)
    }

    /// Shallow-merges a patch onto an existing record and returns the result.
    pub async fn update(&self, id: u64, patch: Record) -> Result<Resource> {
        let record = self.adapter()?.update(self, id, patch).await?;
        Resource::from_record(self, record)
    }

    /// Deletes a record, returning `true` on success.
    pub async fn delete(&self, id: u64) -> Result<bool> {
        self.adapter()?.delete(self, id).await
    }

    /// Returns raw (unpopulated) records, all of the type when `ids` is
    /// `None`.
    pub async fn retrieve(&self, ids: Option<Vec<u64>>) -> Result<Vec<Record>> {
        self.adapter()?.retrieve(self, ids).await
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Model").field(&self.type_name()).finish()
    }
}
