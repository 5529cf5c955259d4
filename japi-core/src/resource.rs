//! Resolved resource views and JSON:API serialization.
//!
//! A [`Resource`] is the typed view of one record for one model: its id, its
//! declared attributes, and a [`Relationship`] handle per declared
//! relationship. A [`ResourceArray`] is an ordered collection of resources
//! plus the pre-pagination match count.
//!
//! Both views are private per-request objects: they never mutate storage
//! directly; every mutation persists through the owning model.
//!
//! # Serialization
//!
//! [`Resource::serialize`] and [`ResourceArray::serialize`] produce
//! JSON:API-shaped `serde_json::Value` trees ready for wire transmission:
//! string ids, plural type names, `links` built from the registry's naming
//! strategy, and an `included` section of compound documents deduplicated by
//! type and id. Compound documents embed the related resource's attributes
//! and an ids-only relationships summary; nesting is bounded to exactly one
//! hop so cyclic schemas cannot produce unbounded response graphs.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};
use crate::model::Model;
use crate::query::FindOptions;
use crate::record::{record_id, Record};
use crate::relationship::{Relationship, RelationshipChild};
use crate::schema::Multiplicity;

/// Options for serializing resources into JSON:API documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerializeOptions {
    /// Optional URL prefix for every generated link (e.g. `"/api"`).
    pub namespace: Option<String>,
}

impl SerializeOptions {
    fn prefix(&self) -> &str {
        self.namespace
            .as_deref()
            .map(|ns| ns.trim_end_matches('/'))
            .unwrap_or("")
    }
}

/// The value behind [`Resource::get`]: either an attribute or a (resolved)
/// relationship child.
#[derive(Debug)]
pub enum Fetched<'a> {
    /// A declared attribute's raw value.
    Attribute(&'a Value),
    /// A relationship child, resolved by the call when necessary.
    Relationship(&'a RelationshipChild),
}

/// The resolved, typed view of one persisted record.
#[derive(Debug)]
pub struct Resource {
    model: Model,
    id: u64,
    attributes: Record,
    relationships: BTreeMap<String, Relationship>,
}

impl Resource {
    /// Builds a resource from a (raw or sideloaded) record.
    ///
    /// Attributes are restricted to declared attribute fields present in the
    /// record; every declared relationship gets a handle, `Empty` when the
    /// field is absent.
    pub(crate) fn from_record(model: &Model, record: Record) -> Result<Resource> {
        let id = record_id(&record).ok_or_else(|| {
            Error::Serialization(format!(
                "record of type {} has no usable id",
                model.type_name()
            ))
        })?;

        let mut attributes = Record::new();
        for name in model.schema().attributes().keys() {
            if let Some(value) = record.get(name) {
                attributes.insert(name.clone(), value.clone());
            }
        }

        let mut relationships = BTreeMap::new();
        for (name, def) in model.schema().relationships() {
            let target = model.related_model(name)?;
            relationships.insert(
                name.clone(),
                Relationship::from_value(name, def, record.get(name), &target)?,
            );
        }

        Ok(Resource {
            model: model.clone(),
            id,
            attributes,
            relationships,
        })
    }

    /// Returns the resource's numeric id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the resource's (singular) type name.
    pub fn type_name(&self) -> &str {
        self.model.type_name()
    }

    /// Returns the owning model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Returns the declared attributes present on the record.
    pub fn attributes(&self) -> &Record {
        &self.attributes
    }

    /// Returns an attribute value, or `None` if the field is not a declared
    /// attribute present on the record.
    pub fn attribute(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    /// Returns a relationship handle without resolving it.
    pub fn relationship(&self, field: &str) -> Option<&Relationship> {
        self.relationships.get(field)
    }

    /// Fetches a field: an attribute value, or a relationship resolved
    /// on demand.
    ///
    /// Relationship resolution is lazy and memoized: an already-resolved (or
    /// empty) child returns with no I/O, and a successful fetch is cached on
    /// the relationship instance. A fetch failure propagates the adapter's
    /// error and leaves the child unresolved, permitting retry. Fields
    /// matching neither attributes nor relationships yield `None`.
    pub async fn get(&mut self, field: &str) -> Result<Option<Fetched<'_>>> {
        if self.attributes.contains_key(field) {
            return Ok(Some(Fetched::Attribute(&self.attributes[field])));
        }
        if self.relationships.contains_key(field) {
            let target = self.model.related_model(field)?;
            let rel = self
                .relationships
                .get_mut(field)
                .expect("checked membership above");
            rel.resolve(&target).await?;
            return Ok(Some(Fetched::Relationship(rel.child())));
        }
        Ok(None)
    }

    /// Replaces a relationship's child and persists the new id(s) through the
    /// owning model.
    ///
    /// The target's arity must match the declared multiplicity; a mismatch is
    /// rejected with [`Error::Relationship`], never silently coerced. Raw ids
    /// are fetched through the target model so the in-memory child is
    /// resolved before persisting.
    pub async fn set_related(&mut self, field: &str, target: RelatedTarget) -> Result<()> {
        let def = self.relationship_def(field)?;
        if target.multiplicity() != def.1 {
            return Err(Error::Relationship {
                operation: "set",
                expected: def.1,
                actual: target.multiplicity(),
            });
        }
        let target_model = self.model.related_model(field)?;

        let (child, persisted) = match target {
            RelatedTarget::Id(id) => {
                let resource = target_model.find_resource(id).await?;
                (RelationshipChild::ResolvedOne(Box::new(resource)), json!(id))
            }
            RelatedTarget::One(resource) => {
                let id = resource.id();
                (RelationshipChild::ResolvedOne(Box::new(resource)), json!(id))
            }
            RelatedTarget::Ids(ids) => {
                let resources = target_model.find(FindOptions::with_ids(ids.clone())).await?;
                (RelationshipChild::ResolvedMany(resources), json!(ids))
            }
            RelatedTarget::Many(resources) => {
                let ids: Vec<u64> = resources.iter().map(Resource::id).collect();
                (RelationshipChild::ResolvedMany(resources), json!(ids))
            }
        };

        self.persist(field, persisted).await?;
        self.relationships
            .get_mut(field)
            .expect("declared relationship")
            .set_child(child);
        Ok(())
    }

    /// Merges new member(s) into a to-many relationship and persists the
    /// union of ids.
    ///
    /// Only legal on to-many relationships. Already-present ids are kept
    /// once; member order is existing-first.
    pub async fn append_related(&mut self, field: &str, target: RelatedTarget) -> Result<()> {
        let def = self.relationship_def(field)?;
        if def.1 != Multiplicity::Many {
            return Err(Error::Relationship {
                operation: "append",
                expected: Multiplicity::Many,
                actual: Multiplicity::One,
            });
        }

        let mut ids = self
            .relationships
            .get(field)
            .expect("declared relationship")
            .ids();
        for id in target.ids() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        // Persist before touching the in-memory child; a rejected update
        // must leave the view matching the store.
        self.persist(field, json!(ids)).await?;

        let rel = self
            .relationships
            .get_mut(field)
            .expect("declared relationship");
        // Keep the resolved cache when the new members arrive resolved;
        // otherwise fall back to lazy re-resolution of the union.
        let child = match (rel.take_child(), target) {
            (RelationshipChild::ResolvedMany(mut existing), RelatedTarget::Many(new)) => {
                let present: Vec<u64> = existing.iter().map(Resource::id).collect();
                for resource in new.into_resources() {
                    if !present.contains(&resource.id()) {
                        existing.push(resource);
                    }
                }
                RelationshipChild::ResolvedMany(existing)
            }
            (RelationshipChild::ResolvedMany(mut existing), RelatedTarget::One(resource)) => {
                if !existing.iter().any(|r| r.id() == resource.id()) {
                    existing.push(resource);
                }
                RelationshipChild::ResolvedMany(existing)
            }
            _ => RelationshipChild::UnresolvedMany(ids),
        };
        rel.set_child(child);
        Ok(())
    }

    /// Clears a relationship, or removes named members from a to-many
    /// relationship, and persists the result.
    ///
    /// An omitted target clears the relationship: null for to-one, an empty
    /// list for to-many. A specified target removes exactly the named member
    /// ids from a to-many relationship; passing a target to a to-one removal
    /// is rejected with [`Error::Relationship`].
    pub async fn remove_related(
        &mut self,
        field: &str,
        target: Option<RelatedTarget>,
    ) -> Result<()> {
        let def = self.relationship_def(field)?;

        match target {
            None => {
                let persisted = match def.1 {
                    Multiplicity::One => Value::Null,
                    Multiplicity::Many => json!([]),
                };
                self.persist(field, persisted).await?;
                self.relationships
                    .get_mut(field)
                    .expect("declared relationship")
                    .set_child(RelationshipChild::Empty);
                Ok(())
            }
            Some(target) => {
                if def.1 != Multiplicity::Many {
                    return Err(Error::Relationship {
                        operation: "remove",
                        expected: Multiplicity::Many,
                        actual: Multiplicity::One,
                    });
                }
                let removed = target.ids();
                let remaining: Vec<u64> = self
                    .relationships
                    .get(field)
                    .expect("declared relationship")
                    .ids()
                    .into_iter()
                    .filter(|id| !removed.contains(id))
                    .collect();

                // Persist before touching the in-memory child; a rejected
                // update must leave the view matching the store.
                self.persist(field, json!(remaining)).await?;

                let rel = self
                    .relationships
                    .get_mut(field)
                    .expect("declared relationship");
                let child = match rel.take_child() {
                    RelationshipChild::ResolvedMany(resources) => {
                        let kept: Vec<Resource> = resources
                            .into_resources()
                            .into_iter()
                            .filter(|r| !removed.contains(&r.id()))
                            .collect();
                        let count = kept.len();
                        RelationshipChild::ResolvedMany(ResourceArray::new(
                            &self.model.related_model(field)?,
                            kept,
                            count,
                        ))
                    }
                    _ if remaining.is_empty() => RelationshipChild::Empty,
                    _ => RelationshipChild::UnresolvedMany(remaining),
                };
                rel.set_child(child);
                Ok(())
            }
        }
    }

    /// Serializes this resource into a full JSON:API document.
    pub fn serialize(&self, options: &SerializeOptions) -> Result<Value> {
        let mut included = Vec::new();
        let mut seen = HashSet::new();
        let data = self.resource_object(options, &mut included, &mut seen)?;

        let mut doc = Map::new();
        doc.insert(
            "links".to_string(),
            json!({
                "self": format!("{}/{}/{}", options.prefix(), self.model.plural()?, self.id)
            }),
        );
        doc.insert("data".to_string(), data);
        if !included.is_empty() {
            doc.insert("included".to_string(), Value::Array(included));
        }
        Ok(Value::Object(doc))
    }

    /// Emits this resource's resource object, appending deduplicated
    /// compound documents for resolved children to `included`.
    fn resource_object(
        &self,
        options: &SerializeOptions,
        included: &mut Vec<Value>,
        seen: &mut HashSet<(String, u64)>,
    ) -> Result<Value> {
        let plural = self.model.plural()?;
        let mut object = Map::new();
        object.insert("type".to_string(), json!(plural));
        object.insert("id".to_string(), json!(self.id.to_string()));
        object.insert("attributes".to_string(), Value::Object(self.attributes.clone()));

        if !self.relationships.is_empty() {
            let mut rels = Map::new();
            for (name, rel) in &self.relationships {
                rels.insert(
                    name.clone(),
                    self.relationship_object(&plural, name, rel, options, included, seen)?,
                );
            }
            object.insert("relationships".to_string(), Value::Object(rels));
        }

        Ok(Value::Object(object))
    }

    fn relationship_object(
        &self,
        plural: &str,
        name: &str,
        rel: &Relationship,
        options: &SerializeOptions,
        included: &mut Vec<Value>,
        seen: &mut HashSet<(String, u64)>,
    ) -> Result<Value> {
        let links = json!({
            "self": format!("{}/{}/{}/{}", options.prefix(), plural, self.id, name)
        });

        // Unresolved children serialize as absent; only resolved children
        // contribute linkage and compound documents.
        let data = match rel.child() {
            RelationshipChild::Empty
            | RelationshipChild::UnresolvedOne(_)
            | RelationshipChild::UnresolvedMany(_) => match rel.multiplicity() {
                Multiplicity::One => Value::Null,
                Multiplicity::Many => json!([]),
            },
            RelationshipChild::ResolvedOne(child) => {
                push_compound(child, included, seen)?;
                identifier(child)?
            }
            RelationshipChild::ResolvedMany(children) => {
                let mut identifiers = Vec::with_capacity(children.len());
                for child in children.iter() {
                    push_compound(child, included, seen)?;
                    identifiers.push(identifier(child)?);
                }
                Value::Array(identifiers)
            }
        };

        Ok(json!({ "links": links, "data": data }))
    }

    fn relationship_def(&self, field: &str) -> Result<(String, Multiplicity)> {
        self.model
            .schema()
            .relationship(field)
            .map(|def| (def.target.clone(), def.multiplicity))
            .ok_or_else(|| Error::UnknownField {
                type_name: self.model.type_name().to_string(),
                field: field.to_string(),
            })
    }

    async fn persist(&self, field: &str, value: Value) -> Result<()> {
        let mut patch = Record::new();
        patch.insert(field.to_string(), value);
        self.model.update(self.id, patch).await?;
        Ok(())
    }
}

/// A resource identifier object: `{type, id}`.
fn identifier(resource: &Resource) -> Result<Value> {
    Ok(json!({
        "type": resource.model().plural()?,
        "id": resource.id().to_string(),
    }))
}

/// Appends one compound document for `resource`, deduplicated by type+id.
///
/// Compound documents carry attributes verbatim and an ids-only relationships
/// summary; they are never expanded further, bounding compound-document depth
/// to one hop.
fn push_compound(
    resource: &Resource,
    included: &mut Vec<Value>,
    seen: &mut HashSet<(String, u64)>,
) -> Result<()> {
    if !seen.insert((resource.type_name().to_string(), resource.id())) {
        return Ok(());
    }

    let mut object = Map::new();
    object.insert("type".to_string(), json!(resource.model().plural()?));
    object.insert("id".to_string(), json!(resource.id().to_string()));
    object.insert(
        "attributes".to_string(),
        Value::Object(resource.attributes().clone()),
    );

    let schema = resource.model().schema();
    if !schema.relationships().is_empty() {
        let mut rels = Map::new();
        for (name, def) in schema.relationships() {
            let target_plural = resource.model().plural_of(&def.target)?;
            let ids = resource
                .relationship(name)
                .map(Relationship::ids)
                .unwrap_or_default();
            let data = match def.multiplicity {
                Multiplicity::One => ids
                    .first()
                    .map(|id| json!({ "type": target_plural, "id": id.to_string() }))
                    .unwrap_or(Value::Null),
                Multiplicity::Many => Value::Array(
                    ids.iter()
                        .map(|id| json!({ "type": target_plural, "id": id.to_string() }))
                        .collect(),
                ),
            };
            rels.insert(name.clone(), json!({ "data": data }));
        }
        object.insert("relationships".to_string(), Value::Object(rels));
    }

    included.push(Value::Object(object));
    Ok(())
}

/// A relationship-mutation target.
#[derive(Debug)]
pub enum RelatedTarget {
    /// A raw id; fetched through the target model before persisting.
    Id(u64),
    /// Raw ids; fetched through the target model before persisting.
    Ids(Vec<u64>),
    /// An already-resolved resource, assigned directly.
    One(Resource),
    /// Already-resolved resources, assigned directly.
    Many(ResourceArray),
}

impl RelatedTarget {
    fn multiplicity(&self) -> Multiplicity {
        match self {
            RelatedTarget::Id(_) | RelatedTarget::One(_) => Multiplicity::One,
            RelatedTarget::Ids(_) | RelatedTarget::Many(_) => Multiplicity::Many,
        }
    }

    fn ids(&self) -> Vec<u64> {
        match self {
            RelatedTarget::Id(id) => vec![*id],
            RelatedTarget::Ids(ids) => ids.clone(),
            RelatedTarget::One(resource) => vec![resource.id()],
            RelatedTarget::Many(resources) => resources.iter().map(Resource::id).collect(),
        }
    }
}

/// Link metadata for a relationship-collection result.
#[derive(Debug, Clone)]
pub struct RelatedLink {
    /// The parent resource's (singular) type name.
    pub type_name: String,
    /// The parent resource's id.
    pub id: u64,
    /// The relationship field on the parent.
    pub field: String,
}

/// An ordered collection of resources plus match-count metadata.
///
/// `count` is the total number of matches before pagination, so it is always
/// at least `len()`.
#[derive(Debug)]
pub struct ResourceArray {
    model: Model,
    resources: Vec<Resource>,
    count: usize,
    related: Option<RelatedLink>,
}

impl ResourceArray {
    pub(crate) fn new(model: &Model, resources: Vec<Resource>, count: usize) -> Self {
        ResourceArray {
            model: model.clone(),
            resources,
            count,
            related: None,
        }
    }

    pub(crate) fn with_related(mut self, related: RelatedLink) -> Self {
        self.related = Some(related);
        self
    }

    /// Returns the member resources.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Returns the total match count before pagination.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the number of resources in this (possibly truncated) page.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether this page holds no resources.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterates over the member resources.
    pub fn iter(&self) -> std::slice::Iter<'_, Resource> {
        self.resources.iter()
    }

    /// Returns one member by position.
    pub fn get(&self, index: usize) -> Option<&Resource> {
        self.resources.get(index)
    }

    /// Returns a mutable member by position.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Resource> {
        self.resources.get_mut(index)
    }

    pub(crate) fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
        self.count = self.count.max(self.resources.len());
    }

    /// Consumes the array, returning the member resources.
    pub fn into_resources(self) -> Vec<Resource> {
        self.resources
    }

    /// Serializes the collection into a full JSON:API document.
    ///
    /// The `self` link points at the bare collection endpoint, or at the
    /// parent's relationship-collection endpoint when this array was produced
    /// by `find_related`. Compound documents are deduplicated across all
    /// members.
    pub fn serialize(&self, options: &SerializeOptions) -> Result<Value> {
        let self_link = match &self.related {
            Some(related) => format!(
                "{}/{}/{}/{}",
                options.prefix(),
                self.model.plural_of(&related.type_name)?,
                related.id,
                related.field
            ),
            None => format!("{}/{}", options.prefix(), self.model.plural()?),
        };

        let mut included = Vec::new();
        let mut seen = HashSet::new();
        let data = self
            .resources
            .iter()
            .map(|resource| resource.resource_object(options, &mut included, &mut seen))
            .collect::<Result<Vec<_>>>()?;

        let mut doc = Map::new();
        doc.insert("links".to_string(), json!({ "self": self_link }));
        doc.insert("data".to_string(), Value::Array(data));
        if !included.is_empty() {
            doc.insert("included".to_string(), Value::Array(included));
        }
        Ok(Value::Object(doc))
    }
}

impl IntoIterator for ResourceArray {
    type Item = Resource;
    type IntoIter = std::vec::IntoIter<Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResourceArray {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}
