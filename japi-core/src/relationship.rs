//! Relationship edges between resources.
//!
//! A [`Relationship`] binds a parent [`Resource`](crate::resource::Resource)
//! to its related resource(s). The child side is a small state machine:
//!
//! - `Empty` — null (to-one) or empty list (to-many); nothing to fetch.
//! - `UnresolvedOne` / `UnresolvedMany` — raw id(s) not yet fetched.
//! - `ResolvedOne` / `ResolvedMany` — fetched and cached on the instance.
//!
//! Resolution is memoized: once a child resolves it stays cached until the
//! surrounding resource is discarded, and it is never invalidated by
//! concurrent writes. A failed fetch leaves the state unresolved so the
//! caller may retry.
//!
//! The parent resource exclusively owns its relationship instances; a
//! relationship borrows (never owns) its target model.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::Model;
use crate::query::FindOptions;
use crate::record::coerce_id;
use crate::resource::{Resource, ResourceArray};
use crate::schema::{Multiplicity, RelationshipDef};

/// The child side of a relationship edge.
#[derive(Debug)]
pub enum RelationshipChild {
    /// Absent: null for to-one, empty list for to-many.
    Empty,
    /// A raw id that has not been fetched yet.
    UnresolvedOne(u64),
    /// Raw ids that have not been fetched yet.
    UnresolvedMany(Vec<u64>),
    /// A fetched, cached related resource.
    ResolvedOne(Box<Resource>),
    /// Fetched, cached related resources.
    ResolvedMany(ResourceArray),
}

impl RelationshipChild {
    /// Returns the ids currently referenced, resolved or not.
    pub fn ids(&self) -> Vec<u64> {
        match self {
            RelationshipChild::Empty => Vec::new(),
            RelationshipChild::UnresolvedOne(id) => vec![*id],
            RelationshipChild::UnresolvedMany(ids) => ids.clone(),
            RelationshipChild::ResolvedOne(resource) => vec![resource.id()],
            RelationshipChild::ResolvedMany(resources) => {
                resources.iter().map(Resource::id).collect()
            }
        }
    }

    /// Whether the child no longer needs a fetch.
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            RelationshipChild::Empty
                | RelationshipChild::ResolvedOne(_)
                | RelationshipChild::ResolvedMany(_)
        )
    }
}

/// A mutable edge from a parent resource to related resource(s).
#[derive(Debug)]
pub struct Relationship {
    name: String,
    target: String,
    multiplicity: Multiplicity,
    child: RelationshipChild,
}

impl Relationship {
    /// Decodes a relationship from a raw record field.
    ///
    /// Raw ids become unresolved children; embedded records (the output of
    /// sideloading) become resolved children; null or a missing field becomes
    /// `Empty`. A value whose arity contradicts the declared multiplicity is
    /// a contract error, not silently coerced.
    pub(crate) fn from_value(
        name: &str,
        def: &RelationshipDef,
        value: Option<&Value>,
        target_model: &Model,
    ) -> Result<Relationship> {
        let child = match value {
            None | Some(Value::Null) => RelationshipChild::Empty,
            Some(Value::Array(items)) => {
                if def.multiplicity == Multiplicity::One {
                    return Err(Error::Relationship {
                        operation: "load",
                        expected: Multiplicity::One,
                        actual: Multiplicity::Many,
                    });
                }
                if items.is_empty() {
                    RelationshipChild::Empty
                } else if items.iter().all(|item| coerce_id(item).is_some()) {
                    RelationshipChild::UnresolvedMany(
                        items.iter().filter_map(coerce_id).collect(),
                    )
                } else if items.iter().all(Value::is_object) {
                    let resources = items
                        .iter()
                        .map(|item| {
                            Resource::from_record(
                                target_model,
                                item.as_object().cloned().unwrap_or_default(),
                            )
                        })
                        .collect::<Result<Vec<_>>>()?;
                    let count = resources.len();
                    RelationshipChild::ResolvedMany(ResourceArray::new(
                        target_model,
                        resources,
                        count,
                    ))
                } else {
                    return Err(Error::Serialization(format!(
                        "relationship {name} holds a mix of ids and embedded records"
                    )));
                }
            }
            Some(Value::Object(record)) => {
                if def.multiplicity == Multiplicity::Many {
                    return Err(Error::Relationship {
                        operation: "load",
                        expected: Multiplicity::Many,
                        actual: Multiplicity::One,
                    });
                }
                RelationshipChild::ResolvedOne(Box::new(Resource::from_record(
                    target_model,
                    record.clone(),
                )?))
            }
            Some(other) => match coerce_id(other) {
                Some(id) if def.multiplicity == Multiplicity::One => {
                    RelationshipChild::UnresolvedOne(id)
                }
                Some(_) => {
                    return Err(Error::Relationship {
                        operation: "load",
                        expected: Multiplicity::Many,
                        actual: Multiplicity::One,
                    });
                }
                None => {
                    return Err(Error::Serialization(format!(
                        "relationship {name} holds a non-id value: {other}"
                    )));
                }
            },
        };

        Ok(Relationship {
            name: name.to_string(),
            target: def.target.clone(),
            multiplicity: def.multiplicity,
            child,
        })
    }

    /// Returns the relationship's field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the target resource type.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the declared arity.
    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    /// Returns the current child state.
    pub fn child(&self) -> &RelationshipChild {
        &self.child
    }

    /// Returns the ids currently referenced, resolved or not.
    pub fn ids(&self) -> Vec<u64> {
        self.child.ids()
    }

    pub(crate) fn set_child(&mut self, child: RelationshipChild) {
        self.child = child;
    }

    pub(crate) fn take_child(&mut self) -> RelationshipChild {
        std::mem::replace(&mut self.child, RelationshipChild::Empty)
    }

    /// Fetches the child through the target model if it is unresolved.
    ///
    /// Resolved and empty children return immediately with no I/O. A fetch
    /// failure leaves the child unresolved and propagates the adapter error.
    pub(crate) async fn resolve(&mut self, target_model: &Model) -> Result<()> {
        match &self.child {
            RelationshipChild::Empty
            | RelationshipChild::ResolvedOne(_)
            | RelationshipChild::ResolvedMany(_) => Ok(()),
            RelationshipChild::UnresolvedOne(id) => {
                let resource = target_model.find_resource(*id).await?;
                self.child = RelationshipChild::ResolvedOne(Box::new(resource));
                Ok(())
            }
            RelationshipChild::UnresolvedMany(ids) => {
                let resources = target_model.find(FindOptions::with_ids(ids.clone())).await?;
                self.child = RelationshipChild::ResolvedMany(resources);
                Ok(())
            }
        }
    }
}
