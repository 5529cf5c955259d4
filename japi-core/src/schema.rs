//! Resource schema declarations.
//!
//! A [`Schema`] describes one resource type: its attributes (name to primitive
//! type descriptor) and its relationships (name to target type plus
//! multiplicity). Schemas are declared once, handed to the model registry at
//! build time, and immutable thereafter.
//!
//! # Example
//!
//! ```ignore
//! use japi_core::schema::{Schema, AttrType};
//!
//! let person = Schema::builder("person")
//!     .attribute("name", AttrType::String)
//!     .attribute("age", AttrType::Number)
//!     .has_one("soulmate", "person")
//!     .has_many("pets", "animal")
//!     .build();
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Primitive type descriptor for a declared attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrType {
    /// UTF-8 string.
    String,
    /// Any JSON number.
    Number,
    /// Boolean flag.
    Boolean,
    /// Nested JSON object.
    Object,
    /// JSON array of arbitrary values.
    Array,
}

/// Whether a relationship points at one related resource or many.
///
/// Fixed at declaration time; a relationship never changes arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Multiplicity {
    /// To-one relationship.
    One,
    /// To-many relationship.
    Many,
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Multiplicity::One => write!(f, "one"),
            Multiplicity::Many => write!(f, "many"),
        }
    }
}

/// A declared relationship: which type it targets and its arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDef {
    /// The resource type the relationship points at.
    pub target: String,
    /// To-one or to-many.
    pub multiplicity: Multiplicity,
}

/// Static, per-resource-type configuration.
///
/// Field maps are ordered (`BTreeMap`) so serialization output is
/// deterministic.
#[derive(Debug, Clone)]
pub struct Schema {
    type_name: String,
    attributes: BTreeMap<String, AttrType>,
    relationships: BTreeMap<String, RelationshipDef>,
}

impl Schema {
    /// Creates a builder for the given resource type name.
    ///
    /// Type names are singular (`"person"`, not `"people"`); plural collection
    /// names are derived by the registry's [`Naming`] strategy.
    pub fn builder(type_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            schema: Schema {
                type_name: type_name.into(),
                attributes: BTreeMap::new(),
                relationships: BTreeMap::new(),
            },
        }
    }

    /// Returns the resource type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the declared attributes.
    pub fn attributes(&self) -> &BTreeMap<String, AttrType> {
        &self.attributes
    }

    /// Returns the declared relationships.
    pub fn relationships(&self) -> &BTreeMap<String, RelationshipDef> {
        &self.relationships
    }

    /// Looks up a single relationship declaration.
    pub fn relationship(&self, field: &str) -> Option<&RelationshipDef> {
        self.relationships.get(field)
    }
}

/// Fluent builder for [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Declares an attribute with its primitive type.
    pub fn attribute(mut self, name: impl Into<String>, ty: AttrType) -> Self {
        self.schema.attributes.insert(name.into(), ty);
        self
    }

    /// Declares a to-one relationship to the given target type.
    pub fn has_one(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.schema.relationships.insert(
            name.into(),
            RelationshipDef {
                target: target.into(),
                multiplicity: Multiplicity::One,
            },
        );
        self
    }

    /// Declares a to-many relationship to the given target type.
    pub fn has_many(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.schema.relationships.insert(
            name.into(),
            RelationshipDef {
                target: target.into(),
                multiplicity: Multiplicity::Many,
            },
        );
        self
    }

    /// Builds and returns the final schema.
    pub fn build(self) -> Schema {
        self.schema
    }
}

/// Process-wide naming strategy.
///
/// Plural collection names are computed once when the registry is built and
/// shared by reference afterwards; no inflection happens per call.
#[derive(Debug, Clone)]
pub struct Naming {
    plurals: HashMap<String, String>,
}

impl Naming {
    pub(crate) fn new<'a>(types: impl IntoIterator<Item = &'a str>) -> Self {
        let plurals = types
            .into_iter()
            .map(|ty| (ty.to_string(), pluralizer::pluralize(ty, 2, false)))
            .collect();
        Naming { plurals }
    }

    /// Returns the plural collection name for a registered type.
    ///
    /// Unregistered types fall back to their own name unchanged.
    pub fn plural<'a>(&'a self, type_name: &'a str) -> &'a str {
        self.plurals
            .get(type_name)
            .map(String::as_str)
            .unwrap_or(type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_fields() {
        let schema = Schema::builder("person")
            .attribute("name", AttrType::String)
            .has_one("soulmate", "person")
            .has_many("pets", "animal")
            .build();

        assert_eq!(schema.type_name(), "person");
        assert_eq!(schema.attributes().len(), 1);
        assert_eq!(
            schema.relationship("pets").unwrap().multiplicity,
            Multiplicity::Many
        );
        assert_eq!(schema.relationship("soulmate").unwrap().target, "person");
        assert!(schema.relationship("name").is_none());
    }

    #[test]
    fn naming_pluralizes_once() {
        let naming = Naming::new(["person", "animal"]);
        assert_eq!(naming.plural("person"), "people");
        assert_eq!(naming.plural("animal"), "animals");
        // Unregistered types pass through untouched.
        assert_eq!(naming.plural("widget"), "widget");
    }
}
