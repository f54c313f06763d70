//! Module: schema
//! Responsibility: read-only per-class field typing consulted by every transform.
//! Does not own: loading or caching schemas; callers pass a fresh schema per call.

use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// FieldType
///
/// Declared storage type of one class field.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Bytes,
    GeoPoint,
    Polygon,
    File,
    Pointer,
    Relation,
    Array,
    Object,
}

///
/// FieldSchema
///
/// `target_class` is only meaningful for Pointer and Relation fields.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub kind: FieldType,

    #[serde(
        rename = "targetClass",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target_class: Option<String>,
}

impl FieldSchema {
    #[must_use]
    pub const fn new(kind: FieldType) -> Self {
        Self {
            kind,
            target_class: None,
        }
    }

    #[must_use]
    pub fn pointer(target_class: impl Into<String>) -> Self {
        Self {
            kind: FieldType::Pointer,
            target_class: Some(target_class.into()),
        }
    }

    #[must_use]
    pub fn relation(target_class: impl Into<String>) -> Self {
        Self {
            kind: FieldType::Relation,
            target_class: Some(target_class.into()),
        }
    }

    #[must_use]
    pub fn is(&self, kind: FieldType) -> bool {
        self.kind == kind
    }

    /// Target class name, or the empty string when the schema omits it.
    #[must_use]
    pub fn target_class_or_empty(&self) -> &str {
        self.target_class.as_deref().unwrap_or_default()
    }
}

///
/// ClassSchema
///
/// Field name → declared field type for one class.
/// Deserializes from the `{ "fields": { ... } }` shape served by the schema cache.
///

#[derive(Clone, Debug, Default, Deref, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClassSchema {
    #[serde(default)]
    fields: BTreeMap<String, FieldSchema>,
}

impl ClassSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, field: FieldSchema) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.get(name)
    }

    /// True when `name` is declared with exactly `kind`.
    #[must_use]
    pub fn field_is(&self, name: &str, kind: FieldType) -> bool {
        self.field(name).is_some_and(|field| field.is(kind))
    }

    /// Relation-typed fields in name order.
    pub fn relation_fields(&self) -> impl Iterator<Item = (&str, &FieldSchema)> {
        self.fields
            .iter()
            .filter(|(_, field)| field.is(FieldType::Relation))
            .map(|(name, field)| (name.as_str(), field))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_schema_cache_shape() {
        let schema: ClassSchema = serde_json::from_value(json!({
            "fields": {
                "author": { "type": "Pointer", "targetClass": "_User" },
                "likes": { "type": "Relation", "targetClass": "_User" },
                "views": { "type": "Number" }
            }
        }))
        .expect("schema should deserialize");

        assert_eq!(schema.field("author"), Some(&FieldSchema::pointer("_User")));
        assert!(schema.field_is("views", FieldType::Number));
        assert!(!schema.field_is("missing", FieldType::Number));
        assert_eq!(schema.len(), 3);
    }

    #[test]
    fn relation_fields_filters_by_type() {
        let schema = ClassSchema::new()
            .with_field("likes", FieldSchema::relation("_User"))
            .with_field("title", FieldSchema::new(FieldType::String))
            .with_field("fans", FieldSchema::relation("Fan"));

        let names: Vec<&str> = schema.relation_fields().map(|(name, _)| name).collect();

        assert_eq!(names, vec!["fans", "likes"]);
    }
}
