//! Module: decode
//! Responsibility: native stored documents → REST objects, reconstructing
//! pointers and synthesizing relation placeholders from the schema.
//! Does not own: redacting sensitive fields; the caller strips them.

mod nested;

#[cfg(test)]
mod tests;

use crate::{
    acl::{READ_PERM_KEY, WRITE_PERM_KEY},
    codec::{
        AtomCodec, BytesAtom, DateAtom, FileAtom, GeoPoint, PointerAtom, Polygon, RelationAtom,
        format_iso, parse_iso,
    },
    config::TransformConfig,
    error::{ErrorOrigin, TransformError},
    key::{NATIVE_ID_KEY, POINTER_PREFIX, auth_data_column_provider},
    schema::{ClassSchema, FieldSchema, FieldType},
    value::Depth,
};
use bson::{Bson, Document};
use serde_json::{Map, Value};

pub(crate) use nested::nested_to_json;

const USER_CLASS: &str = "_User";

// Internal fields returned under their stored names.
const PASSTHROUGH_KEYS: &[&str] = &[
    "_hashed_password",
    "_email_verify_token",
    "_perishable_token",
    "_perishable_token_expires_at",
    "_password_changed_at",
    "_tombstone",
    "_email_verify_token_expires_at",
    "_account_lockout_expires_at",
    "_failed_login_count",
    "_password_history",
];

///
/// ObjectDecoder
///

pub(crate) struct ObjectDecoder<'a> {
    pub class_name: &'a str,
    pub schema: &'a ClassSchema,
    pub config: &'a TransformConfig,
}

impl ObjectDecoder<'_> {
    pub(crate) fn decode(&self, document: &Document) -> Result<Map<String, Value>, TransformError> {
        let depth = Depth::new(self.config.max_depth, ErrorOrigin::Decode);
        let mut object = Map::new();

        if document.contains_key(READ_PERM_KEY) || document.contains_key(WRITE_PERM_KEY) {
            for key in [READ_PERM_KEY, WRITE_PERM_KEY] {
                let ids = match document.get(key) {
                    None | Some(Bson::Null) => Value::Array(Vec::new()),
                    Some(ids) => nested_to_json(ids, depth)?,
                };
                object.insert(key.to_string(), ids);
            }
        }

        for (key, native) in document {
            match key.as_str() {
                READ_PERM_KEY | WRITE_PERM_KEY | "_acl" => {}
                NATIVE_ID_KEY => {
                    object.insert("objectId".to_string(), Value::String(id_string(native)?));
                }
                "_session_token" => {
                    object.insert("sessionToken".to_string(), nested_to_json(native, depth)?);
                }
                "createdAt" | "_created_at" => {
                    object.insert("createdAt".to_string(), iso_string(key, native)?);
                }
                "updatedAt" | "_updated_at" => {
                    object.insert("updatedAt".to_string(), iso_string(key, native)?);
                }
                "lastUsed" | "_last_used" => {
                    object.insert("lastUsed".to_string(), iso_string(key, native)?);
                }
                "expiresAt" | "_expiresAt" => {
                    object.insert("expiresAt".to_string(), date_envelope(key, native)?);
                }
                "timesUsed" | "times_used" => {
                    object.insert("timesUsed".to_string(), nested_to_json(native, depth)?);
                }
                "authData" if self.class_name == USER_CLASS => {
                    tracing::warn!(
                        class_name = %self.class_name,
                        "decode.auth_data_ignored"
                    );
                }
                _ if PASSTHROUGH_KEYS.contains(&key.as_str()) => {
                    object.insert(key.clone(), passthrough_value(native, depth)?);
                }
                _ => self.decode_field(key, native, &mut object, depth)?,
            }
        }

        for (name, field) in self.schema.relation_fields() {
            if !object.contains_key(name) {
                let relation = RelationAtom {
                    class_name: field.target_class_or_empty().to_string(),
                };
                object.insert(name.to_string(), relation.to_envelope());
            }
        }

        Ok(object)
    }

    fn decode_field(
        &self,
        key: &str,
        native: &Bson,
        object: &mut Map<String, Value>,
        depth: Depth,
    ) -> Result<(), TransformError> {
        if self.class_name == USER_CLASS
            && let Some(provider) = auth_data_column_provider(key)
        {
            let auth_data = object
                .entry("authData")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(auth_data) = auth_data {
                auth_data.insert(provider.to_string(), nested_to_json(native, depth)?);
            }
            return Ok(());
        }

        if let Some(field_name) = key.strip_prefix(POINTER_PREFIX) {
            if let Some(pointer) = self.decode_pointer(field_name, native)? {
                object.insert(field_name.to_string(), pointer);
            }
            return Ok(());
        }

        if key.starts_with('_') && key != "__type" {
            return Err(TransformError::decode_internal(format!(
                "bad key in untransform: {key}"
            )));
        }

        let decoded = match self.schema.field(key).map(|field| field.kind) {
            Some(FieldType::File) => FileAtom::database_to_json(native)?,
            Some(FieldType::GeoPoint) => GeoPoint::database_to_json(native)?,
            Some(FieldType::Polygon) => Polygon::database_to_json(native)?,
            Some(FieldType::Bytes) => BytesAtom::database_to_json(native)?,
            _ => None,
        };
        let decoded = match decoded {
            Some(decoded) => decoded,
            None => nested_to_json(native, depth)?,
        };
        object.insert(key.to_string(), decoded);

        Ok(())
    }

    // `None` drops the column.
    fn decode_pointer(&self, field_name: &str, native: &Bson) -> Result<Option<Value>, TransformError> {
        let Some(field) = self.pointer_field(field_name) else {
            return Ok(None);
        };
        if matches!(native, Bson::Null) {
            return Ok(None);
        }

        let pointer = PointerAtom::from_native(native)?.ok_or_else(|| {
            TransformError::decode_internal(format!("bad pointer value in column {field_name}"))
        })?;
        if pointer.class_name != field.target_class_or_empty() {
            return Err(TransformError::decode_internal("pointer to incorrect className"));
        }

        Ok(Some(pointer.to_envelope()))
    }

    // Pointer columns the schema no longer declares as Pointer are dropped.
    fn pointer_field(&self, field_name: &str) -> Option<&FieldSchema> {
        match self.schema.field(field_name) {
            Some(field) if field.is(FieldType::Pointer) => Some(field),
            Some(field) => {
                tracing::info!(
                    class_name = %self.class_name,
                    field = %field_name,
                    field_type = %field.kind,
                    "decode.pointer_in_non_pointer_column_dropped"
                );
                None
            }
            None => {
                tracing::info!(
                    class_name = %self.class_name,
                    field = %field_name,
                    "decode.pointer_column_not_in_schema_dropped"
                );
                None
            }
        }
    }
}

// Stored timestamps keep their REST wire text rather than a Date envelope.
fn passthrough_value(native: &Bson, depth: Depth) -> Result<Value, TransformError> {
    match native {
        Bson::DateTime(datetime) => Ok(Value::String(format_iso(datetime.to_chrono()))),
        _ => nested_to_json(native, depth),
    }
}

fn id_string(native: &Bson) -> Result<String, TransformError> {
    match native {
        Bson::String(id) => Ok(id.clone()),
        Bson::ObjectId(id) => Ok(id.to_hex()),
        Bson::Int32(id) => Ok(id.to_string()),
        Bson::Int64(id) => Ok(id.to_string()),
        Bson::Double(id) => Ok(id.to_string()),
        other => Err(TransformError::decode_internal(format!(
            "bad _id value: {:?}",
            other.element_type()
        ))),
    }
}

fn stored_date(key: &str, native: &Bson) -> Result<DateAtom, TransformError> {
    match native {
        Bson::DateTime(datetime) => Ok(DateAtom(datetime.to_chrono())),
        Bson::String(text) => parse_iso(text).map(DateAtom),
        _ => Err(TransformError::decode_internal(format!(
            "bad date value in {key}"
        ))),
    }
}

fn iso_string(key: &str, native: &Bson) -> Result<Value, TransformError> {
    stored_date(key, native).map(|date| Value::String(format_iso(date.0)))
}

fn date_envelope(key: &str, native: &Bson) -> Result<Value, TransformError> {
    stored_date(key, native).map(|date| date.to_envelope())
}
