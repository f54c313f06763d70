//! Module: key
//! Responsibility: REST field name → native field name, plus the role a
//! field plays in downstream value handling (date coercion, passthrough).
//! Does not own: value transformation; see `transform`.

use crate::{
    codec::{AtomCodec, PointerAtom},
    schema::{ClassSchema, FieldType},
    value::has_type_tag,
};
use serde_json::Value;

///
/// CONSTANTS
///

/// Prefix carried by native columns holding pointer strings.
pub const POINTER_PREFIX: &str = "_p_";

/// Prefix of the per-provider native auth-data columns.
pub const AUTH_DATA_PREFIX: &str = "_auth_data_";

pub const OBJECT_ID_KEY: &str = "objectId";
pub const NATIVE_ID_KEY: &str = "_id";

/// Internal date-valued fields stored under their own names.
pub const INTERNAL_TIME_FIELDS: &[&str] = &[
    "expiresAt",
    "_email_verify_token_expires_at",
    "_account_lockout_expires_at",
    "_perishable_token_expires_at",
    "_password_changed_at",
];

///
/// KeyRole
///
/// How the value under a mapped key is handled.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyRole {
    /// Ordinary field; the value goes through the atom/value transforms.
    Plain,
    /// `objectId`, stored under `_id`.
    ObjectId,
    /// Date-valued field; a bare ISO string is coerced to a native datetime.
    Time,
    /// Permission list, stored exactly as given.
    Permission,
}

///
/// MappedKey
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MappedKey {
    pub native: String,
    pub role: KeyRole,
}

impl MappedKey {
    fn new(native: impl Into<String>, role: KeyRole) -> Self {
        Self {
            native: native.into(),
            role,
        }
    }
}

// Reserved REST names with a fixed native name.
const RESERVED_KEYS: &[(&str, &str, KeyRole)] = &[
    (OBJECT_ID_KEY, NATIVE_ID_KEY, KeyRole::ObjectId),
    ("createdAt", "_created_at", KeyRole::Time),
    ("updatedAt", "_updated_at", KeyRole::Time),
    ("sessionToken", "_session_token", KeyRole::Plain),
    ("lastUsed", "_last_used", KeyRole::Time),
    ("timesUsed", "times_used", KeyRole::Plain),
];

/// Look up a reserved REST name.
#[must_use]
pub fn reserved_key(rest_key: &str) -> Option<MappedKey> {
    RESERVED_KEYS
        .iter()
        .find(|(rest, _, _)| *rest == rest_key)
        .map(|(_, native, role)| MappedKey::new(*native, *role))
}

/// Native field name for a query key.
///
/// Reserved names use the fixed table; any other Pointer-typed field gets
/// the `_p_` prefix.
#[must_use]
pub fn map_key_for_query(field_name: &str, schema: &ClassSchema) -> String {
    if let Some(mapped) = reserved_key(field_name) {
        return mapped.native;
    }

    if schema.field_is(field_name, FieldType::Pointer) {
        format!("{POINTER_PREFIX}{field_name}")
    } else {
        field_name.to_string()
    }
}

/// Native field name and role for an update key.
///
/// Besides the reserved table this recognizes the internal date fields and
/// the permission lists. Pointer columns are detected from the schema, or,
/// for undeclared top-level keys, from a Pointer envelope value.
#[must_use]
pub fn map_key_for_update(rest_key: &str, value: &Value, schema: &ClassSchema) -> MappedKey {
    if let Some(mapped) = reserved_key(rest_key) {
        return mapped;
    }
    if INTERNAL_TIME_FIELDS.contains(&rest_key) {
        return MappedKey::new(rest_key, KeyRole::Time);
    }
    if matches!(rest_key, "_rperm" | "_wperm") {
        return MappedKey::new(rest_key, KeyRole::Permission);
    }

    let pointer = match schema.field(rest_key) {
        Some(field) => field.is(FieldType::Pointer),
        None => !rest_key.contains('.') && has_type_tag(value, PointerAtom::TYPE_NAME),
    };
    if pointer {
        MappedKey::new(format!("{POINTER_PREFIX}{rest_key}"), KeyRole::Plain)
    } else {
        MappedKey::new(rest_key, KeyRole::Plain)
    }
}

/// Provider name of an `authData.<provider>.id` query key.
#[must_use]
pub fn auth_data_id_provider(key: &str) -> Option<&str> {
    let provider = key.strip_prefix("authData.")?.strip_suffix(".id")?;

    is_provider_name(provider).then_some(provider)
}

/// Provider name of a native `_auth_data_<provider>` column.
#[must_use]
pub fn auth_data_column_provider(key: &str) -> Option<&str> {
    let provider = key.strip_prefix(AUTH_DATA_PREFIX)?;

    is_provider_name(provider).then_some(provider)
}

fn is_provider_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSchema;
    use serde_json::json;

    fn schema() -> ClassSchema {
        ClassSchema::new()
            .with_field("author", FieldSchema::pointer("_User"))
            .with_field("views", FieldSchema::new(FieldType::Number))
    }

    #[test]
    fn query_keys_use_reserved_table_then_pointer_prefix() {
        let schema = schema();

        assert_eq!(map_key_for_query("objectId", &schema), "_id");
        assert_eq!(map_key_for_query("createdAt", &schema), "_created_at");
        assert_eq!(map_key_for_query("timesUsed", &schema), "times_used");
        assert_eq!(map_key_for_query("author", &schema), "_p_author");
        assert_eq!(map_key_for_query("views", &schema), "views");
    }

    #[test]
    fn update_keys_detect_time_and_permission_fields() {
        let schema = schema();

        assert_eq!(
            map_key_for_update("_password_changed_at", &json!("2020-01-01"), &schema),
            MappedKey::new("_password_changed_at", KeyRole::Time)
        );
        assert_eq!(
            map_key_for_update("_rperm", &json!(["*"]), &schema),
            MappedKey::new("_rperm", KeyRole::Permission)
        );
        assert_eq!(
            map_key_for_update("updatedAt", &json!(null), &schema),
            MappedKey::new("_updated_at", KeyRole::Time)
        );
    }

    #[test]
    fn undeclared_pointer_values_get_prefixed_only_at_top_level() {
        let schema = schema();
        let pointer = json!({ "__type": "Pointer", "className": "Team", "objectId": "t1" });

        assert_eq!(map_key_for_update("team", &pointer, &schema).native, "_p_team");
        assert_eq!(map_key_for_update("meta.team", &pointer, &schema).native, "meta.team");
        assert_eq!(map_key_for_update("author", &json!(null), &schema).native, "_p_author");
    }

    #[test]
    fn auth_data_patterns() {
        assert_eq!(auth_data_id_provider("authData.facebook.id"), Some("facebook"));
        assert_eq!(auth_data_id_provider("authData.face-book.id"), None);
        assert_eq!(auth_data_id_provider("authData.facebook"), None);
        assert_eq!(auth_data_column_provider("_auth_data_github"), Some("github"));
        assert_eq!(auth_data_column_provider("_auth_data_"), None);
    }
}
