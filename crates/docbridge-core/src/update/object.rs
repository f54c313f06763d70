use crate::{
    acl::{ACL_KEY, PermissionSet, READ_PERM_KEY, WRITE_PERM_KEY},
    codec::{AtomCodec, BytesAtom, PointerAtom, RelationAtom},
    config::TransformConfig,
    error::{ErrorCode, ErrorOrigin, TransformError},
    key::{
        INTERNAL_TIME_FIELDS, KeyRole, NATIVE_ID_KEY, OBJECT_ID_KEY, POINTER_PREFIX,
        auth_data_column_provider, auth_data_id_provider, map_key_for_update, reserved_key,
    },
    schema::{ClassSchema, FieldType},
    transform::{OP_KEY, Transformed, transform_interior_value, transform_top_level_atom},
    update::{NativeUpdate, NativeUpdateOp, UpdateOutput, transform_update_operator},
    value::{Depth, has_type_tag, integer_id, is_truthy, json_to_bson, string_to_date},
};
use bson::{Bson, Document};
use serde_json::{Map, Value};

// Create-path fields stored exactly as given.
const CREATE_PASSTHROUGH_KEYS: &[&str] = &[
    "_failed_login_count",
    "_email_verify_token",
    "_hashed_password",
    "_perishable_token",
];

///
/// ObjectAssembler
///
/// Builds the native create document or the native update-operator document
/// for one REST object of one class.
///

pub(crate) struct ObjectAssembler<'a> {
    pub class_name: &'a str,
    pub schema: &'a ClassSchema,
    pub config: &'a TransformConfig,
}

impl ObjectAssembler<'_> {
    /// Native document for inserting `object`.
    pub(crate) fn create(&self, object: &Map<String, Value>) -> Result<Document, TransformError> {
        let mut document = Document::new();
        if let Some(permissions) = PermissionSet::from_rest_object(object)? {
            permissions.write_native(&mut document);
        }

        for (key, value) in object {
            if is_permission_key(key) || self.is_relation(key, value) {
                continue;
            }
            if let Some((native_key, native)) = self.create_field(key, value)? {
                document.insert(native_key, native);
            }
        }

        Ok(document)
    }

    /// Native update-operator document for applying `update`.
    ///
    /// Per-field results are bucketed centrally by operator, so every `$inc`
    /// (say) across all fields lands in one operator document.
    pub(crate) fn update(&self, update: &Map<String, Value>) -> Result<Document, TransformError> {
        let mut buckets = UpdateBuckets::default();
        if let Some(permissions) = PermissionSet::from_rest_object(update)? {
            let mut permission_fields = Document::new();
            permissions.write_native(&mut permission_fields);
            for (key, native) in permission_fields {
                buckets.insert(NativeUpdateOp::Set, key, native);
            }
        }

        for (key, value) in update {
            if key == ACL_KEY || self.is_relation(key, value) {
                continue;
            }
            if let Some((native_key, native)) = self.update_field(key, value)? {
                buckets.insert(native.op, native_key, native.arg);
            }
        }

        Ok(buckets.into_document())
    }

    // Relations are written through a separate mutation path.
    fn is_relation(&self, key: &str, value: &Value) -> bool {
        has_type_tag(value, RelationAtom::TYPE_NAME) || self.schema.field_is(key, FieldType::Relation)
    }

    fn create_field(
        &self,
        key: &str,
        value: &Value,
    ) -> Result<Option<(String, Bson)>, TransformError> {
        let depth = Depth::new(self.config.max_depth, ErrorOrigin::Object);
        if key == OBJECT_ID_KEY {
            return Ok(Some((NATIVE_ID_KEY.to_string(), json_to_bson(value, depth)?)));
        }
        if let Some(mapped) = reserved_key(key).filter(|mapped| mapped.role == KeyRole::Time) {
            return self.time_value(key, value).map(|native| Some((mapped.native, native)));
        }
        if INTERNAL_TIME_FIELDS.contains(&key) {
            return self.time_value(key, value).map(|native| Some((key.to_string(), native)));
        }
        if CREATE_PASSTHROUGH_KEYS.contains(&key) || auth_data_column_provider(key).is_some() {
            return Ok(Some((key.to_string(), json_to_bson(value, depth)?)));
        }
        if key == "sessionToken" {
            return Ok(Some(("_session_token".to_string(), json_to_bson(value, depth)?)));
        }
        if auth_data_id_provider(key).is_some() {
            return Err(TransformError::new(
                ErrorCode::InvalidKeyName,
                ErrorOrigin::Object,
                format!("can only query on {key}"),
            ));
        }

        let field = self.schema.field(key);
        let pointer = is_truthy(value)
            && !has_type_tag(value, BytesAtom::TYPE_NAME)
            && (field.is_some_and(|field| field.is(FieldType::Pointer))
                || has_type_tag(value, PointerAtom::TYPE_NAME));
        let native_key = if pointer {
            format!("{POINTER_PREFIX}{key}")
        } else {
            key.to_string()
        };

        if let Transformed::Value(native) = transform_top_level_atom(value, field)? {
            return Ok(Some((native_key, native)));
        }

        Ok(transform_interior_value(value, depth)?.map(|native| (native_key, native)))
    }

    fn update_field(
        &self,
        key: &str,
        value: &Value,
    ) -> Result<Option<(String, NativeUpdate)>, TransformError> {
        let mapped = map_key_for_update(key, value, self.schema);
        let set = |native: Bson| Ok(Some((mapped.native.clone(), set_op(native))));
        let depth = Depth::new(self.config.max_depth, ErrorOrigin::Update);

        match (mapped.role, value) {
            (KeyRole::Permission, _) => return Ok(None),
            (KeyRole::Time, Value::String(text)) => return set(string_to_date(text)?),
            (KeyRole::ObjectId, _) if self.config.has_numeric_ids(self.class_name) => {
                return set(integer_id(value, ErrorOrigin::Update)?);
            }
            _ => {}
        }

        if let Transformed::Value(native) = transform_top_level_atom(value, self.schema.field(key))? {
            // Dotted keys address a path inside a stored object; keep the REST shape there.
            if key.contains('.') {
                return set(json_to_bson(value, depth)?);
            }
            return set(native);
        }

        match value {
            Value::Object(map) if map.contains_key(OP_KEY) => {
                match transform_update_operator(map, false, depth)? {
                    UpdateOutput::Operator(native) => Ok(Some((mapped.native.clone(), native))),
                    UpdateOutput::Flat(native) => set(native),
                    UpdateOutput::Omit => Ok(None),
                }
            }
            // Compound values take the same interior walk as the create path.
            Value::Array(_) | Value::Object(_) => {
                transform_interior_value(value, depth)?.map_or(Ok(None), set)
            }
            _ => Err(TransformError::internal(
                ErrorOrigin::Update,
                format!("really did not expect value: {value}"),
            )),
        }
    }

    // Date-valued field: atom transform, then a bare string is read as ISO.
    fn time_value(&self, key: &str, value: &Value) -> Result<Bson, TransformError> {
        if let Value::String(text) = value {
            return string_to_date(text);
        }

        match transform_top_level_atom(value, self.schema.field(key))? {
            Transformed::Value(native) => Ok(native),
            Transformed::CannotTransform => Err(TransformError::invalid_json(
                ErrorOrigin::Object,
                format!("bad date value for {key}: {value}"),
            )),
        }
    }
}

const fn set_op(arg: Bson) -> NativeUpdate {
    NativeUpdate {
        op: NativeUpdateOp::Set,
        arg,
    }
}

fn is_permission_key(key: &str) -> bool {
    matches!(key, ACL_KEY | READ_PERM_KEY | WRITE_PERM_KEY)
}

///
/// UpdateBuckets
///
/// Native update operators in first-use order, each holding its fields.
///

#[derive(Default)]
struct UpdateBuckets(Vec<(NativeUpdateOp, Document)>);

impl UpdateBuckets {
    fn insert(&mut self, op: NativeUpdateOp, key: String, arg: Bson) {
        match self.0.iter_mut().find(|(bucket, _)| *bucket == op) {
            Some((_, fields)) => {
                fields.insert(key, arg);
            }
            None => self.0.push((op, Document::from_iter([(key, arg)]))),
        }
    }

    fn into_document(self) -> Document {
        self.0
            .into_iter()
            .map(|(op, fields)| (op.as_str().to_string(), Bson::Document(fields)))
            .collect()
    }
}
