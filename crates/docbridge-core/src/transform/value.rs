use crate::{
    error::{ErrorOrigin, TransformError},
    transform::{Transformed, transform_interior_atom},
    update::{UpdateOutput, transform_update_operator},
    value::Depth,
};
use bson::{Bson, Document};
use serde_json::{Map, Value};

/// Key marking an update-operator object.
pub(crate) const OP_KEY: &str = "__op";

/// Transform a value nested inside an array or object, recursing as needed.
///
/// Atoms (including a bare `{$regex}`) are recognized first; only a plain
/// object that is recursed into has its keys checked.
/// Returns `None` when the value must be omitted from its parent (a nested
/// Delete operation).
pub(crate) fn transform_interior_value(
    value: &Value,
    depth: Depth,
) -> Result<Option<Bson>, TransformError> {
    let depth = depth.descend()?;

    if let Transformed::Value(native) = transform_interior_atom(value)? {
        return Ok(Some(native));
    }

    match value {
        Value::Array(items) => transform_interior_array(items, depth).map(Some),
        Value::Object(map) if map.contains_key(OP_KEY) => {
            match transform_update_operator(map, true, depth)? {
                UpdateOutput::Flat(native) => Ok(Some(native)),
                UpdateOutput::Omit => Ok(None),
                UpdateOutput::Operator(_) => Err(TransformError::internal(
                    ErrorOrigin::Value,
                    "flattened update operator produced a native operator",
                )),
            }
        }
        Value::Object(map) => {
            ensure_plain_keys(map)?;
            transform_nested_object(map, depth).map(|doc| Some(Bson::Document(doc)))
        }
        _ => Err(TransformError::internal(
            ErrorOrigin::Value,
            format!("really did not expect value: {value}"),
        )),
    }
}

/// Recurse field by field into a plain nested object. Omitted fields are dropped.
fn transform_nested_object(
    map: &Map<String, Value>,
    depth: Depth,
) -> Result<Document, TransformError> {
    let mut document = Document::new();
    for (key, value) in map {
        if let Some(native) = transform_interior_value(value, depth)? {
            document.insert(key.clone(), native);
        }
    }

    Ok(document)
}

// Omitted array slots are stored as null so positions are preserved.
fn transform_interior_array(items: &[Value], depth: Depth) -> Result<Bson, TransformError> {
    items
        .iter()
        .map(|item| transform_interior_value(item, depth).map(|native| native.unwrap_or(Bson::Null)))
        .collect::<Result<Vec<_>, _>>()
        .map(Bson::Array)
}

/// Nested keys may not contain `$` or `.`.
fn ensure_plain_keys(map: &Map<String, Value>) -> Result<(), TransformError> {
    if map.keys().any(|key| key.contains('$') || key.contains('.')) {
        return Err(TransformError::invalid_nested_key());
    }

    Ok(())
}
