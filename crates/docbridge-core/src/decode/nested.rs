use crate::{
    codec::{AtomCodec, BytesAtom, DateAtom, NativeBytes, TYPE_KEY, format_iso},
    error::TransformError,
    value::{Depth, REGEX_KEY, bson_number_to_json},
};
use bson::{Bson, Document};
use serde_json::{Map, Value};

/// Structural native → REST conversion for values below the top level.
///
/// Datetimes and binary blobs become their REST envelopes, a stored
/// `{__type: "Date", iso: <datetime>}` gets its `iso` rendered back to text,
/// and native regexes become `{$regex, $options}`.
pub(crate) fn nested_to_json(native: &Bson, depth: Depth) -> Result<Value, TransformError> {
    let depth = depth.descend()?;

    Ok(match native {
        Bson::Null => Value::Null,
        Bson::Boolean(flag) => Value::Bool(*flag),
        Bson::String(text) => Value::String(text.clone()),
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => {
            bson_number_to_json(native).map_or(Value::Null, Value::Number)
        }
        Bson::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| nested_to_json(item, depth))
                .collect::<Result<_, _>>()?,
        ),
        Bson::DateTime(datetime) => DateAtom(datetime.to_chrono()).to_envelope(),
        Bson::Binary(binary) => BytesAtom {
            base64: NativeBytes::Wrapped(binary).to_base64()?,
        }
        .to_envelope(),
        Bson::Document(document) => Value::Object(nested_document_to_json(document, depth)?),
        Bson::RegularExpression(regex) => {
            let mut map = Map::new();
            map.insert(REGEX_KEY.to_string(), Value::String(regex.pattern.clone()));
            map.insert("$options".to_string(), Value::String(regex.options.clone()));
            Value::Object(map)
        }
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        other => {
            return Err(TransformError::decode_internal(format!(
                "bad value in nested decode: {:?}",
                other.element_type()
            )));
        }
    })
}

fn nested_document_to_json(
    document: &Document,
    depth: Depth,
) -> Result<Map<String, Value>, TransformError> {
    let stored_date = document.get_str(TYPE_KEY).ok() == Some(DateAtom::TYPE_NAME);

    let mut map = Map::new();
    for (key, value) in document {
        let decoded = match value {
            Bson::DateTime(datetime) if stored_date && key == "iso" => {
                Value::String(format_iso(datetime.to_chrono()))
            }
            _ => nested_to_json(value, depth)?,
        };
        map.insert(key.clone(), decoded);
    }

    Ok(map)
}
