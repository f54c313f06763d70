//! Module: codec
//! Responsibility: one codec per tagged special value, converting between the
//! REST envelope `{__type: Kind, ...}` and its native document-store form.
//! Does not own: deciding which codec applies; see `value::classify`.

mod bytes;
mod date;
mod file;
mod geo_point;
mod pointer;
mod polygon;

#[cfg(test)]
mod tests;

use crate::error::TransformError;
use bson::Bson;
use serde_json::{Map, Value};

pub use bytes::{BytesAtom, NativeBytes, looks_like_base64};
pub use date::DateAtom;
pub use file::FileAtom;
pub use geo_point::{GeoPoint, validate_coordinates};
pub use pointer::{PointerAtom, RelationAtom};
pub use polygon::Polygon;

pub(crate) use date::{format_iso, parse_iso};

///
/// CONSTANTS
///

/// Envelope key carrying the special-value kind.
pub const TYPE_KEY: &str = "__type";

///
/// AtomCodec
///
/// Bidirectional conversion for one tagged special value.
///
/// `from_envelope` is only called on envelopes whose `__type` already equals
/// `TYPE_NAME`; it validates the remaining fields. `from_native` returns
/// `Ok(None)` when the native value is not this codec's shape.
///

pub trait AtomCodec: Sized {
    const TYPE_NAME: &'static str;

    fn from_envelope(envelope: &Map<String, Value>) -> Result<Self, TransformError>;

    fn to_envelope(&self) -> Value;

    fn to_native(&self) -> Result<Bson, TransformError>;

    fn from_native(native: &Bson) -> Result<Option<Self>, TransformError>;

    /// Recognize the REST tagged form by its type tag alone.
    fn is_valid_json(value: &Value) -> bool {
        value
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .is_some_and(|kind| kind == Self::TYPE_NAME)
    }

    /// Recognize the native form.
    fn is_valid_database_object(native: &Bson) -> Result<bool, TransformError> {
        Ok(Self::from_native(native)?.is_some())
    }

    /// Native → REST envelope, or `None` when the native value is not this
    /// codec's shape.
    fn database_to_json(native: &Bson) -> Result<Option<Value>, TransformError> {
        Ok(Self::from_native(native)?.map(|atom| atom.to_envelope()))
    }
}

// Shared envelope helpers.

pub(crate) fn envelope(kind: &str, fields: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    let mut map = Map::new();
    map.insert(TYPE_KEY.to_string(), Value::String(kind.to_string()));
    for (key, value) in fields {
        map.insert(key.to_string(), value);
    }

    Value::Object(map)
}

pub(crate) fn required_str<'a>(
    envelope: &'a Map<String, Value>,
    kind: &str,
    key: &str,
) -> Result<&'a str, TransformError> {
    envelope
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| TransformError::codec_invalid(format!("{kind} requires a string {key}")))
}
