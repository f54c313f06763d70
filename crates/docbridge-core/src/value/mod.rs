//! Module: value
//! Responsibility: the single REST-atom classifier plus the plain
//! (non-atom-aware) conversions between JSON and native values.
//! Does not own: choosing fallbacks when a value is not an atom; see `transform`.

#[cfg(test)]
mod tests;

use crate::{
    codec::{
        AtomCodec, BytesAtom, DateAtom, FileAtom, GeoPoint, PointerAtom, Polygon, RelationAtom,
        TYPE_KEY, parse_iso,
    },
    error::{ErrorOrigin, TransformError},
};
use bson::{Bson, Document};
use serde_json::{Map, Number, Value};

///
/// CONSTANTS
///

/// Key of the bare regex shape `{$regex: pattern}` recognized in nested positions.
pub const REGEX_KEY: &str = "$regex";

///
/// RestAtom
///
/// Closed classification of one REST value. Tagged envelopes are validated
/// while classifying, so every variant carries a well-formed payload.
/// `Array` and `Object` are the compound shapes callers recurse into.
///

#[derive(Clone, Debug, PartialEq)]
pub enum RestAtom<'a> {
    Null,
    Bool(bool),
    Number(&'a Number),
    String(&'a str),
    Pointer(PointerAtom),
    Relation(RelationAtom),
    Date(DateAtom),
    Bytes(BytesAtom),
    GeoPoint(GeoPoint),
    Polygon(Polygon),
    File(FileAtom),
    Regex(&'a str),
    Array(&'a [Value]),
    Object(&'a Map<String, Value>),
}

/// Classify a REST value.
///
/// An object carrying `__type` must be a well-formed envelope of a known
/// kind; anything else is rejected rather than treated as a plain object.
pub fn classify(value: &Value) -> Result<RestAtom<'_>, TransformError> {
    let map = match value {
        Value::Null => return Ok(RestAtom::Null),
        Value::Bool(flag) => return Ok(RestAtom::Bool(*flag)),
        Value::Number(number) => return Ok(RestAtom::Number(number)),
        Value::String(text) => return Ok(RestAtom::String(text)),
        Value::Array(items) => return Ok(RestAtom::Array(items)),
        Value::Object(map) => map,
    };

    let Some(kind) = map.get(TYPE_KEY) else {
        return Ok(match map.get(REGEX_KEY) {
            Some(Value::String(pattern)) => RestAtom::Regex(pattern),
            Some(other) => {
                return Err(TransformError::invalid_json(
                    ErrorOrigin::Value,
                    format!("bad regex: {other}"),
                ));
            }
            None => RestAtom::Object(map),
        });
    };

    let atom = match kind.as_str() {
        Some(PointerAtom::TYPE_NAME) => RestAtom::Pointer(PointerAtom::from_envelope(map)?),
        Some(RelationAtom::TYPE_NAME) => RestAtom::Relation(RelationAtom::from_envelope(map)?),
        Some(DateAtom::TYPE_NAME) => RestAtom::Date(DateAtom::from_envelope(map)?),
        Some(BytesAtom::TYPE_NAME) => RestAtom::Bytes(BytesAtom::from_envelope(map)?),
        Some(GeoPoint::TYPE_NAME) => RestAtom::GeoPoint(GeoPoint::from_envelope(map)?),
        Some(Polygon::TYPE_NAME) => RestAtom::Polygon(Polygon::from_envelope(map)?),
        Some(FileAtom::TYPE_NAME) => RestAtom::File(FileAtom::from_envelope(map)?),
        _ => {
            return Err(TransformError::invalid_json(
                ErrorOrigin::Value,
                format!("invalid __type: {kind}"),
            ));
        }
    };

    Ok(atom)
}

/// True for an object tagged with `__type == kind`, without validating it.
#[must_use]
pub fn has_type_tag(value: &Value, kind: &str) -> bool {
    value.get(TYPE_KEY).and_then(Value::as_str) == Some(kind)
}

///
/// Depth
///
/// Recursion guard for walks over nested REST or native values.
/// Every walk starts from `Depth::new` with the configured bound and
/// descends once per nesting level.
///

#[derive(Clone, Copy, Debug)]
pub struct Depth {
    current: usize,
    max: usize,
    origin: ErrorOrigin,
}

impl Depth {
    #[must_use]
    pub const fn new(max: usize, origin: ErrorOrigin) -> Self {
        Self {
            current: 0,
            max,
            origin,
        }
    }

    pub fn descend(self) -> Result<Self, TransformError> {
        if self.current >= self.max {
            return Err(TransformError::too_deep(self.origin, self.max));
        }

        Ok(Self {
            current: self.current + 1,
            ..self
        })
    }
}

// ---- plain conversions -------------------------------------------------

/// Integral numbers become `Int32` when they fit, `Int64` otherwise;
/// everything else is a double.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn json_number_to_bson(number: &Number) -> Bson {
    if let Some(int) = number.as_i64() {
        return i32::try_from(int).map_or(Bson::Int64(int), Bson::Int32);
    }
    if let Some(uint) = number.as_u64() {
        return Bson::Double(uint as f64);
    }

    Bson::Double(number.as_f64().unwrap_or(f64::NAN))
}

/// Native number → JSON number. Non-numeric values yield `None`; a
/// non-finite double cannot be represented and also yields `None`.
#[must_use]
pub fn bson_number_to_json(native: &Bson) -> Option<Number> {
    match native {
        Bson::Int32(int) => Some(Number::from(*int)),
        Bson::Int64(int) => Some(Number::from(*int)),
        Bson::Double(double) => Number::from_f64(*double),
        _ => None,
    }
}

/// Structural JSON → native conversion with no atom handling. Used where a
/// REST value is stored exactly as given.
pub fn json_to_bson(value: &Value, depth: Depth) -> Result<Bson, TransformError> {
    let depth = depth.descend()?;

    Ok(match value {
        Value::Null => Bson::Null,
        Value::Bool(flag) => Bson::Boolean(*flag),
        Value::Number(number) => json_number_to_bson(number),
        Value::String(text) => Bson::String(text.clone()),
        Value::Array(items) => Bson::Array(
            items
                .iter()
                .map(|item| json_to_bson(item, depth))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => Bson::Document(json_map_to_document(map, depth)?),
    })
}

pub fn json_map_to_document(
    map: &Map<String, Value>,
    depth: Depth,
) -> Result<Document, TransformError> {
    map.iter()
        .map(|(key, value)| Ok((key.clone(), json_to_bson(value, depth)?)))
        .collect()
}

/// JavaScript-style truthiness, used where operands are optional flags.
#[must_use]
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Coerce an ISO string to a native datetime.
pub(crate) fn string_to_date(text: &str) -> Result<Bson, TransformError> {
    let parsed = parse_iso(text)?;

    Ok(Bson::DateTime(bson::DateTime::from_chrono(parsed)))
}

/// Integer `objectId` for classes that store numeric ids. Accepts a JSON
/// integer or a string holding one.
pub(crate) fn integer_id(value: &Value, origin: ErrorOrigin) -> Result<Bson, TransformError> {
    let parsed = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed
        .map(|id| i32::try_from(id).map_or(Bson::Int64(id), Bson::Int32))
        .ok_or_else(|| {
            TransformError::invalid_json(origin, format!("objectId must be an integer: {value}"))
        })
}
