use crate::{
    codec::AtomCodec,
    error::TransformError,
    schema::{FieldSchema, FieldType},
    transform::Transformed,
    value::{Depth, RestAtom, classify, json_number_to_bson, json_to_bson},
};
use bson::{Bson, Regex};
use serde_json::Value;

/// Transform a value stored directly under a document key.
///
/// Strings on a Pointer-typed field become pointer strings; tagged atoms go
/// through their codec. Arrays, plain objects, relations and bare regex
/// objects are not top-level atoms.
pub fn transform_top_level_atom(
    atom: &Value,
    field: Option<&FieldSchema>,
) -> Result<Transformed<Bson>, TransformError> {
    let native = match classify(atom)? {
        RestAtom::Null => Bson::Null,
        RestAtom::Bool(flag) => Bson::Boolean(flag),
        RestAtom::Number(number) => json_number_to_bson(number),
        RestAtom::String(text) => match field {
            Some(field) if field.is(FieldType::Pointer) => {
                Bson::String(format!("{}${text}", field.target_class_or_empty()))
            }
            _ => Bson::String(text.to_string()),
        },
        RestAtom::Pointer(pointer) => pointer.to_native()?,
        RestAtom::Date(date) => date.to_native()?,
        RestAtom::Bytes(bytes) => bytes.to_native()?,
        RestAtom::GeoPoint(point) => point.to_native()?,
        RestAtom::Polygon(polygon) => polygon.to_native()?,
        RestAtom::File(file) => file.to_native()?,
        RestAtom::Relation(_) | RestAtom::Regex(_) | RestAtom::Array(_) | RestAtom::Object(_) => {
            return Ok(Transformed::CannotTransform);
        }
    };

    Ok(Transformed::Value(native))
}

/// Transform a value nested inside an array or object.
///
/// Nested pointers keep their envelope, dates and bytes become native, and a
/// bare `{$regex: pattern}` becomes a native regular expression. Compound
/// values and the remaining envelopes are left to the caller.
pub fn transform_interior_atom(atom: &Value) -> Result<Transformed<Bson>, TransformError> {
    let native = match classify(atom)? {
        RestAtom::Null => Bson::Null,
        RestAtom::Bool(flag) => Bson::Boolean(flag),
        RestAtom::Number(number) => json_number_to_bson(number),
        RestAtom::String(text) => Bson::String(text.to_string()),
        RestAtom::Pointer(pointer) => pointer.nested_native(),
        RestAtom::Date(date) => date.to_native()?,
        RestAtom::Bytes(bytes) => bytes.to_native()?,
        RestAtom::Regex(pattern) => Bson::RegularExpression(Regex {
            pattern: pattern.to_string(),
            options: String::new(),
        }),
        RestAtom::Relation(_)
        | RestAtom::GeoPoint(_)
        | RestAtom::Polygon(_)
        | RestAtom::File(_)
        | RestAtom::Array(_)
        | RestAtom::Object(_) => return Ok(Transformed::CannotTransform),
    };

    Ok(Transformed::Value(native))
}

/// Interior transform for operand lists: anything that is not an interior
/// atom is stored as given.
pub fn interior_atom_or_verbatim(atom: &Value, depth: Depth) -> Result<Bson, TransformError> {
    match transform_interior_atom(atom)? {
        Transformed::Value(native) => Ok(native),
        Transformed::CannotTransform => json_to_bson(atom, depth),
    }
}
