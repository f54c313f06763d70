use crate::{
    codec::{AtomCodec, GeoPoint, Polygon, TYPE_KEY},
    error::{ErrorOrigin, TransformError},
    query::order::{ConstraintOp, PROCESSING_ORDER},
    schema::{FieldSchema, FieldType},
    transform::{Transformed, interior_atom_or_verbatim, transform_top_level_atom},
    value::{Depth, has_type_tag, is_truthy, json_number_to_bson, json_to_bson},
};
use bson::{Bson, Document, doc};
use chrono::{DateTime, Utc};
use docbridge_utils::relative_time_to_date;
use serde_json::{Map, Value};

const RELATIVE_TIME_KEY: &str = "$relativeTime";

///
/// ConstraintCompiler
///
/// One pass over a field-scoped constraint object.
///

struct ConstraintCompiler<'a> {
    constraint: &'a Map<String, Value>,
    field: Option<&'a FieldSchema>,
    count: bool,
    now: DateTime<Utc>,
    depth: Depth,
    answer: Document,
}

/// Compile a REST constraint object into its native operator document.
///
/// Returns `CannotTransform` when `constraint` is not an object or carries
/// a key without a leading `$`, meaning it is a plain value to be compared
/// for equality. `now` is the reference time for `$relativeTime`; `depth`
/// bounds operands that are stored verbatim.
pub fn transform_constraint(
    constraint: &Value,
    field: Option<&FieldSchema>,
    count: bool,
    now: DateTime<Utc>,
    depth: Depth,
) -> Result<Transformed<Document>, TransformError> {
    let Value::Object(constraint) = constraint else {
        return Ok(Transformed::CannotTransform);
    };
    if constraint.keys().any(|key| !key.starts_with('$')) {
        return Ok(Transformed::CannotTransform);
    }
    if let Some(unknown) = constraint
        .keys()
        .find(|key| ConstraintOp::parse(key).is_none())
    {
        return Err(TransformError::constraint_invalid(format!(
            "bad constraint: {unknown}"
        )));
    }

    let mut compiler = ConstraintCompiler {
        constraint,
        field,
        count,
        now,
        depth,
        answer: Document::new(),
    };
    for op in PROCESSING_ORDER {
        if let Some(operand) = constraint.get(&op.to_string()) {
            compiler.apply(op, operand)?;
        }
    }

    Ok(Transformed::Value(compiler.answer))
}

impl ConstraintCompiler<'_> {
    fn apply(&mut self, op: ConstraintOp, operand: &Value) -> Result<(), TransformError> {
        let key = op.to_string();

        match op {
            _ if op.is_comparison() => {
                let native = self.comparison(op, operand)?;
                self.answer.insert(key, native);
            }

            ConstraintOp::In | ConstraintOp::NotIn => {
                let Value::Array(items) = operand else {
                    return Err(invalid(format!("bad {key} value")));
                };
                let mut natives = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Array(inner) => {
                            for entry in inner {
                                natives.push(self.atom(entry)?);
                            }
                        }
                        _ => natives.push(self.atom(item)?),
                    }
                }
                self.answer.insert(key, natives);
            }

            ConstraintOp::All => {
                let Value::Array(items) = operand else {
                    return Err(invalid("bad $all value"));
                };
                let natives = items
                    .iter()
                    .map(|item| interior_atom_or_verbatim(item, self.depth))
                    .collect::<Result<Vec<_>, _>>()?;
                if natives.iter().any(|native| matches!(native, Bson::RegularExpression(_)))
                    && !all_literal_prefix_or_none(&natives)
                {
                    return Err(invalid(format!(
                        "All $all values must be of regex type or none: {operand}"
                    )));
                }
                self.answer.insert(key, natives);
            }

            ConstraintOp::Regex => {
                let Value::String(pattern) = operand else {
                    return Err(invalid(format!("bad regex: {operand}")));
                };
                self.answer.insert(key, pattern.as_str());
            }

            ConstraintOp::Options => {
                self.answer.insert(key, json_to_bson(operand, self.depth)?);
            }

            ConstraintOp::ContainedBy => {
                let Value::Array(items) = operand else {
                    return Err(invalid("bad $containedBy: should be an array"));
                };
                let natives = items
                    .iter()
                    .map(|item| self.atom(item))
                    .collect::<Result<Vec<_>, _>>()?;
                self.answer.insert("$elemMatch", doc! { "$nin": natives });
            }

            ConstraintOp::Text => {
                let text = compile_text(operand)?;
                self.answer.insert(key, text);
            }

            ConstraintOp::NearSphere => {
                let point = geo_point_operand(operand, "bad $nearSphere value; should be GeoPoint")?;
                if self.count {
                    let distance = self.folded_distance()?;
                    self.answer.insert(
                        "$geoWithin",
                        doc! { "$centerSphere": [point.lng_lat(), distance] },
                    );
                } else {
                    self.answer.insert(key, point.lng_lat());
                }
            }

            ConstraintOp::MaxDistance
            | ConstraintOp::MaxDistanceInRadians
            | ConstraintOp::MaxDistanceInMiles
            | ConstraintOp::MaxDistanceInKilometers => {
                // Already folded into $geoWithin for counts.
                if !self.count {
                    let radians = distance_in_radians(op, operand)?;
                    self.answer.insert(ConstraintOp::MaxDistance.to_string(), radians);
                }
            }

            ConstraintOp::Select | ConstraintOp::DontSelect => {
                return Err(TransformError::command_unavailable(
                    ErrorOrigin::Constraint,
                    format!("the {key} constraint is not supported yet"),
                ));
            }

            ConstraintOp::Within => {
                let corners = match operand.get("$box") {
                    Some(Value::Array(corners)) if corners.len() == 2 => corners,
                    _ => return Err(invalid("malformatted $within arg")),
                };
                let corners = corners
                    .iter()
                    .map(|corner| {
                        geo_point_operand(corner, "malformatted $within arg").map(|p| p.lng_lat())
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                self.answer.insert(key, doc! { "$box": corners });
            }

            ConstraintOp::GeoWithin => {
                let within = compile_geo_within(operand)?;
                self.answer.insert(key, within);
            }

            ConstraintOp::GeoIntersects => {
                let point = operand
                    .get("$point")
                    .filter(|point| has_type_tag(point, GeoPoint::TYPE_NAME))
                    .ok_or_else(|| invalid("bad $geoIntersect value; $point should be GeoPoint"))?;
                let point = geo_point_operand(point, "bad $geoIntersect value; $point should be GeoPoint")?;
                point.validate()?;
                self.answer.insert(
                    key,
                    doc! { "$geometry": { "type": "Point", "coordinates": point.lng_lat() } },
                );
            }

            _ => {
                return Err(TransformError::internal(
                    ErrorOrigin::Constraint,
                    format!("unhandled constraint operator: {key}"),
                ));
            }
        }

        Ok(())
    }

    fn comparison(&self, op: ConstraintOp, operand: &Value) -> Result<Bson, TransformError> {
        let Some(relative) = operand
            .get(RELATIVE_TIME_KEY)
            .filter(|relative| is_truthy(relative))
        else {
            return self.atom(operand);
        };

        if self.field.is_some_and(|field| !field.is(FieldType::Date)) {
            return Err(invalid("$relativeTime can only be used with Date field"));
        }
        if !op.accepts_relative_time() {
            return Err(invalid(
                "$relativeTime can only be used with the $lt, $lte, $gt, and $gte operators",
            ));
        }

        let Value::String(text) = relative else {
            return Err(invalid(format!(
                "bad $relativeTime ({op}) value. Time should be a string"
            )));
        };
        match relative_time_to_date(text, self.now) {
            Ok(resolved) => Ok(Bson::DateTime(bson::DateTime::from_chrono(resolved.date))),
            Err(err) => {
                tracing::info!(
                    operator = %op,
                    text = %text,
                    error = %err,
                    "constraint.relative_time_rejected"
                );
                Err(invalid(format!("bad $relativeTime ({op}) value. {err}")))
            }
        }
    }

    // Array-typed fields compare against interior atoms.
    fn atom(&self, value: &Value) -> Result<Bson, TransformError> {
        if self.field.is_some_and(|field| field.is(FieldType::Array)) {
            return interior_atom_or_verbatim(value, self.depth);
        }

        match transform_top_level_atom(value, self.field)? {
            Transformed::Value(native) => Ok(native),
            Transformed::CannotTransform => Err(invalid(format!("bad atom: {value}"))),
        }
    }

    // Distance for a count-query $nearSphere, from whichever variant is present.
    fn folded_distance(&self) -> Result<Bson, TransformError> {
        PROCESSING_ORDER
            .into_iter()
            .filter(|op| op.distance_divisor().is_some())
            .find_map(|op| {
                self.constraint
                    .get(&op.to_string())
                    .map(|operand| distance_in_radians(op, operand))
            })
            .unwrap_or_else(|| {
                Err(invalid(
                    "bad $nearSphere value; a count query requires $maxDistance",
                ))
            })
    }
}

fn invalid(message: impl Into<String>) -> TransformError {
    TransformError::constraint_invalid(message)
}

// A regex counts as literal-prefixed when it renders as `/^\Q...\E/`.
fn is_literal_prefix_regex(native: &Bson) -> bool {
    let Bson::RegularExpression(regex) = native else {
        return false;
    };
    let rendered = format!("/{}/{}", regex.pattern, regex.options);

    rendered
        .find("/^\\Q")
        .is_some_and(|start| rendered[start..].contains("\\E/"))
}

fn all_literal_prefix_or_none(natives: &[Bson]) -> bool {
    let Some((first, rest)) = natives.split_first() else {
        return true;
    };
    let first_is_regex = is_literal_prefix_regex(first);
    if rest.is_empty() {
        return first_is_regex;
    }

    rest.iter()
        .all(|native| is_literal_prefix_regex(native) == first_is_regex)
}

fn compile_text(operand: &Value) -> Result<Document, TransformError> {
    let Some(Value::Object(search)) = operand.get("$search") else {
        return Err(invalid("bad $text: $search, should be object"));
    };

    let term = match search.get("$term") {
        Some(Value::String(term)) if !term.is_empty() => term,
        _ => return Err(invalid("bad $text: $term, should be string")),
    };
    let mut text = doc! { "$search": term.as_str() };

    if let Some(language) = search.get("$language").filter(|value| is_truthy(value)) {
        let Value::String(language) = language else {
            return Err(invalid("bad $text: $language, should be string"));
        };
        text.insert("$language", language.as_str());
    }
    for flag in ["$caseSensitive", "$diacriticSensitive"] {
        if let Some(value) = search.get(flag).filter(|value| is_truthy(value)) {
            let Value::Bool(value) = value else {
                return Err(invalid(format!("bad $text: {flag}, should be boolean")));
            };
            text.insert(flag, *value);
        }
    }

    Ok(text)
}

fn compile_geo_within(operand: &Value) -> Result<Document, TransformError> {
    match (operand.get("$polygon"), operand.get("$centerSphere")) {
        (Some(polygon), None) => {
            let points = match polygon {
                Value::Object(_) if has_type_tag(polygon, Polygon::TYPE_NAME) => {
                    match polygon.get("coordinates") {
                        Some(Value::Array(points)) if points.len() >= 3 => points,
                        _ => {
                            return Err(invalid(
                                "bad $geoWithin value; Polygon.coordinates should contain at least 3 lon/lat pairs",
                            ));
                        }
                    }
                }
                Value::Array(points) if points.len() >= 3 => points,
                Value::Array(_) => {
                    return Err(invalid(
                        "bad $geoWithin value; $polygon should contain at least 3 GeoPoints",
                    ));
                }
                _ => {
                    return Err(invalid(
                        "bad $geoWithin value; $polygon should be Polygon object or Array of GeoPoints",
                    ));
                }
            };

            let natives = points
                .iter()
                .map(polygon_vertex)
                .collect::<Result<Vec<_>, _>>()?;

            Ok(doc! { "$polygon": natives })
        }

        (None, Some(center_sphere)) => {
            let (point, distance) = match center_sphere {
                Value::Array(parts) if parts.len() >= 2 => (&parts[0], &parts[1]),
                _ => {
                    return Err(invalid(
                        "bad $geoWithin value; $centerSphere should be an array of GeoPoint and distance",
                    ));
                }
            };
            let point = match point {
                Value::Array(pair) => GeoPoint::from_lng_lat(pair),
                _ if has_type_tag(point, GeoPoint::TYPE_NAME) => point
                    .as_object()
                    .and_then(|fields| GeoPoint::from_envelope(fields).ok()),
                _ => None,
            }
            .ok_or_else(|| invalid("bad $geoWithin value; $centerSphere geo point invalid"))?;
            point.validate()?;

            let distance = match distance {
                Value::Number(number) if number.as_f64().is_some_and(|d| d >= 0.0) => number,
                _ => return Err(invalid("bad $geoWithin value; $centerSphere distance invalid")),
            };

            Ok(doc! { "$centerSphere": [point.lng_lat(), json_number_to_bson(distance)] })
        }

        _ => Err(invalid(
            "bad $geoWithin value; expected exactly one of $polygon or $centerSphere",
        )),
    }
}

// Bare pairs are already `[lng, lat]`; GeoPoint envelopes are swapped.
fn polygon_vertex(point: &Value) -> Result<Bson, TransformError> {
    if let Value::Array(pair) = point
        && let Some(geo_point) = GeoPoint::from_lng_lat(pair)
    {
        geo_point.validate()?;
        return Ok(geo_point.lng_lat());
    }

    let geo_point = match point {
        Value::Object(fields) if has_type_tag(point, GeoPoint::TYPE_NAME) => {
            GeoPoint::from_envelope(fields).map_err(|_| invalid("bad $geoWithin value"))?
        }
        _ => return Err(invalid("bad $geoWithin value")),
    };
    geo_point.validate()?;

    Ok(geo_point.lng_lat())
}

// GeoPoint operand: an envelope or a bare `{latitude, longitude}` object.
fn geo_point_operand(value: &Value, message: &str) -> Result<GeoPoint, TransformError> {
    match value {
        Value::Object(fields) if !fields.contains_key(TYPE_KEY) || has_type_tag(value, GeoPoint::TYPE_NAME) => {
            GeoPoint::from_fields(fields, GeoPoint::TYPE_NAME).map_err(|_| invalid(message))
        }
        _ => Err(invalid(message)),
    }
}

fn distance_in_radians(op: ConstraintOp, operand: &Value) -> Result<Bson, TransformError> {
    let (Value::Number(distance), Some(divisor)) = (operand, op.distance_divisor()) else {
        return Err(invalid(format!("bad {op} value; should be a number")));
    };

    // Radians pass through untouched so integers stay integers.
    if matches!(op, ConstraintOp::MaxDistance | ConstraintOp::MaxDistanceInRadians) {
        return Ok(json_number_to_bson(distance));
    }

    let distance = distance.as_f64().unwrap_or(f64::NAN);
    Ok(Bson::Double(distance / divisor))
}
