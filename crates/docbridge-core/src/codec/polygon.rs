use crate::{
    codec::{AtomCodec, envelope, geo_point::validate_coordinates},
    error::{ErrorOrigin, TransformError},
    value::{bson_number_to_json, json_number_to_bson},
};
use bson::{Bson, doc};
use serde_json::{Map, Number, Value};

///
/// Polygon
///
/// REST `{__type: "Polygon", coordinates: [[lat, lng], ...]}` ↔ native GeoJSON
/// `{type: "Polygon", coordinates: [[[lng, lat], ...]]}`.
///
/// Encoding closes the ring and requires three distinct vertices; decoding
/// only swaps axes back. A decoded polygon therefore keeps the closing
/// vertex that encoding appended.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    /// `[latitude, longitude]` pairs in REST order.
    pub coordinates: Vec<[Number; 2]>,
}

impl Polygon {
    fn ring(&self) -> Result<Vec<[Number; 2]>, TransformError> {
        let mut ring = self.coordinates.clone();

        if let (Some(first), Some(last)) = (ring.first(), ring.last())
            && !same_point(first, last)
        {
            ring.push(first.clone());
        }

        let mut distinct: Vec<&[Number; 2]> = Vec::with_capacity(ring.len());
        for point in &ring {
            if !distinct.iter().any(|seen| same_point(seen, point)) {
                distinct.push(point);
            }
        }

        if distinct.len() < 3 {
            return Err(TransformError::internal(
                ErrorOrigin::Codec,
                "GeoJSON: Loop must have at least 3 different vertices",
            ));
        }

        Ok(ring)
    }
}

impl AtomCodec for Polygon {
    const TYPE_NAME: &'static str = "Polygon";

    fn from_envelope(envelope: &Map<String, Value>) -> Result<Self, TransformError> {
        let invalid = || TransformError::codec_invalid("Polygon requires coordinates as [lat, lng] pairs");

        let points = envelope
            .get("coordinates")
            .and_then(Value::as_array)
            .ok_or_else(invalid)?;

        let coordinates = points
            .iter()
            .map(|point| match point.as_array().map(Vec::as_slice) {
                Some([Value::Number(latitude), Value::Number(longitude)]) => {
                    Ok([latitude.clone(), longitude.clone()])
                }
                _ => Err(invalid()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { coordinates })
    }

    fn to_envelope(&self) -> Value {
        let coordinates = self
            .coordinates
            .iter()
            .map(|[latitude, longitude]| {
                Value::Array(vec![
                    Value::Number(latitude.clone()),
                    Value::Number(longitude.clone()),
                ])
            })
            .collect();

        envelope(Self::TYPE_NAME, [("coordinates", Value::Array(coordinates))])
    }

    fn to_native(&self) -> Result<Bson, TransformError> {
        let ring: Vec<Bson> = self
            .ring()?
            .iter()
            .map(|[latitude, longitude]| {
                Bson::Array(vec![
                    json_number_to_bson(longitude),
                    json_number_to_bson(latitude),
                ])
            })
            .collect();

        Ok(Bson::Document(doc! {
            "type": "Polygon",
            "coordinates": [Bson::Array(ring)],
        }))
    }

    fn from_native(native: &Bson) -> Result<Option<Self>, TransformError> {
        let Bson::Document(document) = native else {
            return Ok(None);
        };
        if document.get_str("type").ok() != Some(Self::TYPE_NAME) {
            return Ok(None);
        }
        let Some(Bson::Array(ring)) = document
            .get_array("coordinates")
            .ok()
            .and_then(|rings| rings.first())
        else {
            return Ok(None);
        };

        let mut coordinates = Vec::with_capacity(ring.len());
        for point in ring {
            let Bson::Array(pair) = point else {
                return Ok(None);
            };
            let [longitude, latitude] = pair.as_slice() else {
                return Ok(None);
            };
            let (Some(longitude), Some(latitude)) =
                (bson_number_to_json(longitude), bson_number_to_json(latitude))
            else {
                return Ok(None);
            };

            validate_coordinates(
                latitude.as_f64().unwrap_or(f64::NAN),
                longitude.as_f64().unwrap_or(f64::NAN),
            )?;
            coordinates.push([latitude, longitude]);
        }

        Ok(Some(Self { coordinates }))
    }
}

fn same_point(left: &[Number; 2], right: &[Number; 2]) -> bool {
    left[0].as_f64() == right[0].as_f64() && left[1].as_f64() == right[1].as_f64()
}
