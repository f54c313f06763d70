use crate::{
    codec::{AtomCodec, envelope},
    error::TransformError,
    value::{bson_number_to_json, json_number_to_bson},
};
use bson::Bson;
use serde_json::{Map, Number, Value};

///
/// GeoPoint
///
/// REST `{__type: "GeoPoint", latitude, longitude}` ↔ native `[longitude, latitude]`.
/// The native pair is longitude-first; every geo operator depends on it.
///

#[derive(Clone, Debug, PartialEq)]
pub struct GeoPoint {
    pub latitude: Number,
    pub longitude: Number,
}

impl GeoPoint {
    /// Read `latitude`/`longitude` without requiring the type tag.
    pub(crate) fn from_fields(
        fields: &Map<String, Value>,
        kind: &str,
    ) -> Result<Self, TransformError> {
        let coordinate = |key: &str| match fields.get(key) {
            Some(Value::Number(number)) => Ok(number.clone()),
            _ => Err(TransformError::codec_invalid(format!(
                "{kind} requires a numeric {key}"
            ))),
        };

        Ok(Self {
            latitude: coordinate("latitude")?,
            longitude: coordinate("longitude")?,
        })
    }

    /// Build from a bare `[longitude, latitude]` pair.
    pub(crate) fn from_lng_lat(pair: &[Value]) -> Option<Self> {
        match pair {
            [Value::Number(longitude), Value::Number(latitude)] => Some(Self {
                latitude: latitude.clone(),
                longitude: longitude.clone(),
            }),
            _ => None,
        }
    }

    /// Native `[longitude, latitude]` pair.
    #[must_use]
    pub fn lng_lat(&self) -> Bson {
        Bson::Array(vec![
            json_number_to_bson(&self.longitude),
            json_number_to_bson(&self.latitude),
        ])
    }

    /// Range check: latitude in [-90, 90], longitude in [-180, 180].
    pub fn validate(&self) -> Result<(), TransformError> {
        validate_coordinates(
            self.latitude.as_f64().unwrap_or(f64::NAN),
            self.longitude.as_f64().unwrap_or(f64::NAN),
        )
    }
}

impl AtomCodec for GeoPoint {
    const TYPE_NAME: &'static str = "GeoPoint";

    fn from_envelope(envelope: &Map<String, Value>) -> Result<Self, TransformError> {
        Self::from_fields(envelope, Self::TYPE_NAME)
    }

    fn to_envelope(&self) -> Value {
        envelope(
            Self::TYPE_NAME,
            [
                ("latitude", Value::Number(self.latitude.clone())),
                ("longitude", Value::Number(self.longitude.clone())),
            ],
        )
    }

    fn to_native(&self) -> Result<Bson, TransformError> {
        Ok(self.lng_lat())
    }

    fn from_native(native: &Bson) -> Result<Option<Self>, TransformError> {
        let Bson::Array(pair) = native else {
            return Ok(None);
        };
        let [longitude, latitude] = pair.as_slice() else {
            return Ok(None);
        };

        Ok(bson_number_to_json(longitude)
            .zip(bson_number_to_json(latitude))
            .map(|(longitude, latitude)| Self {
                latitude,
                longitude,
            }))
    }
}

/// Reject non-finite or out-of-range coordinates.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), TransformError> {
    if latitude.is_nan() || longitude.is_nan() {
        return Err(TransformError::codec_invalid(
            "GeoPoint latitude and longitude must be valid numbers",
        ));
    }
    if latitude < -90.0 {
        return Err(TransformError::codec_invalid(format!(
            "GeoPoint latitude out of bounds: {latitude} < -90.0."
        )));
    }
    if latitude > 90.0 {
        return Err(TransformError::codec_invalid(format!(
            "GeoPoint latitude out of bounds: {latitude} > 90.0."
        )));
    }
    if longitude < -180.0 {
        return Err(TransformError::codec_invalid(format!(
            "GeoPoint longitude out of bounds: {longitude} < -180.0."
        )));
    }
    if longitude > 180.0 {
        return Err(TransformError::codec_invalid(format!(
            "GeoPoint longitude out of bounds: {longitude} > 180.0."
        )));
    }

    Ok(())
}
