use crate::{
    codec::{AtomCodec, envelope, required_str},
    error::TransformError,
};
use bson::Bson;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

///
/// DateAtom
///
/// REST `{__type: "Date", iso}` ↔ native datetime (millisecond precision).
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DateAtom(pub DateTime<Utc>);

impl DateAtom {
    #[must_use]
    pub fn iso(&self) -> String {
        format_iso(self.0)
    }
}

impl AtomCodec for DateAtom {
    const TYPE_NAME: &'static str = "Date";

    fn from_envelope(envelope: &Map<String, Value>) -> Result<Self, TransformError> {
        let iso = required_str(envelope, Self::TYPE_NAME, "iso")?;

        parse_iso(iso).map(Self)
    }

    fn to_envelope(&self) -> Value {
        envelope(Self::TYPE_NAME, [("iso", Value::String(self.iso()))])
    }

    fn to_native(&self) -> Result<Bson, TransformError> {
        Ok(Bson::DateTime(bson::DateTime::from_chrono(self.0)))
    }

    fn from_native(native: &Bson) -> Result<Option<Self>, TransformError> {
        Ok(match native {
            Bson::DateTime(datetime) => Some(Self(datetime.to_chrono())),
            _ => None,
        })
    }
}

/// Parse an ISO-8601 timestamp. Offsets are normalized to UTC; a bare date
/// or an offset-less date-time is read as UTC.
pub(crate) fn parse_iso(text: &str) -> Result<DateTime<Utc>, TransformError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Some(naive) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc());
    }

    Err(TransformError::codec_invalid(format!(
        "invalid date: '{text}'"
    )))
}

/// Render in the REST wire shape: UTC, millisecond precision, `Z` suffix.
pub(crate) fn format_iso(datetime: DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}
