use crate::{
    codec::{AtomCodec, envelope, required_str},
    error::{ErrorOrigin, TransformError},
};
use bson::{Binary, Bson, spec::BinarySubtype};
use serde_json::{Map, Value};

///
/// BytesAtom
///
/// REST `{__type: "Bytes", base64}` ↔ native binary blob.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BytesAtom {
    pub base64: String,
}

///
/// NativeBytes
///
/// The two native shapes a Bytes value is read back from. Some drivers hand
/// back the stored base64 text instead of the binary wrapper; the literal
/// variant exists only to read those documents and is never written.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NativeBytes<'a> {
    Wrapped(&'a Binary),
    LiteralBase64(&'a str),
}

impl<'a> NativeBytes<'a> {
    #[must_use]
    pub fn resolve(native: &'a Bson) -> Option<Self> {
        match native {
            Bson::Binary(binary) => Some(Self::Wrapped(binary)),
            Bson::String(text) if looks_like_base64(text) => Some(Self::LiteralBase64(text)),
            _ => None,
        }
    }

    pub fn to_base64(self) -> Result<String, TransformError> {
        match self {
            Self::Wrapped(binary) => encode_base64(binary),
            Self::LiteralBase64(text) => Ok(text.to_string()),
        }
    }
}

impl BytesAtom {
    fn decode(&self) -> Result<Binary, TransformError> {
        Binary::from_base64(&self.base64, BinarySubtype::Generic)
            .map_err(|err| TransformError::codec_invalid(format!("invalid base64 bytes: {err}")))
    }
}

impl AtomCodec for BytesAtom {
    const TYPE_NAME: &'static str = "Bytes";

    fn from_envelope(envelope: &Map<String, Value>) -> Result<Self, TransformError> {
        let atom = Self {
            base64: required_str(envelope, Self::TYPE_NAME, "base64")?.to_string(),
        };
        atom.decode()?;

        Ok(atom)
    }

    fn to_envelope(&self) -> Value {
        envelope(Self::TYPE_NAME, [("base64", Value::String(self.base64.clone()))])
    }

    fn to_native(&self) -> Result<Bson, TransformError> {
        self.decode().map(Bson::Binary)
    }

    fn from_native(native: &Bson) -> Result<Option<Self>, TransformError> {
        NativeBytes::resolve(native)
            .map(|bytes| bytes.to_base64().map(|base64| Self { base64 }))
            .transpose()
    }
}

/// Matches `^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$`.
/// The empty string qualifies.
#[must_use]
pub fn looks_like_base64(text: &str) -> bool {
    if text.len() % 4 != 0 {
        return false;
    }

    let body = text.trim_end_matches('=');
    let padding = text.len() - body.len();

    padding <= 2
        && body
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'+' || byte == b'/')
}

// The driver's canonical extended-JSON rendering carries the standard
// base64 text of the payload.
fn encode_base64(binary: &Binary) -> Result<String, TransformError> {
    let rendered = Bson::Binary(binary.clone()).into_relaxed_extjson();

    rendered
        .get("$binary")
        .and_then(|inner| inner.get("base64"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            TransformError::internal(
                ErrorOrigin::Codec,
                format!("binary payload rendered without base64 text: {rendered}"),
            )
        })
}
