use crate::{
    codec::{AtomCodec, envelope, required_str},
    error::TransformError,
};
use bson::Bson;
use serde_json::{Map, Value};

///
/// FileAtom
///
/// REST `{__type: "File", name, url?}` ↔ native bare file name.
/// The url is derived by the file adapter and never stored.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileAtom {
    pub name: String,
    pub url: Option<String>,
}

impl AtomCodec for FileAtom {
    const TYPE_NAME: &'static str = "File";

    fn from_envelope(envelope: &Map<String, Value>) -> Result<Self, TransformError> {
        let name = required_str(envelope, Self::TYPE_NAME, "name")?.to_string();
        let url = match envelope.get("url") {
            None | Some(Value::Null) => None,
            Some(Value::String(url)) => Some(url.clone()),
            Some(_) => {
                return Err(TransformError::codec_invalid("File url must be a string"));
            }
        };

        Ok(Self { name, url })
    }

    fn to_envelope(&self) -> Value {
        let url = self.url.clone().map(|url| ("url", Value::String(url)));

        envelope(
            Self::TYPE_NAME,
            std::iter::once(("name", Value::String(self.name.clone()))).chain(url),
        )
    }

    fn to_native(&self) -> Result<Bson, TransformError> {
        Ok(Bson::String(self.name.clone()))
    }

    fn from_native(native: &Bson) -> Result<Option<Self>, TransformError> {
        Ok(match native {
            Bson::String(name) => Some(Self {
                name: name.clone(),
                url: None,
            }),
            _ => None,
        })
    }
}
