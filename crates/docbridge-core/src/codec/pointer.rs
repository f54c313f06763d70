use crate::{
    codec::{AtomCodec, envelope, required_str},
    error::TransformError,
};
use bson::{Bson, doc};
use serde_json::{Map, Value};

///
/// PointerAtom
///
/// REST `{__type: "Pointer", className, objectId}`. Top-level pointers are
/// stored as the pointer string `ClassName$objectId`; pointers nested inside
/// arrays or objects keep their envelope shape.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PointerAtom {
    pub class_name: String,
    pub object_id: String,
}

impl PointerAtom {
    #[must_use]
    pub fn pointer_string(&self) -> String {
        format!("{}${}", self.class_name, self.object_id)
    }

    /// Split `ClassName$objectId` at the first `$`.
    pub fn parse_pointer_string(text: &str) -> Result<Self, TransformError> {
        let (class_name, object_id) = text.split_once('$').ok_or_else(|| {
            TransformError::decode_internal(format!("invalid pointer string: '{text}'"))
        })?;

        Ok(Self {
            class_name: class_name.to_string(),
            object_id: object_id.to_string(),
        })
    }

    /// Envelope kept verbatim for nested positions.
    #[must_use]
    pub fn nested_native(&self) -> Bson {
        Bson::Document(doc! {
            "__type": Self::TYPE_NAME,
            "className": self.class_name.as_str(),
            "objectId": self.object_id.as_str(),
        })
    }
}

impl AtomCodec for PointerAtom {
    const TYPE_NAME: &'static str = "Pointer";

    fn from_envelope(envelope: &Map<String, Value>) -> Result<Self, TransformError> {
        Ok(Self {
            class_name: required_str(envelope, Self::TYPE_NAME, "className")?.to_string(),
            object_id: required_str(envelope, Self::TYPE_NAME, "objectId")?.to_string(),
        })
    }

    fn to_envelope(&self) -> Value {
        envelope(
            Self::TYPE_NAME,
            [
                ("className", Value::String(self.class_name.clone())),
                ("objectId", Value::String(self.object_id.clone())),
            ],
        )
    }

    fn to_native(&self) -> Result<Bson, TransformError> {
        Ok(Bson::String(self.pointer_string()))
    }

    fn from_native(native: &Bson) -> Result<Option<Self>, TransformError> {
        match native {
            Bson::String(text) => Self::parse_pointer_string(text).map(Some),
            _ => Ok(None),
        }
    }
}

///
/// RelationAtom
///
/// REST `{__type: "Relation", className}`. Relations have no stored form of
/// their own; the decoder synthesizes them from the schema.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationAtom {
    pub class_name: String,
}

impl RelationAtom {
    pub const TYPE_NAME: &'static str = "Relation";

    pub(crate) fn from_envelope(envelope: &Map<String, Value>) -> Result<Self, TransformError> {
        Ok(Self {
            class_name: required_str(envelope, Self::TYPE_NAME, "className")?.to_string(),
        })
    }

    #[must_use]
    pub fn to_envelope(&self) -> Value {
        envelope(
            Self::TYPE_NAME,
            [("className", Value::String(self.class_name.clone()))],
        )
    }
}
