use derive_more::Display;
use thiserror::Error as ThisError;

///
/// TransformError
///
/// Structured failure raised by every public transformation entry point.
/// Errors are raised at the point of detection and never partially recovered;
/// a transform either produces a complete native value or one of these.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct TransformError {
    pub code: ErrorCode,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl TransformError {
    pub fn new(code: ErrorCode, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            code,
            origin,
            message: message.into(),
        }
    }

    /// Construct an invalid-JSON error for a specific origin.
    pub(crate) fn invalid_json(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidJson, origin, message)
    }

    /// Construct a codec-origin invalid-JSON error.
    pub(crate) fn codec_invalid(message: impl Into<String>) -> Self {
        Self::invalid_json(ErrorOrigin::Codec, message)
    }

    /// Construct a constraint-origin invalid-JSON error.
    pub(crate) fn constraint_invalid(message: impl Into<String>) -> Self {
        Self::invalid_json(ErrorOrigin::Constraint, message)
    }

    /// Construct an update-origin invalid-JSON error.
    pub(crate) fn update_invalid(message: impl Into<String>) -> Self {
        Self::invalid_json(ErrorOrigin::Update, message)
    }

    /// Construct a decode-origin invariant violation.
    pub(crate) fn decode_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, ErrorOrigin::Decode, message)
    }

    /// Construct an internal error for a specific origin.
    pub(crate) fn internal(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, origin, message)
    }

    /// Nested keys must not carry `$` or `.`.
    pub(crate) fn invalid_nested_key() -> Self {
        Self::new(
            ErrorCode::InvalidNestedKey,
            ErrorOrigin::Value,
            "Nested keys should not contain the '$' or '.' characters",
        )
    }

    /// Construct an unsupported-command error for a specific origin.
    pub(crate) fn command_unavailable(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CommandUnavailable, origin, message)
    }

    /// Recursion bound exceeded while walking nested values.
    pub(crate) fn too_deep(origin: ErrorOrigin, max_depth: usize) -> Self {
        Self::invalid_json(
            origin,
            format!("value nesting exceeds the maximum depth of {max_depth}"),
        )
    }

    #[must_use]
    pub fn display_with_code(&self) -> String {
        format!("{}:{}: {}", self.origin, self.code, self.message)
    }
}

///
/// ErrorCode
///
/// Stable classification shared with the REST error surface.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ErrorCode {
    #[display("invalid_json")]
    InvalidJson,
    #[display("invalid_nested_key")]
    InvalidNestedKey,
    #[display("invalid_key_name")]
    InvalidKeyName,
    #[display("command_unavailable")]
    CommandUnavailable,
    #[display("internal")]
    Internal,
}

impl ErrorCode {
    /// Numeric code reported to REST clients.
    #[must_use]
    pub const fn parse_code(self) -> u16 {
        match self {
            Self::Internal => 1,
            Self::InvalidKeyName => 105,
            Self::InvalidJson => 107,
            Self::CommandUnavailable => 108,
            Self::InvalidNestedKey => 121,
        }
    }
}

///
/// ErrorOrigin
///
/// Component that detected the failure.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ErrorOrigin {
    #[display("acl")]
    Acl,
    #[display("codec")]
    Codec,
    #[display("decode")]
    Decode,
    #[display("key")]
    Key,
    #[display("object")]
    Object,
    #[display("query")]
    Query,
    #[display("constraint")]
    Constraint,
    #[display("update")]
    Update,
    #[display("value")]
    Value,
}

///
/// TESTS
///
