//! Core of docbridge: schema-aware translation between REST objects/queries
//! and native document-store documents, plus the decoder back to REST.

// public exports are one module level down
pub mod acl;
pub mod codec;
pub mod config;
pub mod error;
pub mod key;
pub mod query;
pub mod schema;
pub mod transform;
pub mod update;
pub mod value;

mod decode;
mod transformer;

pub use transformer::{Clock, Transformer};

///
/// Prelude
///
/// Prelude contains the entry point and the schema vocabulary.
/// Codecs, compilers and error details stay in their modules.
///

pub mod prelude {
    pub use crate::{
        config::TransformConfig,
        schema::{ClassSchema, FieldSchema, FieldType},
        transformer::Transformer,
    };
}
