use crate::{
    config::TransformConfig,
    decode::ObjectDecoder,
    error::{ErrorOrigin, TransformError},
    query::QueryCompiler,
    schema::ClassSchema,
    update::ObjectAssembler,
    value::Depth,
};
use bson::Document;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Reference clock for `$relativeTime`.
pub type Clock = fn() -> DateTime<Utc>;

///
/// Transformer
///
/// Entry point for every REST ↔ native translation. Holds no per-request
/// state; one instance can serve any number of concurrent calls.
///

#[derive(Clone, Debug)]
pub struct Transformer {
    config: TransformConfig,
    clock: Clock,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new(TransformConfig::default())
    }
}

impl Transformer {
    #[must_use]
    pub fn new(config: TransformConfig) -> Self {
        Self {
            config,
            clock: Utc::now,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Compile a REST where clause into a native query.
    ///
    /// `count` marks count-only queries, where `$nearSphere` is rewritten
    /// into a `$geoWithin` sphere.
    pub fn transform_where(
        &self,
        class_name: &str,
        rest_where: &Map<String, Value>,
        schema: &ClassSchema,
        count: bool,
    ) -> Result<Document, TransformError> {
        let compiler = QueryCompiler {
            class_name,
            schema,
            config: &self.config,
            count,
            now: (self.clock)(),
        };

        compiler.compile(rest_where, Depth::new(self.config.max_depth, ErrorOrigin::Query))
    }

    /// Native document for creating a REST object.
    pub fn transform_create(
        &self,
        class_name: &str,
        object: &Map<String, Value>,
        schema: &ClassSchema,
    ) -> Result<Document, TransformError> {
        self.assembler(class_name, schema).create(object)
    }

    /// Native update-operator document for a REST update.
    pub fn transform_update(
        &self,
        class_name: &str,
        update: &Map<String, Value>,
        schema: &ClassSchema,
    ) -> Result<Document, TransformError> {
        self.assembler(class_name, schema).update(update)
    }

    /// Decode a stored native document back into its REST object.
    pub fn decode_object(
        &self,
        class_name: &str,
        document: &Document,
        schema: &ClassSchema,
    ) -> Result<Map<String, Value>, TransformError> {
        let decoder = ObjectDecoder {
            class_name,
            schema,
            config: &self.config,
        };

        decoder.decode(document)
    }

    const fn assembler<'a>(&'a self, class_name: &'a str, schema: &'a ClassSchema) -> ObjectAssembler<'a> {
        ObjectAssembler {
            class_name,
            schema,
            config: &self.config,
        }
    }
}

///
/// TESTS
///
