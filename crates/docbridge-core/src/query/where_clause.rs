use crate::{
    config::TransformConfig,
    error::{ErrorOrigin, TransformError},
    key::{
        AUTH_DATA_PREFIX, INTERNAL_TIME_FIELDS, KeyRole, NATIVE_ID_KEY, OBJECT_ID_KEY,
        auth_data_id_provider, map_key_for_query, reserved_key,
    },
    query::transform_constraint,
    schema::{ClassSchema, FieldType},
    transform::{
        Transformed, interior_atom_or_verbatim, transform_interior_atom, transform_top_level_atom,
    },
    value::{Depth, integer_id, json_to_bson, string_to_date},
};
use bson::{Bson, Document, doc};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

const NOR_KEY: &str = "$nor";

// Query keys whose values are matched exactly as given.
const VERBATIM_KEYS: &[&str] = &[
    "_failed_login_count",
    "_rperm",
    "_wperm",
    "_perishable_token",
    "_email_verify_token",
];

///
/// QueryCompiler
///
/// Compiles a REST where clause for one class into a native query.
///

pub(crate) struct QueryCompiler<'a> {
    pub class_name: &'a str,
    pub schema: &'a ClassSchema,
    pub config: &'a TransformConfig,
    pub count: bool,
    pub now: DateTime<Utc>,
}

impl QueryCompiler<'_> {
    pub(crate) fn compile(
        &self,
        rest_where: &Map<String, Value>,
        depth: Depth,
    ) -> Result<Document, TransformError> {
        let depth = depth.descend()?;

        let mut query = Document::new();
        for (key, value) in rest_where {
            let (native_key, native) = self.compile_key(key, value, depth)?;
            insert_clause(&mut query, native_key, native);
        }

        Ok(query)
    }

    fn compile_key(
        &self,
        key: &str,
        value: &Value,
        depth: Depth,
    ) -> Result<(String, Bson), TransformError> {
        match key {
            OBJECT_ID_KEY => {
                let native = match value {
                    Value::String(_) | Value::Number(_)
                        if self.config.has_numeric_ids(self.class_name) =>
                    {
                        integer_id(value, ErrorOrigin::Query)?
                    }
                    _ => json_to_bson(value, depth)?,
                };
                return Ok((NATIVE_ID_KEY.to_string(), native));
            }
            "sessionToken" => {
                return Ok(("_session_token".to_string(), json_to_bson(value, depth)?));
            }
            "timesUsed" => return Ok(("times_used".to_string(), json_to_bson(value, depth)?)),
            "$or" | "$and" | "$nor" => {
                return self.compile_combinator(key, value, depth).map(|native| (key.to_string(), native));
            }
            _ if VERBATIM_KEYS.contains(&key) => {
                return Ok((key.to_string(), json_to_bson(value, depth)?));
            }
            _ => {}
        }

        if let Some(provider) = auth_data_id_provider(key) {
            return Ok((
                format!("{AUTH_DATA_PREFIX}{provider}.id"),
                json_to_bson(value, depth)?,
            ));
        }

        let native_key = map_key_for_query(key, self.schema);
        if is_time_key(key)
            && let Value::String(text) = value
            && let Ok(date) = string_to_date(text)
        {
            return Ok((native_key, date));
        }

        let field = self.schema.field(key);
        if let Transformed::Value(constraint) =
            transform_constraint(value, field, self.count, self.now, depth)?
        {
            if let Some(text) = constraint.get("$text") {
                return Ok(("$text".to_string(), text.clone()));
            }
            if constraint.contains_key("$elemMatch") {
                let mut negated = Document::new();
                negated.insert(native_key, constraint);
                return Ok((NOR_KEY.to_string(), Bson::Array(vec![Bson::Document(negated)])));
            }
            return Ok((native_key, Bson::Document(constraint)));
        }

        if field.is_some_and(|field| field.is(FieldType::Array)) && !value.is_array() {
            let element = interior_atom_or_verbatim(value, depth)?;
            return Ok((native_key, Bson::Document(doc! { "$all": [element] })));
        }

        let transformed = if key.contains('.') {
            transform_interior_atom(value)?
        } else {
            transform_top_level_atom(value, field)?
        };
        match transformed {
            Transformed::Value(native) => Ok((native_key, native)),
            Transformed::CannotTransform => Err(TransformError::invalid_json(
                ErrorOrigin::Query,
                format!("You cannot use {value} as a query parameter."),
            )),
        }
    }

    fn compile_combinator(
        &self,
        key: &str,
        value: &Value,
        depth: Depth,
    ) -> Result<Bson, TransformError> {
        let Value::Array(clauses) = value else {
            return Err(TransformError::invalid_json(
                ErrorOrigin::Query,
                format!("bad {key} format - use an array value"),
            ));
        };

        clauses
            .iter()
            .map(|clause| match clause {
                Value::Object(clause) => self.compile(clause, depth).map(Bson::Document),
                _ => Err(TransformError::invalid_json(
                    ErrorOrigin::Query,
                    format!("bad {key} format - use an array of objects"),
                )),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Bson::Array)
    }
}

// A `$nor` from a `$containedBy` field joins any `$nor` already present.
fn insert_clause(query: &mut Document, key: String, native: Bson) {
    if key == NOR_KEY
        && let Some(Bson::Array(existing)) = query.get_mut(NOR_KEY)
        && let Bson::Array(clauses) = &native
    {
        existing.extend(clauses.iter().cloned());
        return;
    }

    query.insert(key, native);
}

// Date-valued keys accept a bare ISO string.
fn is_time_key(key: &str) -> bool {
    INTERNAL_TIME_FIELDS.contains(&key)
        || reserved_key(key).is_some_and(|mapped| mapped.role == KeyRole::Time)
}
