use crate::{
    error::{ErrorOrigin, TransformError},
    transform::interior_atom_or_verbatim,
    value::{Depth, json_number_to_bson, json_to_bson},
};
use bson::{Bson, doc};
use serde_json::{Map, Number, Value};

///
/// UpdateOperation
///
/// REST atomic update `{__op: ..., amount?, objects?}` scoped to one field.
///

#[derive(Clone, Debug, PartialEq)]
pub enum UpdateOperation<'a> {
    Delete,
    Increment(&'a Number),
    SetOnInsert(&'a Value),
    Add(&'a [Value]),
    AddUnique(&'a [Value]),
    Remove(&'a [Value]),
}

impl<'a> UpdateOperation<'a> {
    pub fn parse(operation: &'a Map<String, Value>) -> Result<Self, TransformError> {
        let op = operation.get("__op").and_then(Value::as_str).unwrap_or_default();
        let objects = |message: &str| match operation.get("objects") {
            Some(Value::Array(objects)) => Ok(objects.as_slice()),
            _ => Err(TransformError::update_invalid(message)),
        };

        Ok(match op {
            "Delete" => Self::Delete,
            "Increment" => match operation.get("amount") {
                Some(Value::Number(amount)) => Self::Increment(amount),
                _ => {
                    return Err(TransformError::update_invalid(
                        "incrementing must provide a number",
                    ));
                }
            },
            "SetOnInsert" => Self::SetOnInsert(operation.get("amount").unwrap_or(&Value::Null)),
            "Add" => Self::Add(objects("objects to add must be an array")?),
            "AddUnique" => Self::AddUnique(objects("objects to add must be an array")?),
            "Remove" => Self::Remove(objects("objects to remove must be an array")?),
            _ => {
                let shown = match operation.get("__op") {
                    Some(Value::String(op)) => op.clone(),
                    Some(other) => other.to_string(),
                    None => "undefined".to_string(),
                };
                return Err(TransformError::command_unavailable(
                    ErrorOrigin::Update,
                    format!("The {shown} operator is not supported yet."),
                ));
            }
        })
    }
}

///
/// NativeUpdateOp
///
/// Top-level native update operator a field lands under.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NativeUpdateOp {
    Set,
    Unset,
    Inc,
    SetOnInsert,
    Push,
    AddToSet,
    PullAll,
}

impl NativeUpdateOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "$set",
            Self::Unset => "$unset",
            Self::Inc => "$inc",
            Self::SetOnInsert => "$setOnInsert",
            Self::Push => "$push",
            Self::AddToSet => "$addToSet",
            Self::PullAll => "$pullAll",
        }
    }
}

///
/// NativeUpdate
///
/// One field's contribution to a native update operator bucket.
///

#[derive(Clone, Debug, PartialEq)]
pub struct NativeUpdate {
    pub op: NativeUpdateOp,
    pub arg: Bson,
}

///
/// UpdateOutput
///
/// `Omit` means the field is left out entirely, which differs from
/// storing an explicit null.
///

#[derive(Clone, Debug, PartialEq)]
pub enum UpdateOutput {
    Operator(NativeUpdate),
    Flat(Bson),
    Omit,
}

/// Compile one field's atomic update.
///
/// With `flatten` the result is the value the field would hold after the
/// operation on an absent field; otherwise it is a native update operator.
pub fn transform_update_operator(
    operation: &Map<String, Value>,
    flatten: bool,
    depth: Depth,
) -> Result<UpdateOutput, TransformError> {
    let operator = |op, arg| Ok(UpdateOutput::Operator(NativeUpdate { op, arg }));

    match UpdateOperation::parse(operation)? {
        UpdateOperation::Delete if flatten => Ok(UpdateOutput::Omit),
        UpdateOperation::Delete => operator(NativeUpdateOp::Unset, Bson::String(String::new())),

        UpdateOperation::Increment(amount) if flatten => {
            Ok(UpdateOutput::Flat(json_number_to_bson(amount)))
        }
        UpdateOperation::Increment(amount) => {
            operator(NativeUpdateOp::Inc, json_number_to_bson(amount))
        }

        UpdateOperation::SetOnInsert(amount) if flatten => {
            Ok(UpdateOutput::Flat(json_to_bson(amount, depth)?))
        }
        UpdateOperation::SetOnInsert(amount) => {
            operator(NativeUpdateOp::SetOnInsert, json_to_bson(amount, depth)?)
        }

        UpdateOperation::Add(objects) | UpdateOperation::AddUnique(objects) if flatten => {
            transform_objects(objects, depth).map(UpdateOutput::Flat)
        }
        UpdateOperation::Add(objects) => operator(
            NativeUpdateOp::Push,
            Bson::Document(doc! { "$each": transform_objects(objects, depth)? }),
        ),
        UpdateOperation::AddUnique(objects) => operator(
            NativeUpdateOp::AddToSet,
            Bson::Document(doc! { "$each": transform_objects(objects, depth)? }),
        ),

        UpdateOperation::Remove(objects) => {
            let removed = transform_objects(objects, depth)?;
            if flatten {
                Ok(UpdateOutput::Flat(Bson::Array(Vec::new())))
            } else {
                operator(NativeUpdateOp::PullAll, removed)
            }
        }
    }
}

fn transform_objects(objects: &[Value], depth: Depth) -> Result<Bson, TransformError> {
    objects
        .iter()
        .map(|object| interior_atom_or_verbatim(object, depth))
        .collect::<Result<Vec<_>, _>>()
        .map(Bson::Array)
}
