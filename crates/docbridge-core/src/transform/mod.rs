//! Module: transform
//! Responsibility: REST value → native value for single values, both at the
//! top level of an object and nested inside arrays/objects.
//! Does not own: key renaming or bucketing into documents; see `key`,
//! `query` and `update`.

mod atom;
mod value;


pub use atom::{interior_atom_or_verbatim, transform_interior_atom, transform_top_level_atom};
pub(crate) use value::{OP_KEY, transform_interior_value};

///
/// Transformed
///
/// Outcome of a transform that may not apply to its input.
/// `CannotTransform` is control flow ("try the next fallback"), never an
/// error and never a value; public entry points turn an exhausted fallback
/// chain into a `TransformError`.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Transformed<T> {
    Value(T),
    CannotTransform,
}

impl<T> Transformed<T> {
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::CannotTransform => None,
        }
    }

    #[must_use]
    pub const fn is_transformed(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}
