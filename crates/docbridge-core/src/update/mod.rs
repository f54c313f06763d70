//! Module: update
//! Responsibility: atomic update operations and the create/update object
//! assemblers that bucket per-field results into native documents.
//! Does not own: relation mutations, which run through a separate path.

mod object;
mod operator;


pub(crate) use object::ObjectAssembler;
pub use operator::{
    NativeUpdate, NativeUpdateOp, UpdateOperation, UpdateOutput, transform_update_operator,
};
