//! The field-level CRDT document model.
//!
//! A [`Document`] is a map of named [`Field`]s. Field merge is last-writer-
//! wins on the field's HLC; document merge is the field-wise merge of the
//! union of field names. Both are commutative, associative, and idempotent.

mod document;
mod field;

pub use document::Document;
pub use field::Field;
