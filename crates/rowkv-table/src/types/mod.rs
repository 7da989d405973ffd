//! Value and type definitions for columns.

mod datum;
mod field_type;

pub use datum::Datum;
pub use field_type::{FieldFlags, FieldType, TypeCode};
