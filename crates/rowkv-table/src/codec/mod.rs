//! Byte encodings for rows, datums and keys.
//!
//! - [`datum`]: flag-prefixed datum encoding (memcomparable key form and
//!   compact value form)
//! - [`row`]: row payloads as `(column id, datum)` pairs
//! - [`key`]: record and index key layout

pub mod datum;
pub mod key;
pub mod row;

pub use datum::{decode, decode_one, encode_key, encode_value, key_bytes, value_bytes};
pub use key::{
    decode_handle, decode_record_key, index_key_prefix, index_prefix, record_key,
    record_key_with_handle, record_prefix, table_prefix,
};
pub use row::{decode_row, encode_row};
