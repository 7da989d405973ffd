//! Key layout.
//!
//! ```text
//! record key:  t{table_id}_r{handle}
//! index key:   t{table_id}_i{index_id}{encoded values}[{handle}]
//! ```
//!
//! Ids and handles are comparable-encoded 8-byte integers, so records of a
//! table sort by handle and index entries sort by their values.

use rowkv_common::constants::{
    ENCODED_INT_LEN, INDEX_PREFIX_SEP, RECORD_KEY_LEN, RECORD_PREFIX_LEN, RECORD_PREFIX_SEP,
    TABLE_PREFIX,
};
use rowkv_common::{IndexId, Key, TableId};

use super::datum::{decode_int, encode_int};
use crate::error::{TableError, TableResult};

fn table_key(table_id: TableId, sep: &[u8], extra: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(RECORD_PREFIX_LEN + extra);
    buf.extend_from_slice(TABLE_PREFIX);
    encode_int(&mut buf, table_id.as_i64());
    buf.extend_from_slice(sep);
    buf
}

/// Returns `t{table_id}`, the prefix of every key the table owns.
#[must_use]
pub fn table_prefix(table_id: TableId) -> Key {
    Key::from_vec(table_key(table_id, &[], 0))
}

/// Returns `t{table_id}_r`.
#[inline]
#[must_use]
pub fn record_prefix(table_id: TableId) -> Key {
    Key::from_vec(table_key(table_id, RECORD_PREFIX_SEP, 0))
}

/// Returns `t{table_id}_i`.
#[inline]
#[must_use]
pub fn index_prefix(table_id: TableId) -> Key {
    Key::from_vec(table_key(table_id, INDEX_PREFIX_SEP, 0))
}

/// Returns `t{table_id}_i{index_id}`, the prefix of one index's entries.
#[must_use]
pub fn index_key_prefix(table_id: TableId, index_id: IndexId) -> Key {
    let mut buf = table_key(table_id, INDEX_PREFIX_SEP, ENCODED_INT_LEN);
    encode_int(&mut buf, index_id.as_i64());
    Key::from_vec(buf)
}

/// Appends `handle` to a record prefix.
#[inline]
#[must_use]
pub fn record_key(record_prefix: &Key, handle: i64) -> Key {
    let mut buf = Vec::with_capacity(record_prefix.len() + ENCODED_INT_LEN);
    buf.extend_from_slice(record_prefix);
    encode_int(&mut buf, handle);
    Key::from_vec(buf)
}

/// Returns the record key of `handle` in `table_id`.
#[must_use]
pub fn record_key_with_handle(table_id: TableId, handle: i64) -> Key {
    let mut buf = table_key(table_id, RECORD_PREFIX_SEP, ENCODED_INT_LEN);
    encode_int(&mut buf, handle);
    Key::from_vec(buf)
}

/// Splits a record key into its table id and handle.
pub fn decode_record_key(key: &[u8]) -> TableResult<(TableId, i64)> {
    if key.len() != RECORD_KEY_LEN || !key.starts_with(TABLE_PREFIX) {
        return Err(TableError::codec(format!(
            "invalid record key {}",
            hex::encode(key)
        )));
    }
    let (table_id, rest) = decode_int(&key[TABLE_PREFIX.len()..])?;
    let Some(rest) = rest.strip_prefix(RECORD_PREFIX_SEP) else {
        return Err(TableError::codec(format!(
            "invalid record key {}",
            hex::encode(key)
        )));
    };
    let (handle, _) = decode_int(rest)?;
    Ok((TableId::new(table_id), handle))
}

/// Returns the handle of a record key.
pub fn decode_handle(key: &[u8]) -> TableResult<i64> {
    decode_record_key(key).map(|(_, handle)| handle)
}
