//! Row payload encoding.
//!
//! A stored row is a flat sequence of `(column id, datum)` pairs, both in
//! value encoding. Columns not present in the payload read back as absent,
//! which is how rows written before a column was added stay readable.

use std::collections::HashMap;

use rowkv_common::ColumnId;

use super::datum::{decode_one, encode_value, NIL_FLAG};
use crate::error::{TableError, TableResult};
use crate::types::{Datum, FieldType};

/// Encodes `values` under the matching `col_ids`.
///
/// An empty row encodes as a single NIL flag so the stored value is never
/// empty.
pub fn encode_row(values: &[Datum], col_ids: &[ColumnId]) -> TableResult<Vec<u8>> {
    if values.len() != col_ids.len() {
        return Err(TableError::codec(format!(
            "{} values for {} column ids",
            values.len(),
            col_ids.len()
        )));
    }
    if values.is_empty() {
        return Ok(vec![NIL_FLAG]);
    }

    let mut buf = Vec::with_capacity(values.len() * 10);
    for (id, value) in col_ids.iter().zip(values) {
        encode_value(&mut buf, &[Datum::Int(id.as_i64())])?;
        encode_value(&mut buf, std::slice::from_ref(value))?;
    }
    Ok(buf)
}

/// Decodes the columns listed in `cols`, converting each to its field type.
///
/// Columns missing from the payload are missing from the result. Columns in
/// the payload but not in `cols` are skipped.
pub fn decode_row(
    data: &[u8],
    cols: &HashMap<ColumnId, FieldType>,
) -> TableResult<HashMap<ColumnId, Datum>> {
    let mut row = HashMap::with_capacity(cols.len());
    if data.is_empty() || data == [NIL_FLAG] {
        return Ok(row);
    }

    let mut rest = data;
    while !rest.is_empty() {
        let (id, after_id) = decode_one(rest)?;
        let id = match id {
            Datum::Int(id) => ColumnId::new(id),
            other => {
                return Err(TableError::codec(format!(
                    "expected column id in row payload, found {other:?}"
                )))
            }
        };
        let (value, after_value) = decode_one(after_id)?;
        rest = after_value;

        if let Some(ft) = cols.get(&id) {
            row.insert(id, ft.unflatten(value)?);
            if row.len() == cols.len() {
                break;
            }
        }
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldFlags, TypeCode};

    fn ids(raw: &[i64]) -> Vec<ColumnId> {
        raw.iter().copied().map(ColumnId::new).collect()
    }

    #[test]
    fn test_round_trip_subset() {
        let values = vec![Datum::Int(1), Datum::from("alice"), Datum::Null];
        let data = encode_row(&values, &ids(&[1, 2, 3])).unwrap();

        let mut cols = HashMap::new();
        cols.insert(ColumnId::new(2), FieldType::varchar());
        cols.insert(ColumnId::new(3), FieldType::long_long());
        let row = decode_row(&data, &cols).unwrap();

        assert_eq!(row.len(), 2);
        assert_eq!(row[&ColumnId::new(2)], Datum::from("alice"));
        assert_eq!(row[&ColumnId::new(3)], Datum::Null);
    }

    #[test]
    fn test_empty_row() {
        let data = encode_row(&[], &[]).unwrap();
        assert_eq!(data, vec![NIL_FLAG]);

        let mut cols = HashMap::new();
        cols.insert(ColumnId::new(1), FieldType::long_long());
        assert!(decode_row(&data, &cols).unwrap().is_empty());
    }

    #[test]
    fn test_absent_column() {
        let data = encode_row(&[Datum::Int(5)], &ids(&[1])).unwrap();
        let mut cols = HashMap::new();
        cols.insert(ColumnId::new(9), FieldType::long_long());
        assert!(decode_row(&data, &cols).unwrap().is_empty());
    }

    #[test]
    fn test_unflatten_on_decode() {
        let data = encode_row(&[Datum::Int(-1)], &ids(&[4])).unwrap();
        let mut cols = HashMap::new();
        cols.insert(
            ColumnId::new(4),
            FieldType::new(TypeCode::LongLong).with_flags(FieldFlags::UNSIGNED),
        );
        let row = decode_row(&data, &cols).unwrap();
        assert_eq!(row[&ColumnId::new(4)], Datum::Uint(u64::MAX));
    }

    #[test]
    fn test_length_mismatch() {
        assert!(encode_row(&[Datum::Int(1)], &[]).is_err());
    }

    #[test]
    fn test_corrupt_payload() {
        let mut cols = HashMap::new();
        cols.insert(ColumnId::new(1), FieldType::long_long());
        assert!(decode_row(&[0x03, 0x80], &cols).is_err());
        // Column id must be an integer.
        let bad = [super::super::datum::COMPACT_BYTES_FLAG, 0, 0, 0, 0, NIL_FLAG];
        assert!(decode_row(&bad, &cols).is_err());
    }
}
