//! Row reads: point lookups, scans and seeks.

use std::collections::HashMap;

use rowkv_common::Key;
use rowkv_kv::next_until;
use tracing::debug;

use super::Table;
use crate::codec::key::{decode_handle, record_key_with_handle};
use crate::codec::row::decode_row;
use crate::column::Column;
use crate::error::{TableError, TableResult};
use crate::session::TableContext;
use crate::types::{Datum, FieldType};

impl Table {
    /// Reads the public columns of the row stored under `handle`.
    pub fn row(&self, ctx: &mut dyn TableContext, handle: i64) -> TableResult<Vec<Datum>> {
        self.row_with_cols(ctx, handle, &self.public_columns)
    }

    /// Reads `cols` of the row stored under `handle`, in the order given.
    ///
    /// The handle column reads as the handle. A NOT NULL column missing from
    /// the stored row is an error; a nullable one reads as NULL.
    pub fn row_with_cols(
        &self,
        ctx: &mut dyn TableContext,
        handle: i64,
        cols: &[Column],
    ) -> TableResult<Vec<Datum>> {
        let value = ctx
            .txn()
            .get(&self.record_key(handle))
            .map_err(|e| TableError::store("reading record", e))?
            .ok_or(TableError::RowNotFound {
                table: self.id,
                handle,
            })?;

        let mut types: HashMap<_, FieldType> = HashMap::with_capacity(cols.len());
        for col in cols.iter().filter(|c| !self.is_pk_handle(c)) {
            types.insert(col.id, col.field_type.clone());
        }
        let decoded = decode_row(&value, &types)?;

        cols.iter()
            .map(|col| {
                if self.is_pk_handle(col) {
                    return Ok(Self::handle_datum(col, handle));
                }
                match decoded.get(&col.id) {
                    Some(datum) => Ok(datum.clone()),
                    None if col.field_type.is_not_null() => Err(TableError::MissingColumn {
                        table: self.id,
                        handle,
                        column: col.name.clone(),
                    }),
                    None => Ok(Datum::Null),
                }
            })
            .collect()
    }

    /// Visits rows in handle order starting at `start_key`.
    ///
    /// `visit` receives the handle, the values of `cols` and `cols` itself;
    /// returning `Ok(false)` stops the scan. The scan ends at the first key
    /// outside the table's records. Columns are filled as in
    /// [`row_with_cols`](Self::row_with_cols).
    pub fn iter_records<F>(
        &self,
        ctx: &mut dyn TableContext,
        start_key: &Key,
        cols: &[Column],
        mut visit: F,
    ) -> TableResult<()>
    where
        F: FnMut(i64, Vec<Datum>, &[Column]) -> TableResult<bool>,
    {
        let mut it = ctx
            .txn()
            .seek(start_key)
            .map_err(|e| TableError::store("seeking records", e))?;
        if !it.valid() {
            return Ok(());
        }
        debug!(table = %self.meta.name, %start_key, key = %it.key(), "iterating records");

        let types: HashMap<_, FieldType> = cols
            .iter()
            .map(|c| (c.id, c.field_type.clone()))
            .collect();

        while it.valid() && it.key().starts_with(&self.record_prefix) {
            let handle = decode_handle(it.key())?;
            let mut decoded = decode_row(it.value(), &types)?;
            let data = cols
                .iter()
                .map(|col| {
                    if self.is_pk_handle(col) {
                        return Ok(Self::handle_datum(col, handle));
                    }
                    match decoded.remove(&col.id) {
                        Some(datum) => Ok(datum),
                        None if col.field_type.is_not_null() => Err(TableError::MissingColumn {
                            table: self.id,
                            handle,
                            column: col.name.clone(),
                        }),
                        None => Ok(Datum::Null),
                    }
                })
                .collect::<TableResult<Vec<Datum>>>()?;

            if !visit(handle, data, cols)? {
                return Ok(());
            }

            let record = self.record_key(handle);
            next_until(&mut *it, |k| !k.starts_with(&record))
                .map_err(|e| TableError::store("advancing record iterator", e))?;
        }
        Ok(())
    }

    /// Returns the smallest handle `>= handle` with a stored row.
    pub fn seek(&self, ctx: &mut dyn TableContext, handle: i64) -> TableResult<Option<i64>> {
        let it = ctx
            .txn()
            .seek(&record_key_with_handle(self.id, handle))
            .map_err(|e| TableError::store("seeking record", e))?;
        if !it.valid() || !it.key().starts_with(&self.record_prefix) {
            return Ok(None);
        }
        decode_handle(it.key()).map(Some)
    }
}
