//! Row writes: insert, update, remove and truncate.

use rowkv_common::constants::PRIMARY_KEY_NAME;
use rowkv_common::{ColumnId, Value};
use rowkv_kv::{delete_key_with_prefix, BufferStore, KeyConflict, Mutator, PresumeKeyNotExists, Retriever};
use tracing::{debug, trace};

use super::{value_at, Table};
use crate::codec::datum::{key_bytes, value_bytes};
use crate::codec::row::encode_row;
use crate::column::{Column, TouchedColumns};
use crate::error::{TableError, TableResult};
use crate::index::Index;
use crate::session::TableContext;
use crate::types::Datum;

impl Table {
    /// Inserts `row`, one datum per column in offset order, and returns its
    /// handle.
    ///
    /// The handle is the handle column's value when the primary key is the
    /// handle, otherwise a fresh one from the allocator. Columns still being
    /// added are written with their default.
    pub fn add_record(&self, ctx: &mut dyn TableContext, row: &[Datum]) -> TableResult<i64> {
        let handle = match self.pk_handle_col() {
            Some(col) => {
                let value = value_at(row, col.offset)?;
                value.as_handle().ok_or_else(|| {
                    TableError::codec(format!(
                        "handle column {} holds non-integer value {value:?}",
                        col.name
                    ))
                })?
            }
            None => self.alloc_auto_id()?,
        };

        let mut col_ids = Vec::with_capacity(self.writable_columns.len());
        let mut values = Vec::with_capacity(self.writable_columns.len());
        for col in &self.writable_columns {
            if self.is_pk_handle(col) {
                continue;
            }
            let value = if col.state.needs_default() {
                self.defaults.default_value(col)?
            } else {
                value_at(row, col.offset)?.clone()
            };
            if self.is_omitted(col, &value) {
                continue;
            }
            self.check_utf8(col, &value)?;
            col_ids.push(col.id);
            values.push(value);
        }
        let payload = encode_row(&values, &col_ids)?;

        let key = self.record_key(handle);
        let mut bs = BufferStore::new(ctx.txn());

        if self.meta.pk_is_handle {
            let conflict = KeyConflict::new(PRIMARY_KEY_NAME, handle.to_string());
            let mut probe = PresumeKeyNotExists::arm(&mut bs, conflict);
            let found = probe
                .get(&key)
                .map_err(|e| TableError::store("probing record key", e))?;
            if found.is_some() {
                return Err(TableError::DuplicateKey {
                    index: PRIMARY_KEY_NAME.to_string(),
                    entry: handle.to_string(),
                    existing: Some(handle),
                });
            }
        }

        for idx in self.writable_indices() {
            let index_values = idx.fetch_values(row)?;
            idx.create_presumed(&mut bs, &index_values, handle)?;
        }

        bs.set(key, Value::from_vec(payload.clone()))
            .map_err(|e| TableError::store("writing record", e))?;
        bs.flush()
            .map_err(|e| TableError::store("flushing record", e))?;

        if let Some(recorder) = ctx.mutations() {
            let mut entry = value_bytes(&[Datum::Int(handle)])?;
            entry.extend_from_slice(&payload);
            recorder.mutation_for(self.id).inserted_rows.push(entry);
        }
        ctx.add_affected_rows(1);
        trace!(table = %self.meta.name, handle, "added record");
        Ok(handle)
    }

    /// Replaces the row stored under `handle`.
    ///
    /// `old` and `new` are full rows addressed by column offset; only columns
    /// marked in `touched` take their value from `new`. Untouched
    /// `ON UPDATE CURRENT_TIMESTAMP` columns are refreshed and marked
    /// touched. Indices over touched columns are rebuilt. The stored row
    /// leaves out the same columns an insert does.
    pub fn update_record(
        &self,
        ctx: &mut dyn TableContext,
        handle: i64,
        old: &[Datum],
        new: &[Datum],
        touched: &mut TouchedColumns,
    ) -> TableResult<()> {
        let row_len = self
            .writable_columns
            .iter()
            .map(|c| c.offset + 1)
            .max()
            .unwrap_or(0);
        for row in [old, new] {
            if row.len() < row_len {
                return Err(TableError::ColumnOffset {
                    offset: row_len - 1,
                    len: row.len(),
                });
            }
        }

        let mut current = new[..row_len].to_vec();
        for col in &self.writable_columns {
            if col.field_type.has_on_update_now() && !touched.is_touched(col.offset) {
                current[col.offset] = self.defaults.current_timestamp(&col.field_type)?;
                touched.touch(col.offset);
            }
        }
        for (offset, value) in current.iter_mut().enumerate() {
            if !touched.is_touched(offset) {
                *value = old[offset].clone();
            }
        }

        let mut col_ids: Vec<ColumnId> = Vec::with_capacity(self.writable_columns.len());
        let mut values = Vec::with_capacity(self.writable_columns.len());
        for col in &self.writable_columns {
            let value = &mut current[col.offset];
            if !col.state.is_public() && value.is_null() {
                *value = self.defaults.default_value(col)?;
            }
            if self.is_omitted(col, value) {
                continue;
            }
            self.check_utf8(col, value)?;
            col_ids.push(col.id);
            values.push(value.clone());
        }
        let payload = encode_row(&values, &col_ids)?;

        let mut bs = BufferStore::new(ctx.txn());
        for idx in &self.indices {
            if !touched.any(idx.offsets()) {
                continue;
            }
            let old_values = idx.fetch_values(old)?;
            self.remove_index_entry(&mut bs, handle, &old_values, idx)?;
            if idx.is_writable() {
                let new_values = idx.fetch_values(&current)?;
                idx.create_presumed(&mut bs, &new_values, handle)?;
            }
        }
        bs.set(self.record_key(handle), Value::from_vec(payload.clone()))
            .map_err(|e| TableError::store("writing record", e))?;
        bs.flush()
            .map_err(|e| TableError::store("flushing record", e))?;

        if let Some(recorder) = ctx.mutations() {
            let mut entry = if self.meta.has_primary_key() {
                value_bytes(&[Datum::Int(handle)])?
            } else {
                let (old_ids, old_values): (Vec<ColumnId>, Vec<Datum>) = self
                    .writable_columns
                    .iter()
                    .filter(|c| !self.is_omitted(c, &old[c.offset]))
                    .map(|c| (c.id, old[c.offset].clone()))
                    .unzip();
                encode_row(&old_values, &old_ids)?
            };
            entry.extend_from_slice(&payload);
            recorder.mutation_for(self.id).updated_rows.push(entry);
        }
        trace!(table = %self.meta.name, handle, "updated record");
        Ok(())
    }

    /// Deletes the row stored under `handle` and every index entry derived
    /// from `row`, its current content.
    pub fn remove_record(
        &self,
        ctx: &mut dyn TableContext,
        handle: i64,
        row: &[Datum],
    ) -> TableResult<()> {
        let mut bs = BufferStore::new(ctx.txn());
        bs.delete(self.record_key(handle))
            .map_err(|e| TableError::store("deleting record", e))?;

        let mut primary_values = None;
        for idx in self.deletable_indices() {
            let values = idx.fetch_values(row)?;
            self.remove_index_entry(&mut bs, handle, &values, idx)?;
            if idx.meta().primary {
                primary_values = Some(values);
            }
        }
        bs.flush()
            .map_err(|e| TableError::store("flushing record removal", e))?;

        let pk_is_handle = self.meta.pk_is_handle;
        if let Some(recorder) = ctx.mutations() {
            let mutation = recorder.mutation_for(self.id);
            if pk_is_handle {
                mutation.deleted_ids.push(handle);
            } else if let Some(values) = primary_values {
                mutation.deleted_pks.push(key_bytes(&values));
            } else {
                let mut col_ids = Vec::with_capacity(self.public_columns.len());
                let mut values = Vec::with_capacity(self.public_columns.len());
                for col in &self.public_columns {
                    col_ids.push(col.id);
                    values.push(value_at(row, col.offset)?.clone());
                }
                mutation.deleted_rows.push(encode_row(&values, &col_ids)?);
            }
        }
        trace!(table = %self.meta.name, handle, "removed record");
        Ok(())
    }

    /// Deletes every row and index entry of the table.
    pub fn truncate(&self, ctx: &mut dyn TableContext) -> TableResult<()> {
        let txn = ctx.txn();
        let rows = delete_key_with_prefix(&mut *txn, &self.record_prefix)
            .map_err(|e| TableError::store("truncating records", e))?;
        let entries = delete_key_with_prefix(&mut *txn, &self.index_prefix)
            .map_err(|e| TableError::store("truncating indices", e))?;
        debug!(table = %self.meta.name, rows, entries, "truncated table");
        Ok(())
    }

    /// Whether `value` of `col` stays out of the stored row: the handle
    /// column lives in the key, and a NULL with no declared default reads
    /// back as NULL anyway. Columns still being backfilled are always kept.
    fn is_omitted(&self, col: &Column, value: &Datum) -> bool {
        self.is_pk_handle(col)
            || (value.is_null() && col.default_value.is_none() && !col.state.needs_default())
    }

    /// Deletes one index entry. A missing entry is tolerated only while the
    /// index is not public, since it may not have been backfilled yet or may
    /// already be cleaned up.
    fn remove_index_entry(
        &self,
        bs: &mut BufferStore<'_>,
        handle: i64,
        values: &[Datum],
        idx: &Index,
    ) -> TableResult<()> {
        match idx.delete(bs, values, handle) {
            Err(e) if e.is_not_exist() && !idx.is_public() => {
                // TODO: decide whether a missing entry of a non-public index
                // should still be an error once backfill reports progress.
                debug!(
                    table = %self.meta.name,
                    index = %idx.meta().name,
                    state = %idx.meta().state,
                    handle,
                    "index entry absent, skipping"
                );
                Ok(())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rowkv_common::{KvConfig, TableConfig};
    use rowkv_kv::{MemoryAllocator, MemoryStorage};

    use super::*;
    use crate::defaults::MetaDefaults;
    use crate::mutation::CollectingSink;
    use crate::schema::{ColumnDefault, ColumnInfo, IndexColumn, IndexInfo, SchemaState, TableInfo};
    use crate::session::Session;
    use crate::types::{FieldFlags, FieldType, TypeCode};

    const NOW: i64 = 1_700_000_000_000_000;

    fn build(meta: TableInfo) -> Table {
        Table::from_meta(
            Arc::new(meta),
            Arc::new(MemoryAllocator::default()),
            Arc::new(MetaDefaults::with_clock(|| NOW)),
            &TableConfig::default(),
        )
        .unwrap()
    }

    fn handle_table() -> Table {
        build(
            TableInfo::new(1, "t")
                .with_column(ColumnInfo::new(
                    1,
                    "id",
                    0,
                    FieldType::long_long().with_flags(FieldFlags::PRI_KEY | FieldFlags::NOT_NULL),
                ))
                .with_column(ColumnInfo::new(2, "name", 1, FieldType::varchar()))
                .with_index(IndexInfo::new(1, "name_idx", vec![IndexColumn::new("name", 1)]).unique())
                .with_pk_is_handle(true),
        )
    }

    fn session(storage: &MemoryStorage) -> Session {
        Session::begin(storage, &TableConfig::default(), None).unwrap()
    }

    #[test]
    fn test_add_uses_handle_column() {
        let storage = MemoryStorage::new(KvConfig::default());
        let t = handle_table();
        let mut s = session(&storage);
        let h = t.add_record(&mut s, &[Datum::Int(9), Datum::from("a")]).unwrap();
        assert_eq!(h, 9);
        assert_eq!(s.affected_rows(), 1);
    }

    #[test]
    fn test_duplicate_handle_in_same_txn() {
        let storage = MemoryStorage::new(KvConfig::default());
        let t = handle_table();
        let mut s = session(&storage);
        t.add_record(&mut s, &[Datum::Int(1), Datum::from("a")]).unwrap();
        let err = t
            .add_record(&mut s, &[Datum::Int(1), Datum::from("b")])
            .unwrap_err();
        assert_eq!(err.to_string(), "Duplicate entry '1' for key 'PRIMARY'");
        assert_eq!(s.affected_rows(), 1);
    }

    #[test]
    fn test_duplicate_index_leaves_txn_untouched() {
        let storage = MemoryStorage::new(KvConfig::default());
        let t = handle_table();
        let mut s = session(&storage);
        t.add_record(&mut s, &[Datum::Int(1), Datum::from("a")]).unwrap();
        let err = t
            .add_record(&mut s, &[Datum::Int(2), Datum::from("a")])
            .unwrap_err();
        assert!(matches!(
            err,
            TableError::DuplicateKey { existing: Some(1), .. }
        ));
        assert!(matches!(t.row(&mut s, 2), Err(TableError::RowNotFound { .. })));
    }

    #[test]
    fn test_invalid_utf8_rejected_before_write() {
        let storage = MemoryStorage::new(KvConfig::default());
        let t = handle_table();
        let mut s = session(&storage);
        let err = t
            .add_record(&mut s, &[Datum::Int(1), Datum::Bytes(vec![0xc3, 0x28])])
            .unwrap_err();
        assert!(matches!(err, TableError::InvalidEncoding { .. }));
        assert!(t.seek(&mut s, 0).unwrap().is_none());
    }

    #[test]
    fn test_allocated_handles_are_distinct() {
        let storage = MemoryStorage::new(KvConfig::default());
        let t = build(
            TableInfo::new(2, "logs").with_column(ColumnInfo::new(1, "msg", 0, FieldType::varchar())),
        );
        let mut s = session(&storage);
        let a = t.add_record(&mut s, &[Datum::from("x")]).unwrap();
        let b = t.add_record(&mut s, &[Datum::from("x")]).unwrap();
        assert_ne!(a, b);
        assert_eq!(t.row(&mut s, b).unwrap(), vec![Datum::from("x")]);
    }

    #[test]
    fn test_write_only_column_gets_default() {
        let storage = MemoryStorage::new(KvConfig::default());
        let meta = TableInfo::new(3, "t")
            .with_column(ColumnInfo::new(1, "a", 0, FieldType::long_long()))
            .with_column(
                ColumnInfo::new(2, "b", 1, FieldType::long_long())
                    .with_default(ColumnDefault::Value(Datum::Int(7)))
                    .with_state(SchemaState::WriteOnly),
            );
        let t = build(meta.clone());
        let mut s = session(&storage);
        let h = t.add_record(&mut s, &[Datum::Int(1), Datum::Int(99)]).unwrap();

        let mut public = meta;
        public.columns[1].state = SchemaState::Public;
        let t = build(public);
        assert_eq!(t.row(&mut s, h).unwrap(), vec![Datum::Int(1), Datum::Int(7)]);
    }

    #[test]
    fn test_update_refreshes_on_update_column() {
        let storage = MemoryStorage::new(KvConfig::default());
        let t = build(
            TableInfo::new(4, "t")
                .with_column(ColumnInfo::new(1, "a", 0, FieldType::long_long()))
                .with_column(ColumnInfo::new(
                    2,
                    "ts",
                    1,
                    FieldType::new(TypeCode::Timestamp).with_flags(FieldFlags::ON_UPDATE_NOW),
                )),
        );
        let mut s = session(&storage);
        let old = vec![Datum::Int(1), Datum::Time(5)];
        let h = t.add_record(&mut s, &old).unwrap();

        let mut touched = TouchedColumns::from_offsets(2, [0]);
        t.update_record(&mut s, h, &old, &[Datum::Int(2), Datum::Null], &mut touched)
            .unwrap();
        assert!(touched.is_touched(1));
        assert_eq!(t.row(&mut s, h).unwrap(), vec![Datum::Int(2), Datum::Time(NOW)]);
    }

    #[test]
    fn test_update_stores_same_columns_as_insert() {
        let storage = MemoryStorage::new(KvConfig::default());
        let t = build(
            TableInfo::new(8, "t")
                .with_column(ColumnInfo::new(
                    1,
                    "id",
                    0,
                    FieldType::long_long().with_flags(FieldFlags::PRI_KEY | FieldFlags::NOT_NULL),
                ))
                .with_column(ColumnInfo::new(2, "name", 1, FieldType::varchar()))
                .with_column(ColumnInfo::new(3, "note", 2, FieldType::varchar()))
                .with_pk_is_handle(true),
        );
        let mut s = session(&storage);
        let old = vec![Datum::Int(1), Datum::from("a"), Datum::Null];
        t.add_record(&mut s, &old).unwrap();
        let inserted = s.txn().get(&t.record_key(1)).unwrap().unwrap();

        let mut touched = TouchedColumns::from_offsets(3, [1]);
        let new = vec![Datum::Int(1), Datum::from("b"), Datum::Null];
        t.update_record(&mut s, 1, &old, &new, &mut touched).unwrap();
        let updated = s.txn().get(&t.record_key(1)).unwrap().unwrap();

        let ids = [ColumnId::new(2)];
        assert_eq!(inserted.as_bytes(), encode_row(&[Datum::from("a")], &ids).unwrap());
        assert_eq!(updated.as_bytes(), encode_row(&[Datum::from("b")], &ids).unwrap());
        assert_eq!(t.row(&mut s, 1).unwrap(), new);
    }

    #[test]
    fn test_update_short_row() {
        let storage = MemoryStorage::new(KvConfig::default());
        let t = handle_table();
        let mut s = session(&storage);
        let mut touched = TouchedColumns::new(2);
        let err = t
            .update_record(&mut s, 1, &[Datum::Int(1)], &[Datum::Int(1)], &mut touched)
            .unwrap_err();
        assert!(matches!(err, TableError::ColumnOffset { offset: 1, len: 1 }));
    }

    #[test]
    fn test_remove_tolerates_missing_entry_of_write_only_index() {
        let storage = MemoryStorage::new(KvConfig::default());
        let base = TableInfo::new(5, "t")
            .with_column(ColumnInfo::new(1, "a", 0, FieldType::long_long()));
        let t = build(base.clone());
        let mut s = session(&storage);
        let h = t.add_record(&mut s, &[Datum::Int(3)]).unwrap();

        let backfilling = build(
            base.clone()
                .with_index(
                    IndexInfo::new(1, "a_idx", vec![IndexColumn::new("a", 0)])
                        .with_state(SchemaState::WriteOnly),
                ),
        );
        backfilling.remove_record(&mut s, h, &[Datum::Int(3)]).unwrap();

        let h = t.add_record(&mut s, &[Datum::Int(4)]).unwrap();
        let public = build(base.with_index(IndexInfo::new(1, "a_idx", vec![IndexColumn::new("a", 0)])));
        let err = public.remove_record(&mut s, h, &[Datum::Int(4)]).unwrap_err();
        assert!(err.is_not_exist());
    }

    #[test]
    fn test_mutation_shapes() {
        let storage = MemoryStorage::new(KvConfig::default());
        let sink = Arc::new(CollectingSink::new());
        let mut s = Session::begin(&storage, &TableConfig::default(), Some(sink.clone())).unwrap();

        let no_pk = build(
            TableInfo::new(6, "plain").with_column(ColumnInfo::new(1, "v", 0, FieldType::long_long())),
        );
        let pk_index = build(
            TableInfo::new(7, "keyed")
                .with_column(ColumnInfo::new(1, "k", 0, FieldType::varchar()))
                .with_index(IndexInfo::new(1, "PRIMARY", vec![IndexColumn::new("k", 0)]).primary()),
        );

        let h1 = no_pk.add_record(&mut s, &[Datum::Int(1)]).unwrap();
        let mut touched = TouchedColumns::from_offsets(1, [0]);
        no_pk
            .update_record(&mut s, h1, &[Datum::Int(1)], &[Datum::Int(2)], &mut touched)
            .unwrap();
        no_pk.remove_record(&mut s, h1, &[Datum::Int(2)]).unwrap();

        let h2 = pk_index.add_record(&mut s, &[Datum::from("x")]).unwrap();
        pk_index.remove_record(&mut s, h2, &[Datum::from("x")]).unwrap();
        s.commit().unwrap();

        let published = sink.take();
        let mutations = &published[0].1;
        let plain = &mutations[0];
        let ids = [ColumnId::new(1)];
        let mut inserted = value_bytes(&[Datum::Int(h1)]).unwrap();
        inserted.extend(encode_row(&[Datum::Int(1)], &ids).unwrap());
        assert_eq!(plain.inserted_rows, vec![inserted]);
        let mut updated = encode_row(&[Datum::Int(1)], &ids).unwrap();
        updated.extend(encode_row(&[Datum::Int(2)], &ids).unwrap());
        assert_eq!(plain.updated_rows, vec![updated]);
        assert_eq!(plain.deleted_rows, vec![encode_row(&[Datum::Int(2)], &ids).unwrap()]);

        let keyed = &mutations[1];
        assert_eq!(keyed.deleted_pks, vec![key_bytes(&[Datum::from("x")])]);
        assert!(keyed.deleted_ids.is_empty());
    }
}
