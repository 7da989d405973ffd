//! The record store.
//!
//! A [`Table`] is built once per schema version from its metadata and then
//! shared across transactions. Every operation takes a [`TableContext`]
//! supplying the transaction; row and index writes of one call are staged
//! in a [`BufferStore`](rowkv_kv::BufferStore) and reach the transaction
//! together, so a failed duplicate check leaves the transaction untouched.
//!
//! [`TableContext`]: crate::TableContext

mod read;
mod write;

use std::fmt;
use std::sync::Arc;

use rowkv_common::{Key, TableConfig, TableId};
use rowkv_kv::Allocator;

use crate::codec::key::{index_prefix, record_key, record_prefix};
use crate::column::Column;
use crate::defaults::{DefaultEvaluator, MetaDefaults};
use crate::error::{TableError, TableResult};
use crate::index::Index;
use crate::schema::TableInfo;
use crate::types::Datum;

/// A table bound to one schema version.
pub struct Table {
    id: TableId,
    meta: Arc<TableInfo>,
    columns: Vec<Column>,
    public_columns: Vec<Column>,
    writable_columns: Vec<Column>,
    indices: Vec<Index>,
    record_prefix: Key,
    index_prefix: Key,
    alloc: Option<Arc<dyn Allocator>>,
    defaults: Arc<dyn DefaultEvaluator>,
    config: TableConfig,
}

impl Table {
    /// Builds a table from validated metadata.
    ///
    /// Fails if the table, a column or an index is in the `None` state, or
    /// if the metadata is otherwise malformed.
    pub fn from_meta(
        meta: Arc<TableInfo>,
        alloc: Arc<dyn Allocator>,
        defaults: Arc<dyn DefaultEvaluator>,
        config: &TableConfig,
    ) -> TableResult<Self> {
        meta.validate()?;
        let indices = meta
            .indices
            .iter()
            .map(|info| Index::new(meta.id, info.clone()))
            .collect();
        Ok(Self::build(meta, indices, Some(alloc), defaults, config.clone()))
    }

    /// Builds a table without validation, indices or an allocator.
    ///
    /// Meant for callers that only need the column layout and key prefixes,
    /// such as planner tests. Allocation fails with
    /// [`TableError::NoAllocator`].
    pub fn mock_from_meta(meta: Arc<TableInfo>) -> Self {
        Self::build(
            meta,
            Vec::new(),
            None,
            Arc::new(MetaDefaults::new()),
            TableConfig::default(),
        )
    }

    fn build(
        meta: Arc<TableInfo>,
        indices: Vec<Index>,
        alloc: Option<Arc<dyn Allocator>>,
        defaults: Arc<dyn DefaultEvaluator>,
        config: TableConfig,
    ) -> Self {
        let columns: Vec<Column> = meta.columns.iter().cloned().map(Column::new).collect();
        let public_columns = columns
            .iter()
            .filter(|c| c.state.is_public())
            .cloned()
            .collect();
        let writable_columns = columns
            .iter()
            .filter(|c| c.state.is_writable())
            .cloned()
            .collect();

        Self {
            id: meta.id,
            record_prefix: record_prefix(meta.id),
            index_prefix: index_prefix(meta.id),
            meta,
            columns,
            public_columns,
            writable_columns,
            indices,
            alloc,
            defaults,
            config,
        }
    }

    /// Returns the table id.
    #[inline]
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Returns the table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Returns the metadata the table was built from.
    #[inline]
    pub fn meta(&self) -> &Arc<TableInfo> {
        &self.meta
    }

    /// Returns the public columns.
    #[inline]
    pub fn cols(&self) -> &[Column] {
        &self.public_columns
    }

    /// Returns every column, whatever its state.
    #[inline]
    pub fn all_cols(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the columns inserts and updates write.
    #[inline]
    pub fn writable_cols(&self) -> &[Column] {
        &self.writable_columns
    }

    /// Returns every index.
    #[inline]
    pub fn indices(&self) -> &[Index] {
        &self.indices
    }

    /// Returns the indices row removal maintains: all of them, whatever
    /// their state.
    #[inline]
    pub fn deletable_indices(&self) -> &[Index] {
        &self.indices
    }

    /// Returns the indices inserts and updates maintain.
    pub fn writable_indices(&self) -> impl Iterator<Item = &Index> + '_ {
        self.indices.iter().filter(|i| i.is_writable())
    }

    /// Returns `t{id}_r`.
    #[inline]
    pub fn record_prefix(&self) -> &Key {
        &self.record_prefix
    }

    /// Returns `t{id}_i`.
    #[inline]
    pub fn index_prefix(&self) -> &Key {
        &self.index_prefix
    }

    /// Returns the record key of `handle`.
    #[inline]
    pub fn record_key(&self, handle: i64) -> Key {
        record_key(&self.record_prefix, handle)
    }

    /// Returns the record key of handle 0.
    #[inline]
    pub fn first_key(&self) -> Key {
        self.record_key(0)
    }

    /// Returns the handle allocator, if the table has one.
    pub fn allocator(&self) -> Option<&Arc<dyn Allocator>> {
        self.alloc.as_ref()
    }

    /// Returns the default evaluator.
    pub fn defaults(&self) -> &Arc<dyn DefaultEvaluator> {
        &self.defaults
    }

    /// Issues a new row handle.
    pub fn alloc_auto_id(&self) -> TableResult<i64> {
        let alloc = self.alloc.as_ref().ok_or(TableError::NoAllocator(self.id))?;
        alloc.alloc(self.id).map_err(|source| TableError::Allocator {
            table_id: self.id,
            source,
        })
    }

    /// Moves the allocator past `new_base`.
    pub fn rebase_auto_id(&self, new_base: i64, is_step: bool) -> TableResult<()> {
        let alloc = self.alloc.as_ref().ok_or(TableError::NoAllocator(self.id))?;
        alloc
            .rebase(self.id, new_base, is_step)
            .map_err(|source| TableError::Allocator {
                table_id: self.id,
                source,
            })
    }

    /// Returns the first public single-column index over `name`, compared
    /// case-insensitively.
    pub fn find_index_by_col_name(&self, name: &str) -> Option<&Index> {
        self.indices.iter().find(|idx| {
            let meta = idx.meta();
            idx.is_public()
                && meta.columns.len() == 1
                && meta.columns[0].name.eq_ignore_ascii_case(name)
        })
    }

    /// Returns the column holding the row handle, if any.
    pub fn pk_handle_col(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.is_pk_handle_column(self.meta.pk_is_handle))
    }

    fn is_pk_handle(&self, col: &Column) -> bool {
        col.is_pk_handle_column(self.meta.pk_is_handle)
    }

    /// Returns the datum a handle column reads as.
    fn handle_datum(col: &Column, handle: i64) -> Datum {
        if col.field_type.is_unsigned() {
            Datum::Uint(handle as u64)
        } else {
            Datum::Int(handle)
        }
    }

    /// Rejects malformed UTF-8 in columns whose charset requires it.
    fn check_utf8(&self, col: &Column, value: &Datum) -> TableResult<()> {
        if let Datum::Bytes(bytes) = value {
            if self.config.requires_utf8(&col.field_type.charset) && std::str::from_utf8(bytes).is_err()
            {
                return Err(TableError::InvalidEncoding {
                    column: col.name.clone(),
                    value: bytes.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("id", &self.id)
            .field("name", &self.meta.name)
            .field("columns", &self.columns.len())
            .field("indices", &self.indices.len())
            .finish()
    }
}

fn value_at(row: &[Datum], offset: usize) -> TableResult<&Datum> {
    row.get(offset).ok_or(TableError::ColumnOffset {
        offset,
        len: row.len(),
    })
}
