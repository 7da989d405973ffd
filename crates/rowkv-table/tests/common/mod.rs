//! Shared fixtures for the record store integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use rowkv_common::{AllocConfig, KvConfig, TableConfig};
use rowkv_kv::{MemoryStorage, Storage};
use rowkv_table::schema::{ColumnInfo, IndexColumn, IndexInfo, SchemaState, TableInfo};
use rowkv_table::types::{FieldFlags, FieldType};
use rowkv_table::{ChangeLogSink, MetaTableFactory, Session, Table, TableFactory};
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Creates an empty in-memory store.
pub fn storage() -> MemoryStorage {
    init_tracing();
    MemoryStorage::new(KvConfig::default())
}

/// Creates a factory with test-sized allocation batches.
pub fn factory() -> MetaTableFactory {
    MetaTableFactory::new(AllocConfig { step: 10 }, TableConfig::default())
}

/// Starts a session without change capture.
pub fn session(storage: &dyn Storage) -> Session {
    Session::begin(storage, &TableConfig::default(), None).expect("Failed to begin session")
}

/// Starts a session publishing to `sink`.
pub fn capturing_session(storage: &dyn Storage, sink: Arc<dyn ChangeLogSink>) -> Session {
    Session::begin(storage, &TableConfig::default(), Some(sink)).expect("Failed to begin session")
}

/// Table `T`: `id` is the handle column, `name` has a unique index.
pub fn table_t_meta() -> TableInfo {
    TableInfo::new(100, "T")
        .with_column(ColumnInfo::new(
            1,
            "id",
            0,
            FieldType::long_long().with_flags(FieldFlags::PRI_KEY | FieldFlags::NOT_NULL),
        ))
        .with_column(ColumnInfo::new(2, "name", 1, FieldType::varchar()))
        .with_index(IndexInfo::new(1, "name", vec![IndexColumn::new("name", 1)]).unique())
        .with_pk_is_handle(true)
}

/// Table `T` with an extra column and index in the given states.
pub fn table_t_with(column_state: SchemaState, index_state: SchemaState) -> TableInfo {
    table_t_meta()
        .with_column(ColumnInfo::new(3, "age", 2, FieldType::long_long()).with_state(column_state))
        .with_index(
            IndexInfo::new(2, "age_idx", vec![IndexColumn::new("age", 2)]).with_state(index_state),
        )
}

/// Builds a table through `factory`.
pub fn open(factory: &MetaTableFactory, meta: TableInfo) -> Table {
    factory
        .table_from_meta(Arc::new(meta))
        .expect("Failed to build table")
}

/// Counts keys under `prefix` visible to a fresh transaction.
pub fn count_keys(storage: &dyn Storage, prefix: &[u8]) -> usize {
    let txn = storage.begin().expect("Failed to begin transaction");
    let mut it = txn
        .seek(&rowkv_common::Key::from_bytes(prefix))
        .expect("Failed to seek");
    let mut count = 0;
    while it.valid() && it.key().starts_with(prefix) {
        count += 1;
        it.next().expect("Failed to advance");
    }
    count
}
