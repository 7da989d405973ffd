//! Change capture.
//!
//! While a session captures changes, every record operation appends what it
//! did to the [`TableMutation`] of its table. At commit the collected
//! mutations are handed to a [`ChangeLogSink`], one per table.
//!
//! Payload formats:
//!
//! | list | entry |
//! |---|---|
//! | `inserted_rows` | `encode_value(Int(handle)) ++ row payload` |
//! | `updated_rows` | `encode_value(Int(handle)) ++ new payload` with a primary key, else `old payload ++ new payload` |
//! | `deleted_ids` | handle, when the primary key is the handle |
//! | `deleted_pks` | `encode_key` of the primary index values |
//! | `deleted_rows` | row payload over the public columns |

use std::collections::BTreeMap;

use parking_lot::Mutex;
use rowkv_common::TableId;
use serde::{Deserialize, Serialize};

/// Changes made to one table within one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableMutation {
    /// Table the changes belong to.
    pub table_id: TableId,
    /// Inserted rows.
    #[serde(default)]
    pub inserted_rows: Vec<Vec<u8>>,
    /// Updated rows.
    #[serde(default)]
    pub updated_rows: Vec<Vec<u8>>,
    /// Handles of deleted rows.
    #[serde(default)]
    pub deleted_ids: Vec<i64>,
    /// Encoded primary keys of deleted rows.
    #[serde(default)]
    pub deleted_pks: Vec<Vec<u8>>,
    /// Payloads of deleted rows without a primary key.
    #[serde(default)]
    pub deleted_rows: Vec<Vec<u8>>,
}

impl TableMutation {
    /// Creates an empty mutation for `table_id`.
    pub fn new(table_id: TableId) -> Self {
        Self {
            table_id,
            ..Self::default()
        }
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.inserted_rows.is_empty()
            && self.updated_rows.is_empty()
            && self.deleted_ids.is_empty()
            && self.deleted_pks.is_empty()
            && self.deleted_rows.is_empty()
    }
}

/// Collects the mutations of one transaction, keyed by table.
#[derive(Debug, Default)]
pub struct MutationRecorder {
    tables: BTreeMap<TableId, TableMutation>,
}

impl MutationRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutation of `table_id`, creating it on first use.
    pub fn mutation_for(&mut self, table_id: TableId) -> &mut TableMutation {
        self.tables
            .entry(table_id)
            .or_insert_with(|| TableMutation::new(table_id))
    }

    /// Returns the mutation of `table_id` if one was recorded.
    pub fn get(&self, table_id: TableId) -> Option<&TableMutation> {
        self.tables.get(&table_id)
    }

    /// Returns true if no table has a mutation.
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(TableMutation::is_empty)
    }

    /// Drains the recorder, returning non-empty mutations in table order.
    pub fn take(&mut self) -> Vec<TableMutation> {
        std::mem::take(&mut self.tables)
            .into_values()
            .filter(|m| !m.is_empty())
            .collect()
    }
}

/// Receives the mutations of committed transactions.
pub trait ChangeLogSink: Send + Sync {
    /// Called once per committed transaction that recorded changes.
    fn publish(&self, commit_ts: u64, mutations: Vec<TableMutation>);
}

/// A sink that keeps everything it is given.
#[derive(Debug, Default)]
pub struct CollectingSink {
    published: Mutex<Vec<(u64, Vec<TableMutation>)>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything published so far.
    pub fn published(&self) -> Vec<(u64, Vec<TableMutation>)> {
        self.published.lock().clone()
    }

    /// Removes and returns everything published so far.
    pub fn take(&self) -> Vec<(u64, Vec<TableMutation>)> {
        std::mem::take(&mut *self.published.lock())
    }
}

impl ChangeLogSink for CollectingSink {
    fn publish(&self, commit_ts: u64, mutations: Vec<TableMutation>) {
        self.published.lock().push((commit_ts, mutations));
    }
}
