//! Per-transaction context for table operations.

use std::fmt;
use std::sync::Arc;

use rowkv_common::TableConfig;
use rowkv_kv::{Storage, Transaction};
use tracing::{debug, warn};

use crate::error::{TableError, TableResult};
use crate::mutation::{ChangeLogSink, MutationRecorder};

/// What a table operation needs from its caller.
pub trait TableContext {
    /// Returns the transaction the operation runs in.
    fn txn(&mut self) -> &mut dyn Transaction;

    /// Returns the mutation recorder if changes are being captured.
    fn mutations(&mut self) -> Option<&mut MutationRecorder>;

    /// Adds to the number of rows the current statement affected.
    fn add_affected_rows(&mut self, rows: u64);
}

/// A transaction plus change capture and statement bookkeeping.
///
/// Changes are captured only when a change-log sink is attached, capture is
/// enabled in the configuration and the session is not restricted.
///
/// # Example
///
/// ```rust
/// use rowkv_common::{KvConfig, TableConfig};
/// use rowkv_kv::MemoryStorage;
/// use rowkv_table::Session;
///
/// let storage = MemoryStorage::new(KvConfig::default());
/// let session = Session::begin(&storage, &TableConfig::default(), None).unwrap();
/// assert_eq!(session.affected_rows(), 0);
/// session.commit().unwrap();
/// ```
pub struct Session {
    txn: Box<dyn Transaction>,
    recorder: MutationRecorder,
    sink: Option<Arc<dyn ChangeLogSink>>,
    capture: bool,
    restricted: bool,
    affected_rows: u64,
}

impl Session {
    /// Wraps `txn` without change capture.
    pub fn new(txn: Box<dyn Transaction>) -> Self {
        Self {
            txn,
            recorder: MutationRecorder::new(),
            sink: None,
            capture: true,
            restricted: false,
            affected_rows: 0,
        }
    }

    /// Attaches a change-log sink.
    #[must_use]
    pub fn with_change_log(mut self, sink: Arc<dyn ChangeLogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Starts a transaction on `storage`.
    pub fn begin(
        storage: &dyn Storage,
        config: &TableConfig,
        sink: Option<Arc<dyn ChangeLogSink>>,
    ) -> TableResult<Self> {
        let txn = storage
            .begin()
            .map_err(|e| TableError::store("starting transaction", e))?;
        let mut session = Self::new(txn);
        session.sink = sink;
        session.capture = config.capture_mutations;
        Ok(session)
    }

    /// Marks the session as internal; restricted sessions never capture.
    pub fn set_restricted(&mut self, restricted: bool) {
        self.restricted = restricted;
    }

    /// Returns true if record operations append to the mutation recorder.
    pub fn should_capture(&self) -> bool {
        self.sink.is_some() && self.capture && !self.restricted
    }

    /// Returns the rows affected so far.
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    /// Returns the recorder.
    pub fn recorder(&self) -> &MutationRecorder {
        &self.recorder
    }

    /// Returns the snapshot timestamp of the transaction.
    pub fn start_ts(&self) -> u64 {
        self.txn.start_ts()
    }

    /// Commits the transaction and publishes captured mutations.
    ///
    /// A unique key presumed absent but created concurrently surfaces as
    /// [`TableError::DuplicateKey`].
    pub fn commit(mut self) -> TableResult<u64> {
        let commit_ts = match self.txn.commit() {
            Ok(ts) => ts,
            Err(e) => {
                debug!(txn = %self.txn.id(), error = %e, "commit failed");
                return Err(TableError::store("committing transaction", e));
            }
        };

        if self.should_capture() && !self.recorder.is_empty() {
            if let Some(sink) = &self.sink {
                sink.publish(commit_ts, self.recorder.take());
            }
        }
        debug!(txn = %self.txn.id(), commit_ts, affected = self.affected_rows, "session committed");
        Ok(commit_ts)
    }

    /// Discards the transaction and anything captured.
    pub fn rollback(mut self) -> TableResult<()> {
        self.recorder.take();
        self.txn.rollback().map_err(|e| {
            warn!(txn = %self.txn.id(), error = %e, "rollback failed");
            TableError::store("rolling back transaction", e)
        })
    }
}

impl TableContext for Session {
    fn txn(&mut self) -> &mut dyn Transaction {
        &mut *self.txn
    }

    fn mutations(&mut self) -> Option<&mut MutationRecorder> {
        if self.should_capture() {
            Some(&mut self.recorder)
        } else {
            None
        }
    }

    fn add_affected_rows(&mut self, rows: u64) {
        self.affected_rows += rows;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("txn", &self.txn.id())
            .field("capture", &self.should_capture())
            .field("affected_rows", &self.affected_rows)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::CollectingSink;
    use rowkv_common::{Key, KvConfig, Value};
    use rowkv_common::TableId;
    use rowkv_kv::{MemoryStorage, Mutator};

    #[test]
    fn test_capture_gating() {
        let storage = MemoryStorage::new(KvConfig::default());
        let sink = Arc::new(CollectingSink::new());

        let mut session = Session::begin(&storage, &TableConfig::default(), None).unwrap();
        assert!(session.mutations().is_none());

        let mut session = session.with_change_log(sink.clone());
        assert!(session.mutations().is_some());
        session.set_restricted(true);
        assert!(session.mutations().is_none());

        let config = TableConfig {
            capture_mutations: false,
            ..TableConfig::default()
        };
        let session = Session::begin(&storage, &config, Some(sink)).unwrap();
        assert!(!session.should_capture());
    }

    #[test]
    fn test_commit_publishes() {
        let storage = MemoryStorage::new(KvConfig::default());
        let sink = Arc::new(CollectingSink::new());
        let mut session =
            Session::begin(&storage, &TableConfig::default(), Some(sink.clone())).unwrap();

        session
            .txn()
            .set(Key::from_bytes(b"k"), Value::from_bytes(b"v"))
            .unwrap();
        session
            .mutations()
            .unwrap()
            .mutation_for(TableId::new(1))
            .deleted_ids
            .push(3);
        session.add_affected_rows(1);
        assert_eq!(session.affected_rows(), 1);

        let ts = session.commit().unwrap();
        let published = sink.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, ts);
        assert_eq!(published[0].1[0].deleted_ids, vec![3]);
    }

    #[test]
    fn test_rollback_publishes_nothing() {
        let storage = MemoryStorage::new(KvConfig::default());
        let sink = Arc::new(CollectingSink::new());
        let mut session =
            Session::begin(&storage, &TableConfig::default(), Some(sink.clone())).unwrap();
        session
            .mutations()
            .unwrap()
            .mutation_for(TableId::new(1))
            .deleted_ids
            .push(3);
        session.rollback().unwrap();
        assert!(sink.published().is_empty());
    }
}
