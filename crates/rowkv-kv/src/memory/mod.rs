//! In-memory reference store.
//!
//! Keeps every committed version of every key in a single ordered map
//! guarded by a [`parking_lot::RwLock`]. A transaction reads the newest
//! version committed at or before its start timestamp, buffers its own
//! writes, and validates them at commit:
//!
//! ```text
//! begin()                      commit()
//!   │ start_ts = ++clock          │ take write lock
//!   │                             │ re-verify presumed-absent keys
//!   │ get/seek: snapshot@start_ts │ first committer wins per written key
//!   │   overlaid with own writes  │ commit_ts = ++clock, apply writes
//!   ▼                             ▼
//! ```
//!
//! Conflicts are detected, never prevented: there are no locks held
//! between operations.

mod txn;

pub use txn::MemoryTxn;

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::RwLock;
use rowkv_common::{Key, KvConfig, KvResult, TxnId, Value};
use tracing::debug;

use crate::traits::{Storage, Transaction};

/// One committed version of a key. `None` records a deletion.
#[derive(Debug, Clone)]
struct Version {
    commit_ts: u64,
    value: Option<Value>,
}

/// Shared state of a [`MemoryStorage`].
#[derive(Debug)]
pub(crate) struct StoreInner {
    /// Versions per key, oldest first.
    versions: RwLock<BTreeMap<Key, Vec<Version>>>,
    /// Timestamp oracle. Start and commit timestamps are drawn from it.
    clock: AtomicU64,
    config: KvConfig,
}

impl StoreInner {
    fn next_ts(&self) -> u64 {
        self.clock.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }

    /// Returns the value of `key` visible at `ts`.
    pub(crate) fn get_at(&self, key: &Key, ts: u64) -> Option<Value> {
        let versions = self.versions.read();
        visible(versions.get(key)?, ts)
    }

    /// Returns every live entry `>= start` visible at `ts`, in key order.
    pub(crate) fn scan_at(&self, start: &Key, ts: u64) -> Vec<(Key, Value)> {
        let versions = self.versions.read();
        versions
            .range((Bound::Included(start), Bound::Unbounded))
            .filter_map(|(k, chain)| visible(chain, ts).map(|v| (k.clone(), v)))
            .collect()
    }
}

/// Returns the newest value in `chain` committed at or before `ts`.
fn visible(chain: &[Version], ts: u64) -> Option<Value> {
    chain
        .iter()
        .rev()
        .find(|v| v.commit_ts <= ts)
        .and_then(|v| v.value.clone())
}

/// A snapshot-isolated in-memory store.
///
/// Cloning is cheap; clones share the same data.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    inner: Arc<StoreInner>,
}

impl MemoryStorage {
    /// Creates an empty store enforcing the limits in `config`.
    #[must_use]
    pub fn new(config: KvConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                versions: RwLock::new(BTreeMap::new()),
                clock: AtomicU64::new(0),
                config,
            }),
        }
    }

    /// Starts a transaction, returning the concrete type.
    #[must_use]
    pub fn begin_txn(&self) -> MemoryTxn {
        let start_ts = self.inner.next_ts();
        debug!(start_ts, "begin transaction");
        MemoryTxn::new(TxnId::new(start_ts), start_ts, Arc::clone(&self.inner))
    }

    /// Returns the latest timestamp handed out.
    #[must_use]
    pub fn current_ts(&self) -> u64 {
        self.inner.clock.load(AtomicOrdering::SeqCst)
    }

    /// Returns the number of keys with a live latest version.
    #[must_use]
    pub fn live_keys(&self) -> usize {
        let versions = self.inner.versions.read();
        versions
            .values()
            .filter(|chain| chain.last().is_some_and(|v| v.value.is_some()))
            .count()
    }

    /// Returns the configured limits.
    #[must_use]
    pub fn config(&self) -> &KvConfig {
        &self.inner.config
    }
}

impl Storage for MemoryStorage {
    fn begin(&self) -> KvResult<Box<dyn Transaction>> {
        Ok(Box::new(self.begin_txn()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Mutator;

    #[test]
    fn test_timestamps_increase() {
        let storage = MemoryStorage::new(KvConfig::default());
        let t1 = storage.begin_txn();
        let t2 = storage.begin_txn();
        assert!(t1.start_ts() < t2.start_ts());
        assert_eq!(storage.current_ts(), t2.start_ts());
    }

    #[test]
    fn test_live_keys() {
        let storage = MemoryStorage::new(KvConfig::default());
        let mut txn = storage.begin_txn();
        txn.set(Key::from_bytes(b"a"), Value::from_bytes(b"1")).unwrap();
        txn.set(Key::from_bytes(b"b"), Value::from_bytes(b"2")).unwrap();
        txn.commit().unwrap();
        assert_eq!(storage.live_keys(), 2);

        let mut txn = storage.begin_txn();
        txn.delete(Key::from_bytes(b"a")).unwrap();
        txn.commit().unwrap();
        assert_eq!(storage.live_keys(), 1);
    }
}
