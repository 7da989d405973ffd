//! Transactions over [`MemoryStorage`](super::MemoryStorage).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rowkv_common::{Key, KvError, KvResult, TxnId, Value};
use tracing::{debug, trace};

use super::{StoreInner, Version};
use crate::buffer::MemBuffer;
use crate::iter::VecIter;
use crate::options::{KeyConflict, OptionKind, Options, TxnOption};
use crate::traits::{KvIterator, Mutator, Retriever, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnState {
    Active,
    Committed,
    RolledBack,
}

/// A transaction over the in-memory store.
pub struct MemoryTxn {
    id: TxnId,
    start_ts: u64,
    store: Arc<StoreInner>,
    writes: MemBuffer,
    /// Armed presume-key-not-exists directive, if any.
    presume: Option<KeyConflict>,
    /// Keys read as absent while the directive was armed.
    presumed: BTreeMap<Key, KeyConflict>,
    state: TxnState,
}

impl MemoryTxn {
    pub(super) fn new(id: TxnId, start_ts: u64, store: Arc<StoreInner>) -> Self {
        Self {
            id,
            start_ts,
            store,
            writes: MemBuffer::new(),
            presume: None,
            presumed: BTreeMap::new(),
            state: TxnState::Active,
        }
    }

    /// Returns the number of buffered writes.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Returns the number of keys awaiting the lazy existence check.
    #[must_use]
    pub fn presumed_keys(&self) -> usize {
        self.presumed.len()
    }

    fn check_active(&self) -> KvResult<()> {
        if self.state == TxnState::Active {
            Ok(())
        } else {
            Err(KvError::TransactionClosed { txn_id: self.id })
        }
    }

    fn check_key(&self, key: &Key) -> KvResult<()> {
        let max_size = self.store.config.max_key_size;
        if key.len() > max_size {
            return Err(KvError::KeyTooLarge {
                size: key.len(),
                max_size,
            });
        }
        Ok(())
    }

    fn check_value(&self, value: &Value) -> KvResult<()> {
        let max_size = self.store.config.max_value_size;
        if value.len() > max_size {
            return Err(KvError::ValueTooLarge {
                size: value.len(),
                max_size,
            });
        }
        Ok(())
    }

    /// Fails if a key presumed absent was created by a transaction that
    /// committed after this one started.
    fn verify_presumed(&self, versions: &BTreeMap<Key, Vec<Version>>) -> KvResult<()> {
        for (key, conflict) in &self.presumed {
            let latest = versions.get(key).and_then(|chain| chain.last());
            if let Some(version) = latest {
                if version.commit_ts > self.start_ts && version.value.is_some() {
                    debug!(txn = %self.id, %key, "presumed-absent key exists at commit");
                    return Err(conflict.clone().into_error());
                }
            }
        }
        Ok(())
    }

    /// Fails if any written key was committed by someone else after this
    /// transaction started.
    fn verify_writes(&self, versions: &BTreeMap<Key, Vec<Version>>) -> KvResult<()> {
        for (key, _) in self.writes.iter() {
            let latest = versions.get(key).and_then(|chain| chain.last());
            if let Some(version) = latest {
                if version.commit_ts > self.start_ts {
                    debug!(txn = %self.id, %key, conflict_ts = version.commit_ts, "write conflict");
                    return Err(KvError::WriteConflict {
                        key: key.clone(),
                        txn_id: self.id,
                        start_ts: self.start_ts,
                        conflict_ts: version.commit_ts,
                    });
                }
            }
        }
        Ok(())
    }

    fn close(&mut self, state: TxnState) {
        self.state = state;
        self.writes = MemBuffer::new();
        self.presumed.clear();
        self.presume = None;
    }
}

impl Retriever for MemoryTxn {
    fn get(&mut self, key: &Key) -> KvResult<Option<Value>> {
        self.check_active()?;

        if let Some(own) = self.writes.lookup(key) {
            return Ok(own.cloned());
        }

        let found = self.store.get_at(key, self.start_ts);
        if let Some(conflict) = &self.presume {
            if found.is_some() {
                return Err(conflict.clone().into_error());
            }
            trace!(txn = %self.id, %key, "key presumed absent");
            self.presumed
                .entry(key.clone())
                .or_insert_with(|| conflict.clone());
        }
        Ok(found)
    }

    fn seek(&self, key: &Key) -> KvResult<Box<dyn KvIterator>> {
        self.check_active()?;
        let snapshot = self.store.scan_at(key, self.start_ts);
        Ok(Box::new(VecIter::new(self.writes.overlay(snapshot, key))))
    }
}

impl Mutator for MemoryTxn {
    fn set(&mut self, key: Key, value: Value) -> KvResult<()> {
        self.check_active()?;
        self.check_key(&key)?;
        self.check_value(&value)?;
        self.writes.set(key, value)
    }

    fn delete(&mut self, key: Key) -> KvResult<()> {
        self.check_active()?;
        self.check_key(&key)?;
        self.writes.delete(key);
        Ok(())
    }
}

impl Options for MemoryTxn {
    fn set_option(&mut self, option: TxnOption) {
        match option {
            TxnOption::PresumeKeyNotExists(conflict) => self.presume = Some(conflict),
        }
    }

    fn del_option(&mut self, kind: OptionKind) {
        match kind {
            OptionKind::PresumeKeyNotExists => self.presume = None,
        }
    }
}

impl Transaction for MemoryTxn {
    fn id(&self) -> TxnId {
        self.id
    }

    fn start_ts(&self) -> u64 {
        self.start_ts
    }

    fn is_valid(&self) -> bool {
        self.state == TxnState::Active
    }

    fn apply(&mut self, buffer: MemBuffer) -> KvResult<()> {
        self.check_active()?;
        for (key, value) in buffer.iter() {
            self.check_key(key)?;
            if let Some(value) = value {
                self.check_value(value)?;
            }
        }
        trace!(txn = %self.id, writes = buffer.len(), "applying buffered writes");
        self.writes.absorb(buffer);
        Ok(())
    }

    fn commit(&mut self) -> KvResult<u64> {
        self.check_active()?;

        let store = Arc::clone(&self.store);
        let mut versions = store.versions.write();

        let verified = self
            .verify_presumed(&versions)
            .and_then(|()| self.verify_writes(&versions));
        if let Err(err) = verified {
            drop(versions);
            self.close(TxnState::RolledBack);
            return Err(err);
        }

        let commit_ts = store.next_ts();
        let writes = std::mem::take(&mut self.writes);
        let count = writes.len();
        for (key, value) in writes.into_entries() {
            versions
                .entry(key)
                .or_default()
                .push(Version { commit_ts, value });
        }
        drop(versions);

        debug!(txn = %self.id, commit_ts, writes = count, "transaction committed");
        self.close(TxnState::Committed);
        Ok(commit_ts)
    }

    fn rollback(&mut self) -> KvResult<()> {
        self.check_active()?;
        debug!(txn = %self.id, "transaction rolled back");
        self.close(TxnState::RolledBack);
        Ok(())
    }
}

impl Drop for MemoryTxn {
    fn drop(&mut self) {
        if self.state == TxnState::Active && !self.writes.is_empty() {
            debug!(txn = %self.id, pending = self.writes.len(), "discarding uncommitted writes");
        }
    }
}

impl fmt::Debug for MemoryTxn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTxn")
            .field("id", &self.id)
            .field("start_ts", &self.start_ts)
            .field("state", &self.state)
            .field("pending_writes", &self.writes.len())
            .finish()
    }
}
