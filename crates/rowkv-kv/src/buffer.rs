//! Write buffering.
//!
//! [`MemBuffer`] is an ordered map of pending writes where a deletion is a
//! tombstone. [`BufferStore`] layers one over a transaction: reads see the
//! buffer first and fall through to the transaction, writes stay in the
//! buffer until [`BufferStore::flush`] copies them into the transaction in
//! one step. A record operation stages its row and index writes this way so
//! that a failed index probe leaves the transaction untouched.

use std::collections::BTreeMap;
use std::ops::Bound;

use rowkv_common::{Key, KvError, KvResult, Value};
use tracing::trace;

use crate::iter::VecIter;
use crate::options::{OptionKind, Options, TxnOption};
use crate::traits::{KvIterator, Mutator, Retriever, Transaction};

/// An ordered map of pending writes.
#[derive(Debug, Clone, Default)]
pub struct MemBuffer {
    entries: BTreeMap<Key, Option<Value>>,
}

impl MemBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a pending write.
    ///
    /// Returns `None` if the key was never written, `Some(None)` if it was
    /// deleted and `Some(Some(value))` if it was set.
    #[must_use]
    pub fn lookup(&self, key: &Key) -> Option<Option<&Value>> {
        self.entries.get(key).map(Option::as_ref)
    }

    /// Records a write. Empty values are reserved for tombstones.
    pub fn set(&mut self, key: Key, value: Value) -> KvResult<()> {
        if value.is_empty() {
            return Err(KvError::EmptyValue { key });
        }
        self.entries.insert(key, Some(value));
        Ok(())
    }

    /// Records a deletion.
    pub fn delete(&mut self, key: Key) {
        self.entries.insert(key, None);
    }

    /// Returns the number of pending writes, tombstones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates pending writes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, Option<&Value>)> {
        self.entries.iter().map(|(k, v)| (k, v.as_ref()))
    }

    /// Consumes the buffer, yielding pending writes in key order.
    pub fn into_entries(self) -> impl Iterator<Item = (Key, Option<Value>)> {
        self.entries.into_iter()
    }

    /// Moves every pending write of `other` into this buffer, later writes
    /// replacing earlier ones.
    pub(crate) fn absorb(&mut self, other: MemBuffer) {
        self.entries.extend(other.entries);
    }

    /// Overlays the pending writes at or after `start` onto `base`, which
    /// must hold entries `>= start` in key order, and returns the merged
    /// view with tombstoned keys removed.
    pub(crate) fn overlay(
        &self,
        base: impl IntoIterator<Item = (Key, Value)>,
        start: &Key,
    ) -> Vec<(Key, Value)> {
        let mut merged: BTreeMap<Key, Value> = base.into_iter().collect();
        for (key, value) in self
            .entries
            .range((Bound::Included(start), Bound::Unbounded))
        {
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged.into_iter().collect()
    }
}

/// A write buffer layered over a transaction.
///
/// Options are forwarded to the transaction, so the presume-key-not-exists
/// directive armed on a `BufferStore` governs the reads that fall through to
/// the transaction.
pub struct BufferStore<'a> {
    txn: &'a mut dyn Transaction,
    buffer: MemBuffer,
}

impl<'a> BufferStore<'a> {
    /// Creates an empty buffer over `txn`.
    pub fn new(txn: &'a mut dyn Transaction) -> Self {
        Self {
            txn,
            buffer: MemBuffer::new(),
        }
    }

    /// Returns the pending writes.
    #[must_use]
    pub fn buffer(&self) -> &MemBuffer {
        &self.buffer
    }

    /// Returns the underlying transaction.
    pub fn txn(&mut self) -> &mut dyn Transaction {
        &mut *self.txn
    }

    /// Hands every pending write to the transaction as one unit. If any
    /// write is rejected, none of them reach the transaction.
    pub fn flush(self) -> KvResult<()> {
        trace!(pending = self.buffer.len(), "flushing buffer store");
        self.txn.apply(self.buffer)
    }
}

impl Retriever for BufferStore<'_> {
    fn get(&mut self, key: &Key) -> KvResult<Option<Value>> {
        match self.buffer.lookup(key) {
            Some(value) => Ok(value.cloned()),
            None => self.txn.get(key),
        }
    }

    fn seek(&self, key: &Key) -> KvResult<Box<dyn KvIterator>> {
        let mut base = Vec::new();
        let mut it = self.txn.seek(key)?;
        while it.valid() {
            base.push((it.key().clone(), it.value().clone()));
            it.next()?;
        }
        Ok(Box::new(VecIter::new(self.buffer.overlay(base, key))))
    }
}

impl Mutator for BufferStore<'_> {
    fn set(&mut self, key: Key, value: Value) -> KvResult<()> {
        self.buffer.set(key, value)
    }

    fn delete(&mut self, key: Key) -> KvResult<()> {
        self.buffer.delete(key);
        Ok(())
    }
}

impl Options for BufferStore<'_> {
    fn set_option(&mut self, option: TxnOption) {
        self.txn.set_option(option);
    }

    fn del_option(&mut self, kind: OptionKind) {
        self.txn.del_option(kind);
    }
}
