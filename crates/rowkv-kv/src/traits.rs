//! The store contract.
//!
//! The record layer only ever talks to these traits. Every method is
//! synchronous; a transaction is used through `&mut` so it can never be
//! shared between threads while in use.

use rowkv_common::{Key, KvResult, TxnId, Value};

use crate::buffer::MemBuffer;
use crate::options::Options;

/// Read access to an ordered key space.
pub trait Retriever {
    /// Returns the value stored under `key`, or `None` if absent.
    ///
    /// Takes `&mut self` because a transaction armed with
    /// [`TxnOption::PresumeKeyNotExists`](crate::TxnOption::PresumeKeyNotExists)
    /// records keys it found absent so they can be re-verified at commit.
    fn get(&mut self, key: &Key) -> KvResult<Option<Value>>;

    /// Returns an iterator positioned at the first key `>= key`.
    fn seek(&self, key: &Key) -> KvResult<Box<dyn KvIterator>>;
}

/// Write access to an ordered key space.
pub trait Mutator {
    /// Stores `value` under `key`. Empty values are rejected.
    fn set(&mut self, key: Key, value: Value) -> KvResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn delete(&mut self, key: Key) -> KvResult<()>;
}

/// Anything that can both read and write keys.
pub trait RetrieverMutator: Retriever + Mutator {}

impl<T: Retriever + Mutator + ?Sized> RetrieverMutator for T {}

/// A cursor over key/value pairs in ascending key order.
///
/// Dropping the iterator releases it.
pub trait KvIterator: Send {
    /// Returns true while the iterator is positioned on an entry.
    fn valid(&self) -> bool;

    /// Returns the current key. Empty when the iterator is exhausted.
    fn key(&self) -> &Key;

    /// Returns the current value. Empty when the iterator is exhausted.
    fn value(&self) -> &Value;

    /// Advances to the next entry.
    fn next(&mut self) -> KvResult<()>;
}

/// A transaction over the store.
///
/// Reads observe a snapshot taken at [`start_ts`](Transaction::start_ts)
/// overlaid with the transaction's own writes. Writes become visible to
/// others only after [`commit`](Transaction::commit) succeeds.
pub trait Transaction: Retriever + Mutator + Options + Send {
    /// Returns the transaction identifier.
    fn id(&self) -> TxnId;

    /// Returns the snapshot timestamp.
    fn start_ts(&self) -> u64;

    /// Returns true until the transaction commits or rolls back.
    fn is_valid(&self) -> bool;

    /// Adds every write of `buffer` to the transaction, or none of them if
    /// any key or value is rejected.
    fn apply(&mut self, buffer: MemBuffer) -> KvResult<()>;

    /// Commits all writes atomically and returns the commit timestamp.
    ///
    /// Fails with [`KvError::WriteConflict`](rowkv_common::KvError::WriteConflict)
    /// if another transaction committed one of the written keys after this
    /// transaction started, or with
    /// [`KvError::KeyExists`](rowkv_common::KvError::KeyExists) if a key
    /// presumed absent was created by someone else in the meantime. On
    /// failure nothing is applied and the transaction is closed.
    fn commit(&mut self) -> KvResult<u64>;

    /// Discards all writes.
    fn rollback(&mut self) -> KvResult<()>;
}

/// A store that hands out transactions.
pub trait Storage: Send + Sync {
    /// Starts a new transaction.
    fn begin(&self) -> KvResult<Box<dyn Transaction>>;
}
