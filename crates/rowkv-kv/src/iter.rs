//! Materialized iterators.

use rowkv_common::{Key, KvResult, Value};

use crate::traits::KvIterator;

static EMPTY_KEY: Key = Key::empty();
static EMPTY_VALUE: Value = Value::empty();

/// An iterator over an owned, already sorted list of entries.
///
/// Used by the in-memory store and the buffering layer, which both resolve
/// the visible entries up front and then hand the caller a cursor that holds
/// no locks.
#[derive(Debug, Default)]
pub struct VecIter {
    entries: Vec<(Key, Value)>,
    pos: usize,
}

impl VecIter {
    /// Creates an iterator over `entries`, which must be sorted by key.
    #[must_use]
    pub fn new(entries: Vec<(Key, Value)>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
        Self { entries, pos: 0 }
    }

    /// Returns the number of entries not yet visited.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.entries.len().saturating_sub(self.pos)
    }
}

impl KvIterator for VecIter {
    fn valid(&self) -> bool {
        self.pos < self.entries.len()
    }

    fn key(&self) -> &Key {
        self.entries.get(self.pos).map_or(&EMPTY_KEY, |(k, _)| k)
    }

    fn value(&self) -> &Value {
        self.entries.get(self.pos).map_or(&EMPTY_VALUE, |(_, v)| v)
    }

    fn next(&mut self) -> KvResult<()> {
        if self.valid() {
            self.pos += 1;
        }
        Ok(())
    }
}
