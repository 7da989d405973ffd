//! Row handle allocation.
//!
//! Tables without a handle column draw row handles from an [`Allocator`].
//! [`MemoryAllocator`] reserves handles in batches the way a persistent
//! auto-id allocator would: `base` is the last handle issued and `end` the
//! last handle of the reserved batch.

use parking_lot::Mutex;
use rowkv_common::{AllocConfig, KvError, KvResult, TableId};
use tracing::debug;

/// Issues row handles for a table.
pub trait Allocator: Send + Sync {
    /// Returns the next unused handle. Handles are positive and increasing.
    fn alloc(&self, table_id: TableId) -> KvResult<i64>;

    /// Moves the allocator so every later handle is greater than `new_base`.
    ///
    /// A `new_base` at or below the current base is ignored. When `is_step`
    /// is set and `new_base` lies beyond the reserved batch, a full new batch
    /// is reserved past it; otherwise only `new_base` itself is reserved.
    fn rebase(&self, table_id: TableId, new_base: i64, is_step: bool) -> KvResult<()>;

    /// Returns the last handle issued (or rebased to).
    fn base(&self) -> i64;
}

#[derive(Debug, Default)]
struct AllocState {
    base: i64,
    end: i64,
}

/// An in-memory batched allocator.
#[derive(Debug)]
pub struct MemoryAllocator {
    step: i64,
    state: Mutex<AllocState>,
}

impl MemoryAllocator {
    /// Creates an allocator reserving `config.step` handles per batch.
    #[must_use]
    pub fn new(config: &AllocConfig) -> Self {
        Self {
            step: config.step.max(1),
            state: Mutex::new(AllocState::default()),
        }
    }

    /// Returns the last handle of the reserved batch.
    #[must_use]
    pub fn end(&self) -> i64 {
        self.state.lock().end
    }
}

impl Default for MemoryAllocator {
    fn default() -> Self {
        Self::new(&AllocConfig::default())
    }
}

impl Allocator for MemoryAllocator {
    fn alloc(&self, table_id: TableId) -> KvResult<i64> {
        let mut state = self.state.lock();
        let next = state
            .base
            .checked_add(1)
            .ok_or(KvError::AllocatorExhausted { table_id })?;

        if next > state.end {
            let end = state.base.saturating_add(self.step);
            debug!(%table_id, from = state.base, to = end, "reserved handle batch");
            state.end = end;
        }

        state.base = next;
        Ok(next)
    }

    fn rebase(&self, table_id: TableId, new_base: i64, is_step: bool) -> KvResult<()> {
        let mut state = self.state.lock();
        if new_base <= state.base {
            return Ok(());
        }

        if new_base > state.end {
            state.end = if is_step {
                new_base.saturating_add(self.step)
            } else {
                new_base
            };
        }
        state.base = new_base;
        debug!(%table_id, base = state.base, end = state.end, "rebased allocator");
        Ok(())
    }

    fn base(&self) -> i64 {
        self.state.lock().base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: TableId = TableId::new(1);

    #[test]
    fn test_alloc_is_increasing() {
        let alloc = MemoryAllocator::new(&AllocConfig { step: 2 });
        assert_eq!(alloc.alloc(TABLE).unwrap(), 1);
        assert_eq!(alloc.alloc(TABLE).unwrap(), 2);
        assert_eq!(alloc.end(), 2);
        assert_eq!(alloc.alloc(TABLE).unwrap(), 3);
        assert_eq!(alloc.end(), 4);
        assert_eq!(alloc.base(), 3);
    }

    #[test]
    fn test_rebase() {
        let alloc = MemoryAllocator::new(&AllocConfig { step: 10 });
        alloc.alloc(TABLE).unwrap();

        // Lower bases are ignored.
        alloc.rebase(TABLE, 0, true).unwrap();
        assert_eq!(alloc.base(), 1);

        // Inside the batch.
        alloc.rebase(TABLE, 5, false).unwrap();
        assert_eq!(alloc.alloc(TABLE).unwrap(), 6);
        assert_eq!(alloc.end(), 10);

        // Past the batch without a step reserves exactly the new base.
        alloc.rebase(TABLE, 100, false).unwrap();
        assert_eq!(alloc.end(), 100);

        // With a step a new batch follows it.
        alloc.rebase(TABLE, 200, true).unwrap();
        assert_eq!(alloc.end(), 210);
        assert_eq!(alloc.alloc(TABLE).unwrap(), 201);
    }

    #[test]
    fn test_exhausted() {
        let alloc = MemoryAllocator::default();
        alloc.rebase(TABLE, i64::MAX, false).unwrap();
        let err = alloc.alloc(TABLE).unwrap_err();
        assert!(matches!(err, KvError::AllocatorExhausted { .. }));
    }
}
