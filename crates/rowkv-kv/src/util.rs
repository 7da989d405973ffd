//! Prefix helpers over the store contract.

use rowkv_common::{Key, KvResult};
use tracing::debug;

use crate::traits::{KvIterator, RetrieverMutator};

/// Advances `it` until it is exhausted or `until` accepts the current key.
pub fn next_until<F>(it: &mut dyn KvIterator, until: F) -> KvResult<()>
where
    F: Fn(&Key) -> bool,
{
    while it.valid() && !until(it.key()) {
        it.next()?;
    }
    Ok(())
}

/// Deletes every key starting with `prefix` and returns how many there were.
pub fn delete_key_with_prefix<R>(rm: &mut R, prefix: &Key) -> KvResult<usize>
where
    R: RetrieverMutator + ?Sized,
{
    let end = prefix.prefix_next();
    let mut keys = Vec::new();
    {
        let mut it = rm.seek(prefix)?;
        while it.valid() && *it.key() < end {
            keys.push(it.key().clone());
            it.next()?;
        }
    }

    let count = keys.len();
    for key in keys {
        rm.delete(key)?;
    }
    debug!(%prefix, count, "deleted keys with prefix");
    Ok(count)
}
