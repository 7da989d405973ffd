//! Transaction options.
//!
//! The only option today is the presume-key-not-exists directive. While it
//! is armed, a read that finds a key outside the transaction's own writes
//! fails with [`KvError::KeyExists`], and a read that finds nothing is
//! remembered and re-verified at commit.

use std::ops::{Deref, DerefMut};

use rowkv_common::KvError;

/// Description of a unique key, reported if a presumed-absent key exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyConflict {
    /// Name of the unique key (index name, or `PRIMARY` for the handle).
    pub index: String,
    /// Rendered key value.
    pub entry: String,
}

impl KeyConflict {
    /// Creates a conflict description.
    #[must_use]
    pub fn new(index: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            entry: entry.into(),
        }
    }

    /// Converts the description into the error reported to the caller.
    #[must_use]
    pub fn into_error(self) -> KvError {
        KvError::KeyExists {
            index: self.index,
            entry: self.entry,
        }
    }
}

/// An option that can be set on a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnOption {
    /// Presume the keys read next do not exist.
    PresumeKeyNotExists(KeyConflict),
}

impl TxnOption {
    /// Returns the kind of this option.
    #[must_use]
    pub const fn kind(&self) -> OptionKind {
        match self {
            Self::PresumeKeyNotExists(_) => OptionKind::PresumeKeyNotExists,
        }
    }
}

/// Identifies an option without its payload, for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    /// See [`TxnOption::PresumeKeyNotExists`].
    PresumeKeyNotExists,
}

/// Something that accepts transaction options.
pub trait Options {
    /// Sets an option, replacing any previous value of the same kind.
    fn set_option(&mut self, option: TxnOption);

    /// Clears an option. Clearing an unset option is a no-op.
    fn del_option(&mut self, kind: OptionKind);
}

/// Arms the presume-key-not-exists directive for as long as it lives.
///
/// The guard dereferences to the armed target, so probes go through it. The
/// directive is cleared on drop, whichever way the probe ends.
///
/// # Example
///
/// ```rust
/// use rowkv_common::{Key, KvConfig, Value};
/// use rowkv_kv::{KeyConflict, MemoryStorage, Mutator, PresumeKeyNotExists, Retriever, Storage, Transaction};
///
/// let storage = MemoryStorage::new(KvConfig::default());
/// let mut txn = storage.begin().unwrap();
/// txn.set(Key::from_bytes(b"k"), Value::from_bytes(b"v")).unwrap();
/// txn.commit().unwrap();
///
/// let mut txn = storage.begin().unwrap();
/// {
///     let mut probe = PresumeKeyNotExists::arm(&mut *txn, KeyConflict::new("PRIMARY", "1"));
///     let err = probe.get(&Key::from_bytes(b"k")).unwrap_err();
///     assert!(err.is_key_exists());
/// }
/// // Disarmed: a plain read again.
/// assert!(txn.get(&Key::from_bytes(b"k")).unwrap().is_some());
/// ```
pub struct PresumeKeyNotExists<'a, T: Options + ?Sized> {
    target: &'a mut T,
}

impl<'a, T: Options + ?Sized> PresumeKeyNotExists<'a, T> {
    /// Arms the directive on `target` with the given conflict description.
    pub fn arm(target: &'a mut T, conflict: KeyConflict) -> Self {
        target.set_option(TxnOption::PresumeKeyNotExists(conflict));
        Self { target }
    }
}

impl<T: Options + ?Sized> Deref for PresumeKeyNotExists<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.target
    }
}

impl<T: Options + ?Sized> DerefMut for PresumeKeyNotExists<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.target
    }
}

impl<T: Options + ?Sized> Drop for PresumeKeyNotExists<'_, T> {
    fn drop(&mut self) {
        self.target.del_option(OptionKind::PresumeKeyNotExists);
    }
}
