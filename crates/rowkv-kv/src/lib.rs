//! # rowkv-kv
//!
//! The ordered transactional key-value store the record layer is written
//! against, plus everything needed to drive it:
//!
//! - **Contract**: [`Retriever`], [`Mutator`], [`Transaction`], [`KvIterator`]
//!   and [`Storage`]
//! - **Options**: transaction options and the [`PresumeKeyNotExists`] guard
//!   used for lazy uniqueness checks
//! - **Buffering**: [`MemBuffer`] and [`BufferStore`], which stage writes
//!   over a transaction and flush them in one step
//! - **Reference store**: [`MemoryStorage`], a snapshot-isolated in-memory
//!   store with first-committer-wins conflict detection
//! - **Allocation**: the [`Allocator`] contract and [`MemoryAllocator`]
//!
//! ## Example
//!
//! ```rust
//! use rowkv_common::{Key, KvConfig, Value};
//! use rowkv_kv::{MemoryStorage, Mutator, Retriever, Storage, Transaction};
//!
//! let storage = MemoryStorage::new(KvConfig::default());
//! let mut txn = storage.begin().unwrap();
//! txn.set(Key::from_bytes(b"k"), Value::from_bytes(b"v")).unwrap();
//! txn.commit().unwrap();
//!
//! let mut txn = storage.begin().unwrap();
//! assert!(txn.get(&Key::from_bytes(b"k")).unwrap().is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alloc;
pub mod buffer;
pub mod iter;
pub mod memory;
pub mod options;
pub mod traits;
pub mod util;

pub use alloc::{Allocator, MemoryAllocator};
pub use buffer::{BufferStore, MemBuffer};
pub use iter::VecIter;
pub use memory::{MemoryStorage, MemoryTxn};
pub use options::{KeyConflict, OptionKind, Options, PresumeKeyNotExists, TxnOption};
pub use traits::{KvIterator, Mutator, Retriever, RetrieverMutator, Storage, Transaction};
pub use util::{delete_key_with_prefix, next_until};
