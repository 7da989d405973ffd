//! # rowkv-common
//!
//! Common types, errors, and configuration shared by the rowkv crates.
//!
//! This crate provides the foundational pieces every other layer builds on:
//!
//! - **Types**: ordered byte keys and values, table/index/column identifiers
//! - **Errors**: the key-value layer error type `KvError` with stable codes
//! - **Config**: `StoreConfig`, loadable from TOML
//! - **Constants**: key-space markers and size limits
//!
//! ## Example
//!
//! ```rust
//! use rowkv_common::types::{Key, TableId};
//!
//! let table = TableId::new(42);
//! let key = Key::from_bytes(b"t_r");
//! assert!(key.starts_with(b"t"));
//! assert_eq!(table.as_i64(), 42);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::{AllocConfig, ConfigError, KvConfig, StoreConfig, TableConfig};
pub use error::{ErrorCode, KvError, KvResult};
pub use types::{ColumnId, IndexId, Key, TableId, TxnId, Value};
