//! Type definitions for rowkv.
//!
//! This module contains the byte-level key/value types and the identifier
//! newtypes used across the key space.

mod ids;
mod keys;

pub use ids::{ColumnId, IndexId, TableId, TxnId};
pub use keys::{Key, Value};
