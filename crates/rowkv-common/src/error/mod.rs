//! Error handling for the key-value layer.
//!
//! This module provides the error type and result alias returned by every
//! store, transaction, and allocator operation.

mod kv;

pub use kv::{ErrorCode, KvError};

/// Result type alias for key-value operations.
pub type KvResult<T> = std::result::Result<T, KvError>;
