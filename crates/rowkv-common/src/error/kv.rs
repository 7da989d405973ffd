//! Key-value layer error types.

use std::fmt;
use thiserror::Error;

use crate::types::{Key, TableId, TxnId};

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Internal error (bug).
    Internal = 0x0001,
    /// Invalid argument provided.
    InvalidArgument = 0x0003,

    // Storage errors (0x0200 - 0x02FF)
    /// Data corruption detected.
    Corruption = 0x0104,
    /// Key not found.
    KeyNotFound = 0x0203,
    /// Key already exists.
    KeyExists = 0x0204,
    /// Key too large.
    KeyTooLarge = 0x0205,
    /// Value too large.
    ValueTooLarge = 0x0206,

    // Transaction errors (0x0300 - 0x03FF)
    /// Write-write conflict detected at commit.
    TransactionConflict = 0x0301,
    /// Transaction already committed or rolled back.
    TransactionClosed = 0x0305,

    // Allocator errors (0x0700 - 0x07FF)
    /// Handle space exhausted.
    AllocatorExhausted = 0x0700,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 | 0x02 => "Storage",
            0x03 => "Transaction",
            0x07 => "Allocator",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Errors raised by the ordered transactional key-value store and its
/// collaborators (buffering layer, handle allocator).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KvError {
    /// A key expected to be present was absent.
    #[error("key {key} does not exist")]
    NotExist {
        /// The missing key.
        key: Key,
    },

    /// A key presumed absent was found.
    ///
    /// Carries the conflict description armed on the transaction before the
    /// probe, so the report names the unique key rather than raw bytes.
    #[error("Duplicate entry '{entry}' for key '{index}'")]
    KeyExists {
        /// Name of the unique key that collided.
        index: String,
        /// Rendered key value.
        entry: String,
    },

    /// Another transaction committed a write to the same key after this
    /// transaction's snapshot was taken.
    #[error("write conflict on key {key}: txn {txn_id} read at {start_ts}, key committed at {conflict_ts}")]
    WriteConflict {
        /// The conflicting key.
        key: Key,
        /// The transaction that lost.
        txn_id: TxnId,
        /// Snapshot timestamp of the losing transaction.
        start_ts: u64,
        /// Commit timestamp of the winning write.
        conflict_ts: u64,
    },

    /// The transaction has already committed or rolled back.
    #[error("transaction {txn_id} is no longer active")]
    TransactionClosed {
        /// The closed transaction.
        txn_id: TxnId,
    },

    /// Key is too large.
    #[error("key size {size} exceeds maximum {max_size}")]
    KeyTooLarge {
        /// Actual key size.
        size: usize,
        /// Maximum allowed size.
        max_size: usize,
    },

    /// Value is too large.
    #[error("value size {size} exceeds maximum {max_size}")]
    ValueTooLarge {
        /// Actual value size.
        size: usize,
        /// Maximum allowed size.
        max_size: usize,
    },

    /// Empty values are reserved as deletion markers.
    #[error("cannot set an empty value for key {key}")]
    EmptyValue {
        /// The offending key.
        key: Key,
    },

    /// The handle allocator cannot issue more handles.
    #[error("handle space exhausted for table {table_id}")]
    AllocatorExhausted {
        /// Table whose allocator overflowed.
        table_id: TableId,
    },

    /// Data corruption detected.
    #[error("data corruption detected: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },

    /// Internal error - this indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl KvError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotExist { .. } => ErrorCode::KeyNotFound,
            Self::KeyExists { .. } => ErrorCode::KeyExists,
            Self::WriteConflict { .. } => ErrorCode::TransactionConflict,
            Self::TransactionClosed { .. } => ErrorCode::TransactionClosed,
            Self::KeyTooLarge { .. } => ErrorCode::KeyTooLarge,
            Self::ValueTooLarge { .. } => ErrorCode::ValueTooLarge,
            Self::EmptyValue { .. } => ErrorCode::InvalidArgument,
            Self::AllocatorExhausted { .. } => ErrorCode::AllocatorExhausted,
            Self::Corruption { .. } => ErrorCode::Corruption,
            Self::Internal { .. } => ErrorCode::Internal,
        }
    }

    /// Returns true if the transaction layer above may retry the whole
    /// transaction after this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::WriteConflict { .. })
    }

    /// Returns true if this error represents a transaction conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::WriteConflict { .. })
    }

    /// Returns true if this is the "key does not exist" condition.
    #[must_use]
    pub const fn is_not_exist(&self) -> bool {
        matches!(self, Self::NotExist { .. })
    }

    /// Returns true if this is a presumed-absent key that turned out to exist.
    #[must_use]
    pub const fn is_key_exists(&self) -> bool {
        matches!(self, Self::KeyExists { .. })
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    #[must_use]
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }
}
