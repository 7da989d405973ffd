//! Record layer error types.

use std::fmt;

use rowkv_common::{KvError, TableId};
use thiserror::Error;

/// Result type alias for record layer operations.
pub type TableResult<T> = std::result::Result<T, TableError>;

/// The kind of schema element named by a schema-state error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaElement {
    /// A table.
    Table,
    /// A column.
    Column,
    /// An index.
    Index,
}

impl fmt::Display for SchemaElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaElement::Table => write!(f, "table"),
            SchemaElement::Column => write!(f, "column"),
            SchemaElement::Index => write!(f, "index"),
        }
    }
}

/// Errors raised by table operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// A schema element is in the undefined state.
    #[error("{kind} {name} can't be in none state")]
    SchemaState {
        /// Kind of element.
        kind: SchemaElement,
        /// Element name.
        name: String,
    },

    /// Table metadata is malformed.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A unique or primary key already holds this value.
    #[error("Duplicate entry '{entry}' for key '{index}'")]
    DuplicateKey {
        /// Name of the violated key.
        index: String,
        /// Rendered key value.
        entry: String,
        /// Handle of the row already holding the value, when known. Unknown
        /// when the conflict is detected by the store rather than by reading
        /// the transaction's own writes.
        existing: Option<i64>,
    },

    /// A utf8-family column holds malformed UTF-8.
    #[error("invalid utf8 value \"{}\" for column {}", .value.escape_ascii(), .column)]
    InvalidEncoding {
        /// Column name.
        column: String,
        /// Offending bytes.
        value: Vec<u8>,
    },

    /// A NOT NULL column is absent from a stored row.
    #[error("column {column} missing from row {handle} of table {table}")]
    MissingColumn {
        /// Table id.
        table: TableId,
        /// Row handle.
        handle: i64,
        /// Column name.
        column: String,
    },

    /// No row is stored under the handle.
    #[error("row {handle} of table {table} not found")]
    RowNotFound {
        /// Table id.
        table: TableId,
        /// Row handle.
        handle: i64,
    },

    /// A row is too short for the column offsets it is read at.
    #[error("column offset {offset} out of range for a row of {len} values")]
    ColumnOffset {
        /// Requested offset.
        offset: usize,
        /// Row length.
        len: usize,
    },

    /// The store failed.
    #[error("{context}: {source}")]
    Store {
        /// What the record layer was doing.
        context: &'static str,
        /// Store error.
        #[source]
        source: KvError,
    },

    /// The handle allocator failed.
    #[error("allocating handle for table {table_id}: {source}")]
    Allocator {
        /// Table id.
        table_id: TableId,
        /// Allocator error.
        #[source]
        source: KvError,
    },

    /// A column default could not be produced.
    #[error("default value for column {column}: {reason}")]
    DefaultValue {
        /// Column name.
        column: String,
        /// Why evaluation failed.
        reason: String,
    },

    /// Encoded data is malformed.
    #[error("codec error: {0}")]
    Codec(String),

    /// The operation needs a collaborator the table was built without.
    #[error("table {0} was built without an allocator")]
    NoAllocator(TableId),
}

impl TableError {
    /// Wraps a store error with context.
    ///
    /// A presumed-absent key reported by the store becomes a
    /// [`TableError::DuplicateKey`]; everything else is kept as a store
    /// error.
    #[must_use]
    pub fn store(context: &'static str, source: KvError) -> Self {
        match source {
            KvError::KeyExists { index, entry } => Self::DuplicateKey {
                index,
                entry,
                existing: None,
            },
            source => Self::Store { context, source },
        }
    }

    /// Creates a codec error.
    #[must_use]
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }

    /// Returns true for unique/primary key violations.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Returns true if the wrapped store error is "key does not exist".
    #[must_use]
    pub fn is_not_exist(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_not_exist())
    }

    /// Returns true if retrying the whole transaction may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowkv_common::Key;

    #[test]
    fn test_duplicate_message() {
        let err = TableError::DuplicateKey {
            index: "name_idx".to_string(),
            entry: "alice".to_string(),
            existing: Some(1),
        };
        assert_eq!(err.to_string(), "Duplicate entry 'alice' for key 'name_idx'");
        assert!(err.is_duplicate());
    }

    #[test]
    fn test_store_maps_key_exists() {
        let err = TableError::store(
            "commit",
            KvError::KeyExists {
                index: "PRIMARY".to_string(),
                entry: "7".to_string(),
            },
        );
        assert!(matches!(
            err,
            TableError::DuplicateKey { existing: None, ref entry, .. } if entry == "7"
        ));
    }

    #[test]
    fn test_store_keeps_other_errors() {
        let err = TableError::store(
            "deleting index entry",
            KvError::NotExist {
                key: Key::from_bytes(b"k"),
            },
        );
        assert!(err.is_not_exist());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "deleting index entry: key 6b does not exist");
    }

    #[test]
    fn test_invalid_encoding_message() {
        let err = TableError::InvalidEncoding {
            column: "name".to_string(),
            value: vec![b'a', 0xff],
        };
        assert_eq!(
            err.to_string(),
            "invalid utf8 value \"a\\xff\" for column name"
        );
    }

    #[test]
    fn test_schema_state_message() {
        let err = TableError::SchemaState {
            kind: SchemaElement::Column,
            name: "c".to_string(),
        };
        assert_eq!(err.to_string(), "column c can't be in none state");
    }
}
