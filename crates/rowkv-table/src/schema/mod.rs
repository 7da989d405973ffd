//! Table metadata and online schema-change states.
//!
//! Adding a column or index walks it through
//! `None -> DeleteOnly -> WriteOnly -> WriteReorganization -> Public`;
//! dropping walks back through
//! `Public -> WriteOnly -> DeleteOnly -> DeleteReorganization -> None`.
//! The state decides whether writes maintain the element and whether reads
//! see it.

mod info;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use info::{ColumnDefault, ColumnInfo, IndexColumn, IndexInfo, TableInfo};

/// Lifecycle state of a table, column or index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SchemaState {
    /// Not yet created, or fully dropped. Never valid on a live table.
    None,
    /// Only deletions maintain the element.
    DeleteOnly,
    /// Writes maintain the element; reads do not see it.
    WriteOnly,
    /// Existing rows are being backfilled.
    WriteReorganization,
    /// Entries are being cleaned up after a drop.
    DeleteReorganization,
    /// Fully visible.
    #[default]
    Public,
}

impl SchemaState {
    /// Returns true if reads see the element.
    #[inline]
    pub fn is_public(self) -> bool {
        self == SchemaState::Public
    }

    /// Returns true if inserts and updates maintain the element.
    #[inline]
    pub fn is_writable(self) -> bool {
        !matches!(
            self,
            SchemaState::DeleteOnly | SchemaState::DeleteReorganization
        )
    }

    /// Returns true if an added column must be filled from its default.
    #[inline]
    pub fn needs_default(self) -> bool {
        matches!(
            self,
            SchemaState::WriteOnly | SchemaState::WriteReorganization
        )
    }
}

impl fmt::Display for SchemaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaState::None => write!(f, "none"),
            SchemaState::DeleteOnly => write!(f, "delete only"),
            SchemaState::WriteOnly => write!(f, "write only"),
            SchemaState::WriteReorganization => write!(f, "write reorganization"),
            SchemaState::DeleteReorganization => write!(f, "delete reorganization"),
            SchemaState::Public => write!(f, "public"),
        }
    }
}
