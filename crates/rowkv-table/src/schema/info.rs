//! Table, column and index metadata as handed down by the DDL subsystem.

use std::collections::HashSet;

use rowkv_common::{ColumnId, IndexId, TableId};
use serde::{Deserialize, Serialize};

use super::SchemaState;
use crate::error::{SchemaElement, TableError, TableResult};
use crate::types::{Datum, FieldType};

/// A declared column default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnDefault {
    /// A constant.
    Value(Datum),
    /// The time the row is written.
    CurrentTimestamp,
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Stable column id, used in row payloads.
    pub id: ColumnId,
    /// Column name.
    pub name: String,
    /// Position in a full row.
    pub offset: usize,
    /// Declared type.
    pub field_type: FieldType,
    /// Declared default, if any.
    #[serde(default)]
    pub default_value: Option<ColumnDefault>,
    /// Lifecycle state.
    #[serde(default)]
    pub state: SchemaState,
}

impl ColumnInfo {
    /// Creates a public column without a default.
    pub fn new(id: i64, name: impl Into<String>, offset: usize, field_type: FieldType) -> Self {
        Self {
            id: ColumnId::new(id),
            name: name.into(),
            offset,
            field_type,
            default_value: None,
            state: SchemaState::Public,
        }
    }

    /// Sets the default.
    #[must_use]
    pub fn with_default(mut self, default: ColumnDefault) -> Self {
        self.default_value = Some(default);
        self
    }

    /// Sets the lifecycle state.
    #[must_use]
    pub fn with_state(mut self, state: SchemaState) -> Self {
        self.state = state;
        self
    }
}

/// A column participating in an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    /// Column name.
    pub name: String,
    /// Offset of the column in a full row.
    pub offset: usize,
}

impl IndexColumn {
    /// Creates an index column.
    pub fn new(name: impl Into<String>, offset: usize) -> Self {
        Self {
            name: name.into(),
            offset,
        }
    }
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    /// Index id, unique within the table.
    pub id: IndexId,
    /// Index name.
    pub name: String,
    /// Indexed columns in key order.
    pub columns: Vec<IndexColumn>,
    /// Whether values must be distinct.
    #[serde(default)]
    pub unique: bool,
    /// Whether this is the table's primary key.
    #[serde(default)]
    pub primary: bool,
    /// Lifecycle state.
    #[serde(default)]
    pub state: SchemaState,
}

impl IndexInfo {
    /// Creates a public non-unique index.
    pub fn new(id: i64, name: impl Into<String>, columns: Vec<IndexColumn>) -> Self {
        Self {
            id: IndexId::new(id),
            name: name.into(),
            columns,
            unique: false,
            primary: false,
            state: SchemaState::Public,
        }
    }

    /// Marks the index unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the index as the primary key. Primary implies unique.
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self.unique = true;
        self
    }

    /// Sets the lifecycle state.
    #[must_use]
    pub fn with_state(mut self, state: SchemaState) -> Self {
        self.state = state;
        self
    }
}

/// Table metadata.
///
/// # Example
///
/// ```rust
/// use rowkv_table::schema::{ColumnInfo, IndexColumn, IndexInfo, TableInfo};
/// use rowkv_table::types::{FieldFlags, FieldType};
///
/// let meta = TableInfo::new(1, "t")
///     .with_column(ColumnInfo::new(
///         1,
///         "id",
///         0,
///         FieldType::long_long().with_flags(FieldFlags::PRI_KEY | FieldFlags::NOT_NULL),
///     ))
///     .with_column(ColumnInfo::new(2, "name", 1, FieldType::varchar()))
///     .with_index(IndexInfo::new(1, "name_idx", vec![IndexColumn::new("name", 1)]).unique())
///     .with_pk_is_handle(true);
/// assert!(meta.validate().is_ok());
/// assert_eq!(meta.pk_handle_column().map(|c| c.name.as_str()), Some("id"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table id.
    pub id: TableId,
    /// Table name.
    pub name: String,
    /// Columns in offset order.
    pub columns: Vec<ColumnInfo>,
    /// Indices.
    #[serde(default)]
    pub indices: Vec<IndexInfo>,
    /// Whether the primary-key column doubles as the row handle.
    #[serde(default)]
    pub pk_is_handle: bool,
    /// Lifecycle state.
    #[serde(default)]
    pub state: SchemaState,
}

impl TableInfo {
    /// Creates a public table with no columns.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: TableId::new(id),
            name: name.into(),
            columns: Vec::new(),
            indices: Vec::new(),
            pk_is_handle: false,
            state: SchemaState::Public,
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn with_column(mut self, column: ColumnInfo) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn with_index(mut self, index: IndexInfo) -> Self {
        self.indices.push(index);
        self
    }

    /// Sets whether the primary-key column is the handle.
    #[must_use]
    pub fn with_pk_is_handle(mut self, pk_is_handle: bool) -> Self {
        self.pk_is_handle = pk_is_handle;
        self
    }

    /// Sets the lifecycle state.
    #[must_use]
    pub fn with_state(mut self, state: SchemaState) -> Self {
        self.state = state;
        self
    }

    /// Returns the column whose value is the row handle, if any.
    pub fn pk_handle_column(&self) -> Option<&ColumnInfo> {
        if !self.pk_is_handle {
            return None;
        }
        self.columns.iter().find(|c| c.field_type.is_pri_key())
    }

    /// Returns the primary index, if any.
    pub fn primary_index(&self) -> Option<&IndexInfo> {
        self.indices.iter().find(|i| i.primary)
    }

    /// Returns true if rows are identified by a primary key.
    pub fn has_primary_key(&self) -> bool {
        self.pk_is_handle || self.primary_index().is_some()
    }

    /// Looks up a column by name, case-insensitively.
    pub fn column_by_name(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Checks the metadata is usable.
    ///
    /// No element may be in the `None` state, column offsets must be dense
    /// and ids distinct, there is at most one primary index and every index
    /// column must exist.
    pub fn validate(&self) -> TableResult<()> {
        if self.state == SchemaState::None {
            return Err(TableError::SchemaState {
                kind: SchemaElement::Table,
                name: self.name.clone(),
            });
        }

        let mut ids = HashSet::with_capacity(self.columns.len());
        for (pos, col) in self.columns.iter().enumerate() {
            if col.state == SchemaState::None {
                return Err(TableError::SchemaState {
                    kind: SchemaElement::Column,
                    name: col.name.clone(),
                });
            }
            if col.offset != pos {
                return Err(TableError::InvalidSchema(format!(
                    "column {} has offset {} at position {pos}",
                    col.name, col.offset
                )));
            }
            if !ids.insert(col.id) {
                return Err(TableError::InvalidSchema(format!(
                    "duplicate column id {}",
                    col.id
                )));
            }
        }

        if self.pk_is_handle
            && self
                .columns
                .iter()
                .filter(|c| c.field_type.is_pri_key())
                .count()
                > 1
        {
            return Err(TableError::InvalidSchema(format!(
                "table {} has more than one handle column",
                self.name
            )));
        }

        let mut primaries = 0;
        for idx in &self.indices {
            if idx.state == SchemaState::None {
                return Err(TableError::SchemaState {
                    kind: SchemaElement::Index,
                    name: idx.name.clone(),
                });
            }
            if idx.primary {
                primaries += 1;
            }
            if let Some(col) = idx.columns.iter().find(|c| c.offset >= self.columns.len()) {
                return Err(TableError::InvalidSchema(format!(
                    "index {} references column {} at missing offset {}",
                    idx.name, col.name, col.offset
                )));
            }
        }
        if primaries > 1 {
            return Err(TableError::InvalidSchema(format!(
                "table {} has {primaries} primary indices",
                self.name
            )));
        }
        Ok(())
    }
}
