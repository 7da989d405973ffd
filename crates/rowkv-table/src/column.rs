//! Column handles and the touched-column set.

use std::ops::Deref;
use std::sync::Arc;

use crate::schema::ColumnInfo;

/// A column of a [`Table`](crate::Table).
///
/// Cheap to clone; shares the metadata it was built from.
#[derive(Debug, Clone)]
pub struct Column(Arc<ColumnInfo>);

impl Column {
    /// Wraps column metadata.
    pub fn new(info: ColumnInfo) -> Self {
        Self(Arc::new(info))
    }

    /// Returns the metadata.
    #[inline]
    pub fn info(&self) -> &ColumnInfo {
        &self.0
    }

    /// Returns true if this column holds the row handle of a table whose
    /// primary key is the handle.
    #[inline]
    pub fn is_pk_handle_column(&self, pk_is_handle: bool) -> bool {
        pk_is_handle && self.field_type.is_pri_key()
    }
}

impl Deref for Column {
    type Target = ColumnInfo;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Which columns of an update carry new values, by column offset.
///
/// # Example
///
/// ```rust
/// use rowkv_table::TouchedColumns;
///
/// let mut touched = TouchedColumns::new(3);
/// touched.touch(1);
/// assert!(touched.is_touched(1));
/// assert!(!touched.is_touched(2));
/// assert!(!touched.is_touched(7));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TouchedColumns {
    bits: Vec<bool>,
}

impl TouchedColumns {
    /// Creates a set of `len` untouched columns.
    pub fn new(len: usize) -> Self {
        Self {
            bits: vec![false; len],
        }
    }

    /// Creates a set with the listed offsets touched.
    pub fn from_offsets(len: usize, offsets: impl IntoIterator<Item = usize>) -> Self {
        let mut touched = Self::new(len);
        for offset in offsets {
            touched.touch(offset);
        }
        touched
    }

    /// Marks `offset` touched, growing the set if needed.
    pub fn touch(&mut self, offset: usize) {
        if offset >= self.bits.len() {
            self.bits.resize(offset + 1, false);
        }
        self.bits[offset] = true;
    }

    /// Returns true if `offset` is touched. Out-of-range offsets are not.
    #[inline]
    pub fn is_touched(&self, offset: usize) -> bool {
        self.bits.get(offset).copied().unwrap_or(false)
    }

    /// Returns true if any of `offsets` is touched.
    pub fn any(&self, offsets: impl IntoIterator<Item = usize>) -> bool {
        offsets.into_iter().any(|o| self.is_touched(o))
    }

    /// Returns the number of addressable offsets.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns true if no offsets are addressable.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}
