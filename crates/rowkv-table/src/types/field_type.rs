//! Column field types.

use serde::{Deserialize, Serialize};

use super::Datum;
use crate::error::{TableError, TableResult};

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    /// 8-bit integer.
    Tiny,
    /// 16-bit integer.
    Short,
    /// 32-bit integer.
    Long,
    /// 64-bit integer.
    LongLong,
    /// Single precision float.
    Float,
    /// Double precision float.
    Double,
    /// Fixed-point decimal.
    NewDecimal,
    /// Variable-length string.
    Varchar,
    /// Fixed-length string.
    String,
    /// Binary large object.
    Blob,
    /// Calendar date.
    Date,
    /// Date and time.
    Datetime,
    /// Timestamp.
    Timestamp,
    /// Time span.
    Duration,
}

impl TypeCode {
    /// Returns true for integer types.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            TypeCode::Tiny | TypeCode::Short | TypeCode::Long | TypeCode::LongLong
        )
    }

    /// Returns true for string and blob types.
    pub fn is_string(self) -> bool {
        matches!(self, TypeCode::Varchar | TypeCode::String | TypeCode::Blob)
    }

    /// Returns true for date and time types.
    pub fn is_time(self) -> bool {
        matches!(
            self,
            TypeCode::Date | TypeCode::Datetime | TypeCode::Timestamp
        )
    }
}

bitflags::bitflags! {
    /// Column attribute flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct FieldFlags: u32 {
        /// Column is declared NOT NULL.
        const NOT_NULL = 0b0000_0001;
        /// Column is part of the primary key.
        const PRI_KEY = 0b0000_0010;
        /// Integer column is unsigned.
        const UNSIGNED = 0b0010_0000;
        /// Column is `ON UPDATE CURRENT_TIMESTAMP`.
        const ON_UPDATE_NOW = 0b0010_0000_0000_0000;
    }
}

/// The declared type of a column.
///
/// # Example
///
/// ```rust
/// use rowkv_table::types::{FieldFlags, FieldType, TypeCode};
///
/// let ft = FieldType::new(TypeCode::LongLong).with_flags(FieldFlags::UNSIGNED);
/// assert!(ft.is_unsigned());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldType {
    /// Storage class.
    pub tp: TypeCode,
    /// Attribute flags.
    #[serde(default)]
    pub flags: FieldFlags,
    /// Character set of string columns; empty for other types.
    #[serde(default)]
    pub charset: String,
    /// Fractional digits (decimal scale or fractional-second precision).
    #[serde(default)]
    pub decimal: u8,
}

impl FieldType {
    /// Creates a field type with no flags and no charset.
    pub fn new(tp: TypeCode) -> Self {
        Self {
            tp,
            flags: FieldFlags::empty(),
            charset: String::new(),
            decimal: 0,
        }
    }

    /// A signed 64-bit integer type.
    pub fn long_long() -> Self {
        Self::new(TypeCode::LongLong)
    }

    /// A `varchar` in the `utf8mb4` charset.
    pub fn varchar() -> Self {
        Self::new(TypeCode::Varchar).with_charset("utf8mb4")
    }

    /// Adds flags.
    #[must_use]
    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Sets the charset.
    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Sets the fractional digits.
    #[must_use]
    pub fn with_decimal(mut self, decimal: u8) -> Self {
        self.decimal = decimal;
        self
    }

    /// Returns true if the column is NOT NULL.
    #[inline]
    pub fn is_not_null(&self) -> bool {
        self.flags.contains(FieldFlags::NOT_NULL)
    }

    /// Returns true if the column is unsigned.
    #[inline]
    pub fn is_unsigned(&self) -> bool {
        self.flags.contains(FieldFlags::UNSIGNED)
    }

    /// Returns true if the column is part of the primary key.
    #[inline]
    pub fn is_pri_key(&self) -> bool {
        self.flags.contains(FieldFlags::PRI_KEY)
    }

    /// Returns true if the column refreshes to the current time on update.
    #[inline]
    pub fn has_on_update_now(&self) -> bool {
        self.flags.contains(FieldFlags::ON_UPDATE_NOW)
    }

    /// Converts a decoded datum to this type's canonical form.
    ///
    /// Stored payloads keep only what is needed to round-trip: an unsigned
    /// column may come back as `Int`, a time column as a plain integer. NULL
    /// passes through.
    pub fn unflatten(&self, datum: Datum) -> TableResult<Datum> {
        if datum.is_null() {
            return Ok(datum);
        }

        let converted = match (self.tp, datum) {
            (tp, Datum::Int(i)) if tp.is_integer() && self.is_unsigned() => Datum::Uint(i as u64),
            (tp, Datum::Uint(u)) if tp.is_integer() && !self.is_unsigned() => Datum::Int(u as i64),
            (tp, d @ (Datum::Int(_) | Datum::Uint(_))) if tp.is_integer() => d,
            (TypeCode::Float, Datum::Float(f)) => Datum::Float(f64::from(f as f32)),
            (TypeCode::Double, d @ Datum::Float(_)) => d,
            (TypeCode::NewDecimal, d @ Datum::Decimal { .. }) => d,
            (tp, d @ Datum::Bytes(_)) if tp.is_string() => d,
            (tp, d @ Datum::Time(_)) if tp.is_time() => d,
            (tp, Datum::Int(i)) if tp.is_time() => Datum::Time(i),
            (TypeCode::Duration, d @ Datum::Duration(_)) => d,
            (TypeCode::Duration, Datum::Int(i)) => Datum::Duration(i),
            (tp, d) => {
                return Err(TableError::codec(format!(
                    "cannot read {d:?} as a {tp:?} column"
                )))
            }
        };
        Ok(converted)
    }
}
