//! Column default evaluation.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{TableError, TableResult};
use crate::schema::{ColumnDefault, ColumnInfo};
use crate::types::{Datum, FieldType, TypeCode};

const MICROS_PER_DAY: i64 = 86_400 * 1_000_000;

/// Produces the values written for columns the caller did not supply.
pub trait DefaultEvaluator: Send + Sync {
    /// Returns the default of `col`.
    fn default_value(&self, col: &ColumnInfo) -> TableResult<Datum>;

    /// Returns the current time as a value of type `ft`.
    fn current_timestamp(&self, ft: &FieldType) -> TableResult<Datum>;
}

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Evaluates defaults from column metadata.
///
/// A column without a declared default reads as NULL if nullable and as its
/// type's zero value otherwise.
#[derive(Clone)]
pub struct MetaDefaults {
    clock: Clock,
}

impl MetaDefaults {
    /// Uses the system clock.
    pub fn new() -> Self {
        Self::with_clock(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_micros() as i64)
                .unwrap_or(0)
        })
    }

    /// Uses `clock`, which returns microseconds since the Unix epoch.
    pub fn with_clock(clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
        }
    }
}

impl Default for MetaDefaults {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetaDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaDefaults").finish_non_exhaustive()
    }
}

fn zero_value(ft: &FieldType) -> Datum {
    match ft.tp {
        tp if tp.is_integer() && ft.is_unsigned() => Datum::Uint(0),
        tp if tp.is_integer() => Datum::Int(0),
        TypeCode::Float | TypeCode::Double => Datum::Float(0.0),
        TypeCode::NewDecimal => Datum::Decimal {
            value: 0,
            scale: ft.decimal,
        },
        TypeCode::Duration => Datum::Duration(0),
        tp if tp.is_time() => Datum::Time(0),
        _ => Datum::Bytes(Vec::new()),
    }
}

/// Truncates `us` to `fsp` fractional-second digits.
fn truncate_micros(us: i64, fsp: u8) -> i64 {
    let fsp = u32::from(fsp.min(6));
    let unit = 10i64.pow(6 - fsp);
    us - us.rem_euclid(unit)
}

impl DefaultEvaluator for MetaDefaults {
    fn default_value(&self, col: &ColumnInfo) -> TableResult<Datum> {
        match &col.default_value {
            None if col.field_type.is_not_null() => Ok(zero_value(&col.field_type)),
            None => Ok(Datum::Null),
            Some(ColumnDefault::CurrentTimestamp) => self
                .current_timestamp(&col.field_type)
                .map_err(|e| TableError::DefaultValue {
                    column: col.name.clone(),
                    reason: e.to_string(),
                }),
            Some(ColumnDefault::Value(value)) => col
                .field_type
                .unflatten(value.clone())
                .map_err(|e| TableError::DefaultValue {
                    column: col.name.clone(),
                    reason: e.to_string(),
                }),
        }
    }

    fn current_timestamp(&self, ft: &FieldType) -> TableResult<Datum> {
        let now = (self.clock)();
        match ft.tp {
            TypeCode::Date => Ok(Datum::Time(now - now.rem_euclid(MICROS_PER_DAY))),
            TypeCode::Datetime | TypeCode::Timestamp => {
                Ok(Datum::Time(truncate_micros(now, ft.decimal)))
            }
            tp => Err(TableError::codec(format!(
                "current timestamp is not a {tp:?} value"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldFlags;

    const NOW: i64 = 1_700_000_123_456_789;

    fn defaults() -> MetaDefaults {
        MetaDefaults::with_clock(|| NOW)
    }

    #[test]
    fn test_missing_default() {
        let nullable = ColumnInfo::new(1, "a", 0, FieldType::long_long());
        assert_eq!(defaults().default_value(&nullable).unwrap(), Datum::Null);

        let not_null = ColumnInfo::new(
            2,
            "b",
            1,
            FieldType::varchar().with_flags(FieldFlags::NOT_NULL),
        );
        assert_eq!(defaults().default_value(&not_null).unwrap(), Datum::from(""));
    }

    #[test]
    fn test_constant_default() {
        let col = ColumnInfo::new(
            1,
            "n",
            0,
            FieldType::long_long().with_flags(FieldFlags::UNSIGNED),
        )
        .with_default(ColumnDefault::Value(Datum::Int(5)));
        assert_eq!(defaults().default_value(&col).unwrap(), Datum::Uint(5));

        let bad = ColumnInfo::new(2, "s", 1, FieldType::varchar())
            .with_default(ColumnDefault::Value(Datum::Int(5)));
        assert!(matches!(
            defaults().default_value(&bad),
            Err(TableError::DefaultValue { .. })
        ));
    }

    #[test]
    fn test_current_timestamp() {
        let ts = FieldType::new(TypeCode::Timestamp);
        assert_eq!(
            defaults().current_timestamp(&ts).unwrap(),
            Datum::Time(1_700_000_123_000_000)
        );
        let ts3 = FieldType::new(TypeCode::Timestamp).with_decimal(3);
        assert_eq!(
            defaults().current_timestamp(&ts3).unwrap(),
            Datum::Time(1_700_000_123_456_000)
        );
        let date = FieldType::new(TypeCode::Date);
        assert_eq!(
            defaults().current_timestamp(&date).unwrap(),
            Datum::Time(1_699_920_000_000_000)
        );
        assert!(defaults()
            .current_timestamp(&FieldType::long_long())
            .is_err());
    }

    #[test]
    fn test_current_timestamp_default() {
        let col = ColumnInfo::new(1, "ts", 0, FieldType::new(TypeCode::Datetime))
            .with_default(ColumnDefault::CurrentTimestamp);
        assert_eq!(
            defaults().default_value(&col).unwrap(),
            Datum::Time(1_700_000_123_000_000)
        );
    }
}
