//! Column values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single column value.
///
/// Strings are stored as [`Datum::Bytes`]; whether the bytes must be UTF-8
/// is a property of the column's charset, not of the value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Datum {
    /// SQL NULL.
    #[default]
    Null,
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    Uint(u64),
    /// Floating point.
    Float(f64),
    /// Byte string (also used for text).
    Bytes(Vec<u8>),
    /// Fixed-point decimal stored as a scaled integer.
    Decimal {
        /// Unscaled value.
        value: i128,
        /// Number of fractional digits.
        scale: u8,
    },
    /// Point in time, microseconds since the Unix epoch.
    Time(i64),
    /// Signed time span in nanoseconds.
    Duration(i64),
}

impl Datum {
    /// Creates a text value.
    pub fn string(s: impl Into<String>) -> Self {
        Datum::Bytes(s.into().into_bytes())
    }

    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Returns the value as an `i64`, reinterpreting unsigned values.
    ///
    /// Used to derive a row handle from the handle column.
    pub fn as_handle(&self) -> Option<i64> {
        match self {
            Datum::Int(i) => Some(*i),
            Datum::Uint(u) => Some(*u as i64),
            _ => None,
        }
    }

    /// Returns the bytes of a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Datum::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Renders the value the way key conflicts report it. NULL renders as
    /// `NULL`.
    pub fn to_display_string(&self) -> String {
        match self {
            Datum::Null => "NULL".to_string(),
            Datum::Int(i) => i.to_string(),
            Datum::Uint(u) => u.to_string(),
            Datum::Float(f) => f.to_string(),
            Datum::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Datum::Decimal { value, scale } => format_decimal(*value, *scale),
            Datum::Time(us) => format_time(*us),
            Datum::Duration(ns) => format_duration(*ns),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Int(v)
    }
}

impl From<u64> for Datum {
    fn from(v: u64) -> Self {
        Datum::Uint(v)
    }
}

impl From<f64> for Datum {
    fn from(v: f64) -> Self {
        Datum::Float(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Datum::string(v)
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Self {
        Datum::string(v)
    }
}

impl From<Vec<u8>> for Datum {
    fn from(v: Vec<u8>) -> Self {
        Datum::Bytes(v)
    }
}

impl<T: Into<Datum>> From<Option<T>> for Datum {
    fn from(v: Option<T>) -> Self {
        v.map_or(Datum::Null, Into::into)
    }
}

fn format_decimal(value: i128, scale: u8) -> String {
    if scale == 0 {
        return value.to_string();
    }
    let divisor = 10i128.pow(u32::from(scale));
    let int_part = (value / divisor).abs();
    let frac_part = (value % divisor).abs();
    let sign = if value < 0 { "-" } else { "" };
    format!(
        "{sign}{int_part}.{frac_part:0>width$}",
        width = scale as usize
    )
}

const MICROS_PER_SEC: i64 = 1_000_000;
const SECS_PER_DAY: i64 = 86_400;

/// Formats microseconds since the epoch as `YYYY-MM-DD HH:MM:SS[.ffffff]`.
fn format_time(us: i64) -> String {
    let secs = us.div_euclid(MICROS_PER_SEC);
    let micros = us.rem_euclid(MICROS_PER_SEC);
    let days = secs.div_euclid(SECS_PER_DAY);
    let sod = secs.rem_euclid(SECS_PER_DAY);
    let (y, m, d) = civil_from_days(days);
    let mut out = format!(
        "{y:04}-{m:02}-{d:02} {:02}:{:02}:{:02}",
        sod / 3600,
        (sod % 3600) / 60,
        sod % 60
    );
    if micros != 0 {
        out.push_str(&format!(".{micros:06}"));
    }
    out
}

/// Converts days since 1970-01-01 to a proleptic Gregorian date.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let y = yoe + era * 400 + i64::from(m <= 2);
    (y, m, d)
}

/// Formats nanoseconds as `[-]HH:MM:SS[.fffffffff]`.
fn format_duration(ns: i64) -> String {
    let sign = if ns < 0 { "-" } else { "" };
    let abs = ns.unsigned_abs();
    let secs = abs / 1_000_000_000;
    let frac = abs % 1_000_000_000;
    let mut out = format!(
        "{sign}{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    );
    if frac != 0 {
        out.push_str(&format!(".{frac:09}"));
    }
    out
}
