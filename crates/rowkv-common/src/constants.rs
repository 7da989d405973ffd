//! System-wide constants for rowkv.
//!
//! Key-space markers are part of the on-disk format and must never change
//! once data has been written with them.

// =============================================================================
// Key-Space Markers
// =============================================================================

/// First byte of every table-owned key.
pub const TABLE_PREFIX: &[u8] = b"t";

/// Separator between the table id and the row handle of a record key.
pub const RECORD_PREFIX_SEP: &[u8] = b"_r";

/// Separator between the table id and the index id of an index key.
pub const INDEX_PREFIX_SEP: &[u8] = b"_i";

/// Length of a comparable-encoded `i64` (sign-flipped big-endian).
pub const ENCODED_INT_LEN: usize = 8;

/// Length of a table record prefix: `t` + table id + `_r`.
pub const RECORD_PREFIX_LEN: usize =
    TABLE_PREFIX.len() + ENCODED_INT_LEN + RECORD_PREFIX_SEP.len();

/// Length of a full record key: record prefix + handle.
pub const RECORD_KEY_LEN: usize = RECORD_PREFIX_LEN + ENCODED_INT_LEN;

/// Value stored under non-unique index keys.
///
/// An empty value marks a deletion in the buffering layer, so index entries
/// that carry no payload store this placeholder instead.
pub const NON_UNIQUE_INDEX_VALUE: &[u8] = b"0";

// =============================================================================
// Key and Value Limits
// =============================================================================

/// Default maximum key size in bytes (16 KB).
pub const DEFAULT_MAX_KEY_SIZE: usize = 16 * 1024;

/// Default maximum value size in bytes (1 MB).
pub const DEFAULT_MAX_VALUE_SIZE: usize = 1024 * 1024;

// =============================================================================
// Allocator Constants
// =============================================================================

/// Default number of handles an allocator reserves per batch.
pub const DEFAULT_ALLOC_STEP: i64 = 1000;

// =============================================================================
// Charsets
// =============================================================================

/// Charsets whose content must be well-formed UTF-8 before it is stored.
pub const DEFAULT_UTF8_CHARSETS: &[&str] = &["utf8", "utf8mb4"];

/// Index name reported for handle-embedded primary key conflicts.
pub const PRIMARY_KEY_NAME: &str = "PRIMARY";
