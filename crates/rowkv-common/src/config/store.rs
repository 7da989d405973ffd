//! Store configuration structures.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::constants::{
    DEFAULT_ALLOC_STEP, DEFAULT_MAX_KEY_SIZE, DEFAULT_MAX_VALUE_SIZE, DEFAULT_UTF8_CHARSETS,
};

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration text is not valid TOML for this schema.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
///
/// Every section and every field falls back to its default when omitted, so
/// an empty document is a valid configuration.
///
/// # Example
///
/// ```rust
/// use rowkv_common::config::StoreConfig;
///
/// let config = StoreConfig::from_toml_str("[alloc]\nstep = 50\n").unwrap();
/// assert_eq!(config.alloc.step, 50);
/// assert_eq!(config.kv.max_key_size, 16 * 1024);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key-value store limits.
    pub kv: KvConfig,

    /// Record layer behaviour.
    pub table: TableConfig,

    /// Handle allocator settings.
    pub alloc: AllocConfig,
}

impl StoreConfig {
    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Saves the configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Converts the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Creates a configuration suited to tests: small allocator batches so
    /// batch boundaries are crossed quickly.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            kv: KvConfig::default(),
            table: TableConfig::default(),
            alloc: AllocConfig { step: 10 },
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kv.max_key_size == 0 {
            return Err(ConfigError::Invalid(
                "kv.max_key_size must be positive".to_string(),
            ));
        }

        if self.kv.max_value_size == 0 {
            return Err(ConfigError::Invalid(
                "kv.max_value_size must be positive".to_string(),
            ));
        }

        if self.alloc.step <= 0 {
            return Err(ConfigError::Invalid(
                "alloc.step must be positive".to_string(),
            ));
        }

        if self.table.utf8_charsets.iter().any(|c| c.is_empty()) {
            return Err(ConfigError::Invalid(
                "table.utf8_charsets must not contain empty names".to_string(),
            ));
        }

        Ok(())
    }
}

/// Key-value store limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KvConfig {
    /// Maximum key size in bytes.
    /// Default: 16384 (16 KB)
    pub max_key_size: usize,

    /// Maximum value size in bytes.
    /// Default: 1048576 (1 MB)
    pub max_value_size: usize,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            max_key_size: DEFAULT_MAX_KEY_SIZE,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
        }
    }
}

/// Record layer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Charsets whose string content is checked for UTF-8 well-formedness
    /// before a row is written. Compared case-insensitively.
    pub utf8_charsets: Vec<String>,

    /// Whether sessions record row mutations for the change log.
    pub capture_mutations: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            utf8_charsets: DEFAULT_UTF8_CHARSETS
                .iter()
                .map(|c| (*c).to_string())
                .collect(),
            capture_mutations: true,
        }
    }
}

impl TableConfig {
    /// Returns true if `charset` requires UTF-8 validation.
    #[must_use]
    pub fn requires_utf8(&self, charset: &str) -> bool {
        self.utf8_charsets
            .iter()
            .any(|c| c.eq_ignore_ascii_case(charset))
    }
}

/// Handle allocator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocConfig {
    /// Number of handles reserved per batch.
    pub step: i64,
}

impl Default for AllocConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_ALLOC_STEP,
        }
    }
}
