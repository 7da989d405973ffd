//! Configuration for rowkv.
//!
//! This module provides the configuration structures for the store, the
//! record layer, and the handle allocator.

mod store;

pub use store::{AllocConfig, ConfigError, KvConfig, StoreConfig, TableConfig};
