//! Building tables from metadata.
//!
//! Whoever assembles the system picks a [`TableFactory`] and hands it to the
//! components that need to open tables; there is no process-wide registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rowkv_common::{AllocConfig, TableConfig, TableId};
use rowkv_kv::{Allocator, MemoryAllocator};
use tracing::debug;

use crate::defaults::{DefaultEvaluator, MetaDefaults};
use crate::error::TableResult;
use crate::schema::TableInfo;
use crate::table::Table;

/// Builds a [`Table`] for a schema version.
pub trait TableFactory: Send + Sync {
    /// Builds the table described by `meta`.
    fn table_from_meta(&self, meta: Arc<TableInfo>) -> TableResult<Table>;
}

/// A factory backed by in-memory allocators.
///
/// Each table id gets one allocator for the life of the factory, so a table
/// rebuilt for a new schema version keeps issuing handles where the old one
/// stopped.
pub struct MetaTableFactory {
    alloc_config: AllocConfig,
    table_config: TableConfig,
    defaults: Arc<dyn DefaultEvaluator>,
    allocators: Mutex<HashMap<TableId, Arc<dyn Allocator>>>,
}

impl MetaTableFactory {
    /// Creates a factory using the system clock for defaults.
    pub fn new(alloc_config: AllocConfig, table_config: TableConfig) -> Self {
        Self::with_defaults(alloc_config, table_config, Arc::new(MetaDefaults::new()))
    }

    /// Creates a factory with a custom default evaluator.
    pub fn with_defaults(
        alloc_config: AllocConfig,
        table_config: TableConfig,
        defaults: Arc<dyn DefaultEvaluator>,
    ) -> Self {
        Self {
            alloc_config,
            table_config,
            defaults,
            allocators: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the allocator of `table_id`, creating it on first use.
    pub fn allocator(&self, table_id: TableId) -> Arc<dyn Allocator> {
        self.allocators
            .lock()
            .entry(table_id)
            .or_insert_with(|| {
                debug!(%table_id, step = self.alloc_config.step, "creating allocator");
                let alloc: Arc<dyn Allocator> = Arc::new(MemoryAllocator::new(&self.alloc_config));
                alloc
            })
            .clone()
    }
}

impl TableFactory for MetaTableFactory {
    fn table_from_meta(&self, meta: Arc<TableInfo>) -> TableResult<Table> {
        let alloc = self.allocator(meta.id);
        Table::from_meta(meta, alloc, self.defaults.clone(), &self.table_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnInfo, SchemaState};
    use crate::types::FieldType;

    fn meta() -> Arc<TableInfo> {
        Arc::new(TableInfo::new(1, "t").with_column(ColumnInfo::new(1, "a", 0, FieldType::long_long())))
    }

    #[test]
    fn test_allocator_survives_rebuild() {
        let factory = MetaTableFactory::new(AllocConfig { step: 5 }, TableConfig::default());
        let v1 = factory.table_from_meta(meta()).unwrap();
        assert_eq!(v1.alloc_auto_id().unwrap(), 1);

        let v2 = factory.table_from_meta(meta()).unwrap();
        assert_eq!(v2.alloc_auto_id().unwrap(), 2);
    }

    #[test]
    fn test_rejects_none_state() {
        let factory = MetaTableFactory::new(AllocConfig::default(), TableConfig::default());
        let bad = Arc::new((*meta()).clone().with_state(SchemaState::None));
        assert!(factory.table_from_meta(bad).is_err());
    }
}
