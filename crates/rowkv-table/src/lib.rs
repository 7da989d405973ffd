//! # rowkv-table
//!
//! Table record storage over an ordered transactional key-value store.
//!
//! Rows are stored under `t{table}_r{handle}` and index entries under
//! `t{table}_i{index}{values}`. This crate keeps the two consistent while
//! schema changes are in flight:
//!
//! - **Codec**: datum, row payload and key encodings ([`codec`])
//! - **Schema**: table/column/index metadata and lifecycle states ([`schema`])
//! - **Indices**: entry creation, deletion and duplicate detection ([`Index`])
//! - **Records**: insert, update, remove, point reads, scans ([`Table`])
//! - **Change capture**: per-table mutations published at commit
//!   ([`MutationRecorder`], [`ChangeLogSink`])
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use rowkv_common::{AllocConfig, KvConfig, TableConfig};
//! use rowkv_kv::MemoryStorage;
//! use rowkv_table::schema::{ColumnInfo, IndexColumn, IndexInfo, TableInfo};
//! use rowkv_table::types::{Datum, FieldFlags, FieldType};
//! use rowkv_table::{MetaTableFactory, Session, TableFactory};
//!
//! let meta = TableInfo::new(1, "users")
//!     .with_column(ColumnInfo::new(
//!         1,
//!         "id",
//!         0,
//!         FieldType::long_long().with_flags(FieldFlags::PRI_KEY | FieldFlags::NOT_NULL),
//!     ))
//!     .with_column(ColumnInfo::new(2, "name", 1, FieldType::varchar()))
//!     .with_index(IndexInfo::new(1, "name_idx", vec![IndexColumn::new("name", 1)]).unique())
//!     .with_pk_is_handle(true);
//!
//! let factory = MetaTableFactory::new(AllocConfig::default(), TableConfig::default());
//! let table = factory.table_from_meta(Arc::new(meta)).unwrap();
//!
//! let storage = MemoryStorage::new(KvConfig::default());
//! let mut session = Session::begin(&storage, &TableConfig::default(), None).unwrap();
//! let handle = table
//!     .add_record(&mut session, &[Datum::Int(1), Datum::from("alice")])
//!     .unwrap();
//! assert_eq!(table.row(&mut session, handle).unwrap()[1], Datum::from("alice"));
//! session.commit().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod column;
pub mod defaults;
pub mod error;
pub mod factory;
pub mod index;
pub mod mutation;
pub mod schema;
pub mod session;
pub mod table;
pub mod types;

pub use column::{Column, TouchedColumns};
pub use defaults::{DefaultEvaluator, MetaDefaults};
pub use error::{SchemaElement, TableError, TableResult};
pub use factory::{MetaTableFactory, TableFactory};
pub use index::{Index, IndexIterator};
pub use mutation::{ChangeLogSink, CollectingSink, MutationRecorder, TableMutation};
pub use session::{Session, TableContext};
pub use table::Table;
