//! Record store integration tests.
//!
//! These tests drive `Table` operations end to end against the in-memory
//! store and check both the rows and the raw index keys they leave behind.

mod common;

use common::{count_keys, factory, open, session, storage, table_t_meta, table_t_with};
use rowkv_common::KvConfig;
use rowkv_kv::MemoryStorage;
use rowkv_table::schema::{ColumnDefault, ColumnInfo, SchemaState};
use rowkv_table::types::{Datum, FieldType};
use rowkv_table::{TableContext, TableError, TouchedColumns};

fn row(id: i64, name: &str) -> Vec<Datum> {
    vec![Datum::Int(id), Datum::from(name)]
}

/// Insert, duplicate, update, remove and scan on table `T`.
#[test]
fn test_example_scenario() {
    let storage = storage();
    let factory = factory();
    let t = open(&factory, table_t_meta());
    let name_idx = &t.indices()[0];
    let mut s = session(&storage);

    assert_eq!(t.add_record(&mut s, &row(1, "a")).unwrap(), 1);

    let err = t.add_record(&mut s, &row(2, "a")).unwrap_err();
    assert!(err.is_duplicate());
    assert_eq!(err.to_string(), "Duplicate entry 'a' for key 'name'");
    assert!(matches!(
        t.row(&mut s, 2),
        Err(TableError::RowNotFound { handle: 2, .. })
    ));

    let mut touched = TouchedColumns::from_offsets(2, [1]);
    t.update_record(&mut s, 1, &row(1, "a"), &row(1, "b"), &mut touched)
        .unwrap();
    assert_eq!(t.row(&mut s, 1).unwrap(), row(1, "b"));
    assert_eq!(
        name_idx.exist(s.txn(), &[Datum::from("a")], 1).unwrap(),
        (false, None)
    );
    assert_eq!(
        name_idx.exist(s.txn(), &[Datum::from("b")], 1).unwrap(),
        (true, Some(1))
    );

    t.remove_record(&mut s, 1, &row(1, "b")).unwrap();
    assert!(matches!(
        t.row(&mut s, 1),
        Err(TableError::RowNotFound { .. })
    ));
    assert_eq!(
        name_idx.exist(s.txn(), &[Datum::from("b")], 1).unwrap(),
        (false, None)
    );

    let mut visited = 0;
    t.iter_records(&mut s, t.record_prefix(), t.cols(), |_, _, _| {
        visited += 1;
        Ok(true)
    })
    .unwrap();
    assert_eq!(visited, 0);

    s.commit().unwrap();
    assert_eq!(count_keys(&storage, t.record_prefix()), 0);
    assert_eq!(count_keys(&storage, t.index_prefix()), 0);
}

/// Rows come back in ascending handle order, each exactly once.
#[test]
fn test_iterate_ascending() {
    let storage = storage();
    let factory = factory();
    let t = open(&factory, table_t_meta());

    let mut s = session(&storage);
    for (id, name) in [(5, "e"), (-2, "z"), (3, "c")] {
        t.add_record(&mut s, &row(id, name)).unwrap();
    }
    s.commit().unwrap();

    let mut s = session(&storage);
    t.add_record(&mut s, &row(4, "d")).unwrap();

    let mut seen = Vec::new();
    t.iter_records(&mut s, t.record_prefix(), t.cols(), |h, data, cols| {
        assert_eq!(data.len(), cols.len());
        assert_eq!(data[0], Datum::Int(h));
        seen.push(h);
        Ok(true)
    })
    .unwrap();
    assert_eq!(seen, vec![-2, 3, 4, 5]);

    let mut from_first = Vec::new();
    t.iter_records(&mut s, &t.first_key(), t.cols(), |h, _, _| {
        from_first.push(h);
        Ok(true)
    })
    .unwrap();
    assert_eq!(from_first, vec![3, 4, 5]);
}

/// A column or index still being added is written; a dropping one is not.
#[test]
fn test_write_only_elements_are_maintained() {
    let storage = storage();
    let factory = factory();
    let mut meta = table_t_with(SchemaState::WriteOnly, SchemaState::WriteOnly);
    meta.columns[2].default_value = Some(ColumnDefault::Value(Datum::Int(18)));
    let adding = open(&factory, meta.clone());

    // Readers of the old schema only see the public columns.
    assert_eq!(adding.cols().len(), 2);
    assert!(adding.find_index_by_col_name("age").is_none());

    let mut s = session(&storage);
    adding
        .add_record(&mut s, &[Datum::Int(1), Datum::from("a"), Datum::Int(18)])
        .unwrap();
    assert_eq!(adding.row(&mut s, 1).unwrap(), row(1, "a"));

    let age_idx = &adding.indices()[1];
    assert_eq!(
        age_idx.exist(s.txn(), &[Datum::Int(18)], 1).unwrap(),
        (true, Some(1))
    );

    meta.columns[2].state = SchemaState::Public;
    meta.indices[1].state = SchemaState::Public;
    let public = open(&factory, meta);
    assert_eq!(
        public.row(&mut s, 1).unwrap(),
        vec![Datum::Int(1), Datum::from("a"), Datum::Int(18)]
    );
    assert!(public.find_index_by_col_name("AGE").is_some());
}

#[test]
fn test_delete_only_elements_are_skipped_on_write() {
    let storage = storage();
    let factory = factory();
    let dropping = open(
        &factory,
        table_t_with(SchemaState::DeleteOnly, SchemaState::DeleteOnly),
    );
    assert_eq!(dropping.writable_cols().len(), 2);
    assert_eq!(dropping.writable_indices().count(), 1);

    let mut s = session(&storage);
    dropping
        .add_record(&mut s, &[Datum::Int(1), Datum::from("a"), Datum::Int(9)])
        .unwrap();
    let age_idx = &dropping.indices()[1];
    assert_eq!(
        age_idx.exist(s.txn(), &[Datum::Int(9)], 1).unwrap(),
        (false, None)
    );

    // The entry was never written, and the index is not public.
    dropping
        .remove_record(&mut s, 1, &[Datum::Int(1), Datum::from("a"), Datum::Int(9)])
        .unwrap();
}

/// Removal still clears entries of indices that are being dropped.
#[test]
fn test_delete_only_index_is_cleared_on_remove() {
    let storage = storage();
    let factory = factory();
    let public = open(&factory, table_t_with(SchemaState::Public, SchemaState::Public));
    let dropping = open(
        &factory,
        table_t_with(SchemaState::Public, SchemaState::DeleteOnly),
    );
    let full = [Datum::Int(1), Datum::from("a"), Datum::Int(9)];

    let mut s = session(&storage);
    public.add_record(&mut s, &full).unwrap();
    s.commit().unwrap();
    let age_prefix = public.indices()[1].prefix().clone();
    assert_eq!(count_keys(&storage, &age_prefix), 1);

    let mut s = session(&storage);
    dropping.remove_record(&mut s, 1, &full).unwrap();
    s.commit().unwrap();
    assert_eq!(count_keys(&storage, &age_prefix), 0);
    assert_eq!(count_keys(&storage, public.index_prefix()), 0);
}

/// A stale snapshot of a public index entry is an error on removal.
#[test]
fn test_remove_with_missing_public_entry_fails() {
    let storage = storage();
    let factory = factory();
    let t = open(&factory, table_t_meta());
    let mut s = session(&storage);
    t.add_record(&mut s, &row(1, "a")).unwrap();

    let err = t.remove_record(&mut s, 1, &row(1, "zzz")).unwrap_err();
    assert!(err.is_not_exist());
    // Nothing was flushed.
    assert_eq!(t.row(&mut s, 1).unwrap(), row(1, "a"));
}

#[test]
fn test_truncate_and_seek() {
    let storage = storage();
    let factory = factory();
    let t = open(&factory, table_t_meta());
    let other = open(
        &factory,
        rowkv_table::schema::TableInfo::new(101, "other")
            .with_column(ColumnInfo::new(1, "v", 0, FieldType::long_long())),
    );

    let mut s = session(&storage);
    for id in [10, 20, 30] {
        t.add_record(&mut s, &row(id, &format!("n{id}"))).unwrap();
    }
    other.add_record(&mut s, &[Datum::Int(1)]).unwrap();

    assert_eq!(t.seek(&mut s, i64::MIN).unwrap(), Some(10));
    assert_eq!(t.seek(&mut s, 11).unwrap(), Some(20));
    assert_eq!(t.seek(&mut s, 30).unwrap(), Some(30));
    assert_eq!(t.seek(&mut s, 31).unwrap(), None);

    t.truncate(&mut s).unwrap();
    assert_eq!(t.seek(&mut s, i64::MIN).unwrap(), None);
    s.commit().unwrap();

    assert_eq!(count_keys(&storage, t.record_prefix()), 0);
    assert_eq!(count_keys(&storage, t.index_prefix()), 0);
    assert_eq!(count_keys(&storage, other.record_prefix()), 1);
}

/// Untouched columns keep their old values and untouched indices are left
/// alone.
#[test]
fn test_update_keeps_untouched() {
    let storage = storage();
    let factory = factory();
    let t = open(&factory, table_t_with(SchemaState::Public, SchemaState::Public));
    let old = [Datum::Int(1), Datum::from("a"), Datum::Int(30)];
    let mut s = session(&storage);
    t.add_record(&mut s, &old).unwrap();

    let new = [Datum::Int(1), Datum::from("ignored"), Datum::Int(31)];
    let mut touched = TouchedColumns::from_offsets(3, [2]);
    t.update_record(&mut s, 1, &old, &new, &mut touched).unwrap();

    assert_eq!(
        t.row(&mut s, 1).unwrap(),
        vec![Datum::Int(1), Datum::from("a"), Datum::Int(31)]
    );
    let name_idx = &t.indices()[0];
    assert_eq!(
        name_idx.exist(s.txn(), &[Datum::from("a")], 1).unwrap(),
        (true, Some(1))
    );
    let age_idx = &t.indices()[1];
    assert_eq!(age_idx.exist(s.txn(), &[Datum::Int(30)], 1).unwrap(), (false, None));
    assert_eq!(
        age_idx.exist(s.txn(), &[Datum::Int(31)], 1).unwrap(),
        (true, Some(1))
    );
}

/// An update that moves a unique value onto another row's value fails and
/// leaves both rows intact.
#[test]
fn test_update_into_duplicate() {
    let storage = storage();
    let factory = factory();
    let t = open(&factory, table_t_meta());
    let mut s = session(&storage);
    t.add_record(&mut s, &row(1, "a")).unwrap();
    t.add_record(&mut s, &row(2, "b")).unwrap();
    s.commit().unwrap();

    let mut s = session(&storage);
    let mut touched = TouchedColumns::from_offsets(2, [1]);
    let err = t
        .update_record(&mut s, 2, &row(2, "b"), &row(2, "a"), &mut touched)
        .unwrap_err();
    assert_eq!(err.to_string(), "Duplicate entry 'a' for key 'name'");
    assert_eq!(t.row(&mut s, 2).unwrap(), row(2, "b"));

    let name_idx = &t.indices()[0];
    assert_eq!(
        name_idx.exist(s.txn(), &[Datum::from("b")], 2).unwrap(),
        (true, Some(2))
    );
}

/// NULLs never collide in a unique index.
#[test]
fn test_unique_index_allows_many_nulls() {
    let storage = storage();
    let factory = factory();
    let t = open(&factory, table_t_meta());
    let mut s = session(&storage);
    t.add_record(&mut s, &[Datum::Int(1), Datum::Null]).unwrap();
    t.add_record(&mut s, &[Datum::Int(2), Datum::Null]).unwrap();
    s.commit().unwrap();

    let mut s = session(&storage);
    let entries: Vec<_> = t.indices()[0]
        .seek_first(&*s.txn())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        entries,
        vec![(vec![Datum::Null], 1), (vec![Datum::Null], 2)]
    );
}

#[test]
fn test_default_filled_for_non_public_null_on_update() {
    let storage = storage();
    let factory = factory();
    let mut meta = table_t_with(
        SchemaState::WriteReorganization,
        SchemaState::WriteReorganization,
    );
    meta.columns[2].default_value = Some(ColumnDefault::Value(Datum::Int(7)));
    let t = open(&factory, meta.clone());

    let mut s = session(&storage);
    t.add_record(&mut s, &[Datum::Int(1), Datum::from("a"), Datum::Null])
        .unwrap();
    let mut touched = TouchedColumns::from_offsets(3, [1, 2]);
    t.update_record(
        &mut s,
        1,
        &[Datum::Int(1), Datum::from("a"), Datum::Int(7)],
        &[Datum::Int(1), Datum::from("b"), Datum::Null],
        &mut touched,
    )
    .unwrap();

    meta.columns[2].state = SchemaState::Public;
    let public = open(&factory, meta);
    assert_eq!(
        public.row(&mut s, 1).unwrap(),
        vec![Datum::Int(1), Datum::from("b"), Datum::Int(7)]
    );
}

/// A row rejected by the store takes its index entries down with it, on
/// insert and on update alike.
#[test]
fn test_rejected_row_leaves_no_index_entries() {
    common::init_tracing();
    let storage = MemoryStorage::new(KvConfig {
        max_value_size: 64,
        ..KvConfig::default()
    });
    let factory = factory();
    let t = open(&factory, table_t_meta());
    let long = "x".repeat(100);

    let mut s = session(&storage);
    let err = t.add_record(&mut s, &row(1, &long)).unwrap_err();
    assert!(err.to_string().contains("exceeds maximum"));
    t.add_record(&mut s, &row(2, "a")).unwrap();

    let mut touched = TouchedColumns::from_offsets(2, [1]);
    t.update_record(&mut s, 2, &row(2, "a"), &row(2, &long), &mut touched)
        .unwrap_err();
    let name_idx = &t.indices()[0];
    assert_eq!(
        name_idx.exist(s.txn(), &[Datum::from("a")], 2).unwrap(),
        (true, Some(2))
    );
    s.commit().unwrap();

    assert_eq!(count_keys(&storage, t.record_prefix()), 1);
    assert_eq!(count_keys(&storage, t.index_prefix()), 1);
}
