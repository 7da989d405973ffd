//! Secondary and primary index maintenance.
//!
//! One [`Index`] type serves every index shape; the unique flag decides the
//! key layout:
//!
//! | shape | key | value |
//! |---|---|---|
//! | unique, no NULL values | `prefix ++ values` | handle (8-byte BE) |
//! | otherwise | `prefix ++ values ++ handle` | `"0"` |
//!
//! NULLs never collide, so a unique index stores NULL-bearing entries the
//! non-unique way.

use std::sync::Arc;

use rowkv_common::constants::NON_UNIQUE_INDEX_VALUE;
use rowkv_common::{Key, TableId, Value};
use rowkv_kv::{KeyConflict, KvIterator, Options, PresumeKeyNotExists, Retriever, RetrieverMutator};
use tracing::trace;

use crate::codec::datum::{decode_one, encode_key};
use crate::codec::key::index_key_prefix;
use crate::error::{TableError, TableResult};
use crate::schema::IndexInfo;
use crate::types::Datum;

/// An index of a [`Table`](crate::Table).
#[derive(Debug, Clone)]
pub struct Index {
    table_id: TableId,
    info: Arc<IndexInfo>,
    prefix: Key,
}

impl Index {
    /// Creates an index over `info` for table `table_id`.
    pub fn new(table_id: TableId, info: IndexInfo) -> Self {
        let prefix = index_key_prefix(table_id, info.id);
        Self {
            table_id,
            info: Arc::new(info),
            prefix,
        }
    }

    /// Returns the metadata.
    #[inline]
    pub fn meta(&self) -> &IndexInfo {
        &self.info
    }

    /// Returns the table the index belongs to.
    #[inline]
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Returns the prefix shared by all entries of this index.
    #[inline]
    pub fn prefix(&self) -> &Key {
        &self.prefix
    }

    /// Returns true if reads may use the index.
    #[inline]
    pub fn is_public(&self) -> bool {
        self.info.state.is_public()
    }

    /// Returns true if inserts and updates maintain the index.
    #[inline]
    pub fn is_writable(&self) -> bool {
        self.info.state.is_writable()
    }

    /// Returns true if entries must be distinct.
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.info.unique || self.info.primary
    }

    /// Returns the column offsets covered by the index.
    pub fn offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.info.columns.iter().map(|c| c.offset)
    }

    /// Picks the indexed values out of a full row.
    pub fn fetch_values(&self, row: &[Datum]) -> TableResult<Vec<Datum>> {
        self.info
            .columns
            .iter()
            .map(|c| {
                row.get(c.offset).cloned().ok_or(TableError::ColumnOffset {
                    offset: c.offset,
                    len: row.len(),
                })
            })
            .collect()
    }

    /// Renders values the way duplicate-key errors report them.
    pub fn entry_string(values: &[Datum]) -> String {
        values
            .iter()
            .map(Datum::to_display_string)
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Returns the conflict reported if `values` are already taken.
    pub fn conflict(&self, values: &[Datum]) -> KeyConflict {
        KeyConflict::new(self.info.name.clone(), Self::entry_string(values))
    }

    /// Builds the entry key for `values` and `handle`.
    ///
    /// The flag is true when the key is distinct, i.e. it does not embed the
    /// handle and the handle is stored as the value.
    pub fn gen_index_key(&self, values: &[Datum], handle: i64) -> (Key, bool) {
        let distinct = self.is_unique() && !values.iter().any(Datum::is_null);

        let mut buf = Vec::with_capacity(self.prefix.len() + values.len() * 9 + 9);
        buf.extend_from_slice(&self.prefix);
        encode_key(&mut buf, values);
        if !distinct {
            encode_key(&mut buf, &[Datum::Int(handle)]);
        }
        (Key::from_vec(buf), distinct)
    }

    /// Writes the entry for `values` and `handle`.
    ///
    /// For a distinct key that is already present, fails with
    /// [`TableError::DuplicateKey`] naming the handle holding it.
    pub fn create<R>(&self, rm: &mut R, values: &[Datum], handle: i64) -> TableResult<()>
    where
        R: RetrieverMutator + ?Sized,
    {
        let (key, distinct) = self.gen_index_key(values, handle);
        trace!(index = %self.info.name, %key, handle, "creating index entry");

        if !distinct {
            return rm
                .set(key, Value::from_bytes(NON_UNIQUE_INDEX_VALUE))
                .map_err(|e| TableError::store("writing index entry", e));
        }

        match rm
            .get(&key)
            .map_err(|e| TableError::store("probing unique index", e))?
        {
            Some(existing) => Err(TableError::DuplicateKey {
                index: self.info.name.clone(),
                entry: Self::entry_string(values),
                existing: Some(decode_handle_value(&existing)?),
            }),
            None => rm
                .set(key, Value::from_vec(handle.to_be_bytes().to_vec()))
                .map_err(|e| TableError::store("writing index entry", e)),
        }
    }

    /// Writes the entry with the presume-key-not-exists directive armed for
    /// unique indices, so a key absent from the snapshot is re-checked at
    /// commit instead of now.
    pub fn create_presumed<R>(&self, rm: &mut R, values: &[Datum], handle: i64) -> TableResult<()>
    where
        R: RetrieverMutator + Options + ?Sized,
    {
        if !self.is_unique() {
            return self.create(rm, values, handle);
        }
        let mut probe = PresumeKeyNotExists::arm(rm, self.conflict(values));
        self.create(&mut *probe, values, handle)
    }

    /// Removes the entry for `values` and `handle`.
    ///
    /// An absent entry is reported as a `NotExist` store error; whether that
    /// matters is the caller's decision.
    pub fn delete<R>(&self, rm: &mut R, values: &[Datum], handle: i64) -> TableResult<()>
    where
        R: RetrieverMutator + ?Sized,
    {
        let (key, _) = self.gen_index_key(values, handle);
        trace!(index = %self.info.name, %key, handle, "deleting index entry");

        let present = rm
            .get(&key)
            .map_err(|e| TableError::store("reading index entry", e))?
            .is_some();
        if !present {
            return Err(TableError::store(
                "deleting index entry",
                rowkv_common::KvError::NotExist { key },
            ));
        }
        rm.delete(key)
            .map_err(|e| TableError::store("deleting index entry", e))
    }

    /// Looks up the entry for `values`.
    ///
    /// Returns whether an entry exists and the handle it points at. For a
    /// non-distinct key that is `handle` itself.
    pub fn exist<R>(&self, rm: &mut R, values: &[Datum], handle: i64) -> TableResult<(bool, Option<i64>)>
    where
        R: RetrieverMutator + ?Sized,
    {
        let (key, distinct) = self.gen_index_key(values, handle);
        let value = rm
            .get(&key)
            .map_err(|e| TableError::store("reading index entry", e))?;
        match value {
            None => Ok((false, None)),
            Some(v) if distinct => Ok((true, Some(decode_handle_value(&v)?))),
            Some(_) => Ok((true, Some(handle))),
        }
    }

    /// Returns an iterator over entries whose values are `>= values`.
    pub fn seek<R>(&self, r: &R, values: &[Datum]) -> TableResult<IndexIterator>
    where
        R: Retriever + ?Sized,
    {
        let mut buf = self.prefix.to_vec();
        encode_key(&mut buf, values);
        let it = r
            .seek(&Key::from_vec(buf))
            .map_err(|e| TableError::store("seeking index", e))?;
        Ok(IndexIterator {
            it,
            prefix: self.prefix.clone(),
            columns: self.info.columns.len(),
        })
    }

    /// Returns an iterator over every entry of the index.
    pub fn seek_first<R>(&self, r: &R) -> TableResult<IndexIterator>
    where
        R: Retriever + ?Sized,
    {
        self.seek(r, &[])
    }
}

fn decode_handle_value(value: &[u8]) -> TableResult<i64> {
    let raw: [u8; 8] = value.try_into().map_err(|_| {
        TableError::codec(format!("invalid index handle value {}", hex::encode(value)))
    })?;
    Ok(i64::from_be_bytes(raw))
}

/// Iterates `(values, handle)` pairs of one index in key order.
///
/// Ends at the first key outside the index.
pub struct IndexIterator {
    it: Box<dyn KvIterator>,
    prefix: Key,
    columns: usize,
}

impl IndexIterator {
    fn decode_current(&self) -> TableResult<(Vec<Datum>, i64)> {
        let mut rest = &self.it.key()[self.prefix.len()..];
        let mut values = Vec::with_capacity(self.columns);
        for _ in 0..self.columns {
            let (datum, after) = decode_one(rest)?;
            values.push(datum);
            rest = after;
        }

        let handle = if rest.is_empty() {
            decode_handle_value(self.it.value())?
        } else {
            match decode_one(rest)? {
                (Datum::Int(h), []) => h,
                _ => {
                    return Err(TableError::codec(format!(
                        "invalid index key {}",
                        self.it.key()
                    )))
                }
            }
        };
        Ok((values, handle))
    }
}

impl Iterator for IndexIterator {
    type Item = TableResult<(Vec<Datum>, i64)>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.it.valid() || !self.it.key().starts_with(&self.prefix) {
            return None;
        }
        let item = self.decode_current();
        if let Err(e) = self.it.next() {
            return Some(Err(TableError::store("advancing index iterator", e)));
        }
        Some(item)
    }
}
