//! Record store: the in-memory source of truth for a job collection.
//!
//! [`RecordStore`] is an immutable snapshot. Every mutation returns a new
//! snapshot that shares all untouched records with its predecessor, so
//! consumers comparing `Arc` pointers can skip unchanged records.
//! [`SharedStore`] holds the current snapshot behind a lock and swaps the
//! root atomically.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::record::{JobField, JobId, JobRecord};

/// Immutable snapshot of a job collection.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Arc<HashMap<JobId, Arc<JobRecord>>>,
    /// Insertion order. Ids never change after a replace.
    order: Arc<Vec<JobId>>,
    /// Column set captured at import/fetch time, used as the default export
    /// header.
    columns: Arc<Vec<String>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from a batch of records.
    ///
    /// A repeated id keeps the position of its first occurrence and the
    /// value of its last one.
    pub fn from_records(records: Vec<JobRecord>) -> Self {
        let mut map: HashMap<JobId, Arc<JobRecord>> = HashMap::with_capacity(records.len());
        let mut order = Vec::with_capacity(records.len());

        for record in records {
            let id = record.id.clone();
            if map.insert(id.clone(), Arc::new(record)).is_some() {
                log::debug!("Duplicate job id '{}' replaced earlier record", id);
            } else {
                order.push(id);
            }
        }

        Self {
            records: Arc::new(map),
            order: Arc::new(order),
            columns: Arc::new(Vec::new()),
        }
    }

    /// Attaches the column set captured at import time.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Arc::new(columns);
        self
    }

    pub fn get(&self, id: &str) -> Option<&Arc<JobRecord>> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<JobRecord>> + '_ {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns true when both snapshots share the same record map.
    pub fn ptr_eq(&self, other: &RecordStore) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }

    /// Returns a snapshot with one field of one record changed.
    ///
    /// Only the targeted record is copied; every other record keeps its
    /// `Arc`. An unknown id, or a value equal to the current one, returns
    /// this snapshot unchanged.
    pub fn update_field(&self, id: &str, field: &JobField, value: Option<String>) -> RecordStore {
        let Some(current) = self.records.get(id) else {
            log::debug!("update_field: no record with id '{}', ignoring", id);
            return self.clone();
        };

        let mut updated = JobRecord::clone(current);
        updated.set_field(field, value);
        if updated == **current {
            return self.clone();
        }

        let mut next = self.clone();
        Arc::make_mut(&mut next.records).insert(updated.id.clone(), Arc::new(updated));
        next
    }
}

/// Shared root reference to the current [`RecordStore`] snapshot.
///
/// Cloning is cheap and yields a handle to the same root. Readers take a
/// snapshot and never observe a partially applied write.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    root: Arc<RwLock<RecordStore>>,
}

impl SharedStore {
    pub fn new(store: RecordStore) -> Self {
        Self {
            root: Arc::new(RwLock::new(store)),
        }
    }

    fn read_root(&self) -> RwLockReadGuard<'_, RecordStore> {
        match self.root.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Record store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_root(&self) -> RwLockWriteGuard<'_, RecordStore> {
        match self.root.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Record store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> RecordStore {
        self.read_root().clone()
    }

    /// Atomically swaps the whole collection.
    pub fn replace(&self, store: RecordStore) {
        let count = store.len();
        *self.write_root() = store;
        log::debug!("Record store replaced with {} records", count);
    }

    pub fn get(&self, id: &str) -> Option<Arc<JobRecord>> {
        self.read_root().get(id).cloned()
    }

    /// Applies [`RecordStore::update_field`] to the current root.
    ///
    /// Returns the record before and after the change, or `None` when the id
    /// is unknown.
    pub fn update_field(
        &self,
        id: &str,
        field: &JobField,
        value: Option<String>,
    ) -> Option<FieldUpdate> {
        let mut root = self.write_root();
        Self::apply(&mut root, id, field, value)
    }

    /// Like [`update_field`](Self::update_field), but only when the stored
    /// record is still `expected`. A record that was rewritten or replaced
    /// since then is left alone and `None` is returned.
    pub fn update_field_if_current(
        &self,
        id: &str,
        field: &JobField,
        value: Option<String>,
        expected: &Arc<JobRecord>,
    ) -> Option<FieldUpdate> {
        let mut root = self.write_root();
        if !Arc::ptr_eq(root.get(id)?, expected) {
            return None;
        }
        Self::apply(&mut root, id, field, value)
    }

    fn apply(
        root: &mut RecordStore,
        id: &str,
        field: &JobField,
        value: Option<String>,
    ) -> Option<FieldUpdate> {
        let previous = root.get(id).cloned()?;
        *root = root.update_field(id, field, value);
        let current = root.get(id).cloned()?;
        Some(FieldUpdate { previous, current })
    }
}

/// A record before and after a [`SharedStore`] field update. Both are the
/// same `Arc` when the value did not change.
#[derive(Debug, Clone)]
pub struct FieldUpdate {
    pub previous: Arc<JobRecord>,
    pub current: Arc<JobRecord>,
}
