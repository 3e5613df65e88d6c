//! In-memory meta and record stores.

use super::{MetaStore, RecordStore};
use crate::error::{Result, RevisionError};
use crate::hooks::{HookRegistry, HostEvent};
use crate::types::{Record, RecordId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Meta store backed by a hash map.
#[derive(Default)]
pub struct MemoryMetaStore {
    entries: RwLock<HashMap<(RecordId, String), Vec<u8>>>,
    writes: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryMetaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set`/`delete` fail (fault injection).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `set`/`delete` calls.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RevisionError::MetaStore("writes are disabled".into()));
        }
        Ok(())
    }
}

impl MetaStore for MemoryMetaStore {
    fn get(&self, record_id: RecordId, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .entries
            .read()
            .get(&(record_id, key.to_string()))
            .cloned())
    }

    fn set(&self, record_id: RecordId, key: &str, blob: Vec<u8>) -> Result<()> {
        self.check_writable()?;
        self.entries.write().insert((record_id, key.to_string()), blob);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, record_id: RecordId, key: &str) -> Result<()> {
        self.check_writable()?;
        self.entries.write().remove(&(record_id, key.to_string()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Record store backed by a hash map.
///
/// When attached to a [`HookRegistry`], every successful `update` dispatches
/// [`HostEvent::RecordUpdated`] with the snapshot taken before the write, the
/// way a form host notifies its plugins.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<RecordId, Record>>,
    hooks: Option<Arc<HookRegistry>>,
    updates: AtomicU64,
    fail_updates: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that notifies `hooks` after updates and deletes.
    pub fn with_hooks(hooks: Arc<HookRegistry>) -> Self {
        Self {
            hooks: Some(hooks),
            ..Default::default()
        }
    }

    /// Insert or replace a record without notifying anyone.
    pub fn insert(&self, record: Record) {
        self.records.write().insert(record.id, record);
    }

    /// Remove a record, dispatching [`HostEvent::RecordDeleted`].
    pub fn remove(&self, id: RecordId) -> Option<Record> {
        let removed = self.records.write().remove(&id);
        if removed.is_some() {
            if let Some(hooks) = &self.hooks {
                hooks.dispatch(&HostEvent::RecordDeleted { record_id: id });
            }
        }
        removed
    }

    /// Make every subsequent `update` fail (fault injection).
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Number of `update` calls, failed ones included.
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::SeqCst)
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, id: RecordId) -> Result<Option<Record>> {
        Ok(self.records.read().get(&id).cloned())
    }

    fn update(&self, id: RecordId, mut record: Record) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);

        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RevisionError::RecordStore(format!(
                "record {} rejected the update",
                id
            )));
        }

        record.id = id;
        let previous = {
            let mut records = self.records.write();
            match records.get_mut(&id) {
                Some(slot) => std::mem::replace(slot, record),
                None => return Err(RevisionError::RecordNotFound(id)),
            }
        };

        // Lock released before handlers run; they read the record back.
        if let Some(hooks) = &self.hooks {
            hooks.dispatch(&HostEvent::RecordUpdated {
                record_id: id,
                previous,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::EventKind;
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_meta_store_roundtrip() {
        let store = MemoryMetaStore::new();
        assert!(store.get(RecordId(1), "k").unwrap().is_none());

        store.set(RecordId(1), "k", b"blob".to_vec()).unwrap();
        assert_eq!(store.get(RecordId(1), "k").unwrap(), Some(b"blob".to_vec()));
        assert!(store.get(RecordId(2), "k").unwrap().is_none());

        store.delete(RecordId(1), "k").unwrap();
        assert!(store.is_empty());
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_meta_store_fault_injection() {
        let store = MemoryMetaStore::new();
        store.set_fail_writes(true);
        let result = store.set(RecordId(1), "k", vec![1]);
        assert!(matches!(result, Err(RevisionError::MetaStore(_))));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_record_store_update_notifies() {
        let hooks = Arc::new(HookRegistry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        hooks.subscribe(EventKind::RecordUpdated, move |event| {
            if let HostEvent::RecordUpdated { previous, .. } = event {
                sink.lock().push(previous.clone());
            }
        });

        let store = MemoryRecordStore::with_hooks(Arc::clone(&hooks));
        store.insert(Record::new(RecordId(1)).with("1", "before"));
        store
            .update(RecordId(1), Record::new(RecordId(1)).with("1", "after"))
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get(&"1".into()), Some(&json!("before")));
        assert_eq!(
            store.get(RecordId(1)).unwrap().unwrap().get(&"1".into()),
            Some(&json!("after"))
        );
    }

    #[test]
    fn test_record_store_update_missing() {
        let store = MemoryRecordStore::new();
        let result = store.update(RecordId(9), Record::new(RecordId(9)));
        assert!(matches!(result, Err(RevisionError::RecordNotFound(_))));
        assert_eq!(store.update_count(), 1);
    }
}
