//! Per-record mutual exclusion.

use crate::types::RecordId;
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::HashMap;
use std::sync::Arc;

/// Serializes read-modify-write sequences on one record's log.
///
/// Locks are reentrant so a restore can hold its record's lock while the
/// nested `add`/`delete` calls take it again. Entries are dropped once no
/// thread holds or waits on them.
#[derive(Default)]
pub(crate) struct LockTable {
    locks: Mutex<HashMap<RecordId, Arc<ReentrantMutex<()>>>>,
}

impl LockTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `record_id`.
    pub(crate) fn with_lock<T>(&self, record_id: RecordId, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(
                locks
                    .entry(record_id)
                    .or_insert_with(|| Arc::new(ReentrantMutex::new(()))),
            )
        };

        let result = {
            let _guard = lock.lock();
            f()
        };

        let mut locks = self.locks.lock();
        // One reference in the table, one here: nobody else is interested.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&record_id);
        }
        result
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_reentrant_and_cleaned_up() {
        let table = LockTable::new();
        let value = table.with_lock(RecordId(1), || {
            table.with_lock(RecordId(1), || {
                assert_eq!(table.len(), 1);
                7
            })
        });
        assert_eq!(value, 7);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_serializes_same_record() {
        let table = Arc::new(LockTable::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    for _ in 0..50 {
                        table.with_lock(RecordId(1), || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_inside.fetch_max(now, Ordering::SeqCst);
                            thread::yield_now();
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(table.len(), 0);
    }
}
