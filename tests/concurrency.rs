//! Concurrent saves and restores against shared stores.

use crossbeam_channel::{bounded, Receiver, Sender};
use entry_revisions::{
    ActorId, AdapterConfig, ChangeNotificationAdapter, FieldKey, HookRegistry, MemoryMetaStore,
    MemoryRecordStore, MetaStore, Record, RecordId, RecordStore, RestoreConfig, RestoreEngine,
    RestoreRequest, RestoreScope, Result, RevisionStore, RevisionStoreConfig, StaticIdentity,
    TokenAuthority,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct Shared {
    records: Arc<MemoryRecordStore>,
    revisions: Arc<RevisionStore>,
    hooks: Arc<HookRegistry>,
}

fn shared(cache_size: usize) -> Shared {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let hooks = Arc::new(HookRegistry::new());
    let records = Arc::new(MemoryRecordStore::with_hooks(hooks.clone()));
    let revisions = Arc::new(RevisionStore::new(
        RevisionStoreConfig {
            log_cache_size: cache_size,
            ..Default::default()
        },
        Arc::new(MemoryMetaStore::new()),
        records.clone(),
        Arc::new(StaticIdentity(ActorId(1))),
    ));
    Shared {
        records,
        revisions,
        hooks,
    }
}

#[test]
fn test_parallel_adds_same_record_lose_nothing() {
    for cache_size in [0, 64] {
        let s = shared(cache_size);
        s.records.insert(Record::new(RecordId(1)).with("1", "initial"));

        let threads = 8;
        let per_thread = 25;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let revisions = s.revisions.clone();
                thread::spawn(move || {
                    for i in 0..per_thread {
                        // Every snapshot differs from the current record, so
                        // every add yields a revision.
                        let old = Record::new(RecordId(1)).with("1", format!("t{t}-{i}"));
                        assert!(revisions.add(RecordId(1), &old).unwrap());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            s.revisions.count(RecordId(1)).unwrap(),
            threads * per_thread
        );
    }
}

#[test]
fn test_parallel_host_updates_on_distinct_records() {
    let s = shared(64);
    let adapter = ChangeNotificationAdapter::attach(
        s.hooks.clone(),
        s.revisions.clone(),
        AdapterConfig::default(),
    );

    for id in 0..16u64 {
        s.records.insert(Record::new(RecordId(id)).with("1", 0));
    }

    let handles: Vec<_> = (0..16u64)
        .map(|id| {
            let records = s.records.clone();
            thread::spawn(move || {
                for v in 1..=10 {
                    records
                        .update(RecordId(id), Record::new(RecordId(id)).with("1", v))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for id in 0..16u64 {
        let log = s.revisions.get_all(RecordId(id)).unwrap();
        assert_eq!(log.len(), 10);
        let newest_old_value = &log[0].delta[&FieldKey::from("1")];
        assert_eq!(newest_old_value, &serde_json::json!(9));
    }

    adapter.detach();
    assert_eq!(
        s.hooks.handler_count(entry_revisions::EventKind::RecordUpdated),
        0
    );
}

#[test]
fn test_restore_concurrent_with_saves_of_same_record() {
    let s = shared(64);
    let adapter = ChangeNotificationAdapter::attach(
        s.hooks.clone(),
        s.revisions.clone(),
        AdapterConfig::default(),
    );
    let access = Arc::new(TokenAuthority::new("k"));
    access.grant(ActorId(1), "gravityforms_edit_entries");
    let engine = Arc::new(
        RestoreEngine::new(
            RestoreConfig::default(),
            s.revisions.clone(),
            s.records.clone(),
            access.clone(),
            s.hooks.clone(),
        )
        .with_adapter(&adapter),
    );

    s.records.insert(Record::new(RecordId(1)).with("1", "a"));
    s.records
        .update(RecordId(1), Record::new(RecordId(1)).with("1", "b"))
        .unwrap();
    let key = s.revisions.get_last(RecordId(1)).unwrap().unwrap().key();
    let token = access.issue(&RestoreScope::new(RecordId(1), key));

    let restorer = {
        let engine = engine.clone();
        thread::spawn(move || {
            for _ in 0..20 {
                let request = RestoreRequest::new(RecordId(1), key, token.clone());
                engine.restore(ActorId(1), &request).unwrap();
            }
        })
    };
    let saver = {
        let records = s.records.clone();
        thread::spawn(move || {
            for i in 0..20 {
                records
                    .update(RecordId(1), Record::new(RecordId(1)).with("1", format!("s{i}")))
                    .unwrap();
            }
        })
    };

    restorer.join().unwrap();
    saver.join().unwrap();

    // The log stays decodable and every entry captured a real change.
    let log = s.revisions.get_all(RecordId(1)).unwrap();
    assert!(!log.is_empty());
    assert!(log.iter().all(|r| !r.delta.is_empty()));
}

/// Meta store whose next read, once armed, parks until released.
struct GatedMeta {
    inner: MemoryMetaStore,
    armed: AtomicBool,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl MetaStore for GatedMeta {
    fn get(&self, record_id: RecordId, key: &str) -> Result<Option<Vec<u8>>> {
        let blob = self.inner.get(record_id, key)?;
        if self.armed.swap(false, Ordering::SeqCst) {
            let _ = self.entered.send(());
            let _ = self.release.recv();
        }
        Ok(blob)
    }

    fn set(&self, record_id: RecordId, key: &str, blob: Vec<u8>) -> Result<()> {
        self.inner.set(record_id, key, blob)
    }

    fn delete(&self, record_id: RecordId, key: &str) -> Result<()> {
        self.inner.delete(record_id, key)
    }
}

#[test]
fn test_cold_read_racing_add_keeps_cache_fresh() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let (entered_tx, entered_rx) = bounded(1);
    let (release_tx, release_rx) = bounded(1);
    let meta = Arc::new(GatedMeta {
        inner: MemoryMetaStore::new(),
        armed: AtomicBool::new(false),
        entered: entered_tx,
        release: release_rx,
    });
    let records = Arc::new(MemoryRecordStore::new());
    records.insert(Record::new(RecordId(1)).with("1", "current"));

    let store_over = |cache_size| {
        Arc::new(RevisionStore::new(
            RevisionStoreConfig {
                log_cache_size: cache_size,
                ..Default::default()
            },
            meta.clone(),
            records.clone(),
            Arc::new(StaticIdentity(ActorId(1))),
        ))
    };
    let snapshot = |tag: &str| Record::new(RecordId(1)).with("1", tag);

    store_over(0).add(RecordId(1), &snapshot("seed")).unwrap();
    let cached = store_over(64);
    meta.armed.store(true, Ordering::SeqCst);

    // The reader misses the cache and parks after reading the stored blob.
    let reader = {
        let cached = cached.clone();
        thread::spawn(move || cached.get_all(RecordId(1)).unwrap().len())
    };
    entered_rx.recv().unwrap();

    let writer = {
        let cached = cached.clone();
        thread::spawn(move || cached.add(RecordId(1), &snapshot("writer")).unwrap())
    };
    thread::sleep(Duration::from_millis(50));
    release_tx.send(()).unwrap();

    assert_eq!(reader.join().unwrap(), 1);
    assert!(writer.join().unwrap());

    // A stale cache entry would make this add drop the writer's revision.
    assert!(cached.add(RecordId(1), &snapshot("after")).unwrap());
    assert_eq!(cached.count(RecordId(1)).unwrap(), 3);
    assert_eq!(store_over(0).count(RecordId(1)).unwrap(), 3);
}
