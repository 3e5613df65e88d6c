//! The revision store: CRUD over per-record revision logs.

use super::codec::{self, LogEncoding};
use super::locks::LockTable;
use super::log::RevisionLog;
use crate::backends::{IdentityProvider, MetaStore, RecordStore};
use crate::clock::{Clock, SystemClock};
use crate::diff::{self, FieldChange};
use crate::error::{Result, RevisionError};
use crate::subscriptions::{RevisionEvent, SubscriptionManager};
use crate::types::{Record, RecordId, Revision, RevisionKey, RevisionMetadata};
use crate::view::{RevisionDetail, RevisionSummary};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Revision store configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RevisionStoreConfig {
    /// Meta store key the log is kept under. Distinct keys give independent
    /// logs for the same records.
    pub meta_key: String,

    /// Payload encoding for newly written logs.
    pub encoding: LogEncoding,

    /// Decoded logs kept in memory (0 = no cache). The cache assumes this
    /// store is the only writer of `meta_key`.
    pub log_cache_size: usize,

    /// Site UTC offset used for the local `created_at` timestamp.
    pub utc_offset_secs: i64,
}

impl Default for RevisionStoreConfig {
    fn default() -> Self {
        Self {
            meta_key: "gv_revisions".to_string(),
            encoding: LogEncoding::default(),
            log_cache_size: 64,
            utc_offset_secs: 0,
        }
    }
}

impl RevisionStoreConfig {
    /// Parse from JSON; missing keys take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// CRUD over revision logs, one log per record.
pub struct RevisionStore {
    config: RevisionStoreConfig,
    meta: Arc<dyn MetaStore>,
    records: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    locks: LockTable,
    cache: Option<Mutex<LruCache<RecordId, RevisionLog>>>,
    subscriptions: Option<Arc<SubscriptionManager>>,
}

impl RevisionStore {
    /// Create a store using the system clock.
    pub fn new(
        config: RevisionStoreConfig,
        meta: Arc<dyn MetaStore>,
        records: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let cache = NonZeroUsize::new(config.log_cache_size)
            .map(|size| Mutex::new(LruCache::new(size)));

        Self {
            config,
            meta,
            records,
            identity,
            clock: Arc::new(SystemClock),
            locks: LockTable::new(),
            cache,
            subscriptions: None,
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Publish revision events to `manager`.
    pub fn with_subscriptions(mut self, manager: Arc<SubscriptionManager>) -> Self {
        self.subscriptions = Some(manager);
        self
    }

    pub fn config(&self) -> &RevisionStoreConfig {
        &self.config
    }

    // --- Revision Operations ---

    /// Log what changed between `old_snapshot` and the record's current state.
    ///
    /// Returns `false` without touching the log when nothing changed.
    pub fn add(&self, record_id: RecordId, old_snapshot: &Record) -> Result<bool> {
        self.locks.with_lock(record_id, || {
            let current = self.current_record(record_id)?;

            let delta = diff::diff(old_snapshot, &current);
            if delta.is_empty() {
                tracing::debug!(%record_id, "no fields changed, skipping revision");
                return Ok(false);
            }

            let now = self.clock.now();
            let revision = Revision {
                delta,
                metadata: RevisionMetadata {
                    created_at: now.offset_by(self.config.utc_offset_secs),
                    created_at_gmt: now,
                    author_id: self.identity.current_actor(),
                },
            };
            let revision_key = revision.key();

            let mut log = self.load(record_id)?;
            if log.find(revision_key).is_some() {
                tracing::warn!(
                    %record_id,
                    %revision_key,
                    "revision key already in use; lookups will resolve to the newest"
                );
            }

            let event = RevisionEvent::Added {
                record_id,
                revision_key,
                author_id: revision.metadata.author_id,
                changed: revision.changed_keys(),
            };

            log.append(revision);
            self.save(record_id, log)?;

            tracing::debug!(%record_id, %revision_key, "revision added");
            self.notify(event);
            Ok(true)
        })
    }

    /// All revisions of a record, newest first.
    pub fn get_all(&self, record_id: RecordId) -> Result<Vec<Revision>> {
        Ok(self.load(record_id)?.newest_first())
    }

    /// The newest revision, if any.
    pub fn get_last(&self, record_id: RecordId) -> Result<Option<Revision>> {
        Ok(self.load(record_id)?.latest().cloned())
    }

    /// The revision with the given key.
    pub fn get(&self, record_id: RecordId, revision_key: RevisionKey) -> Result<Option<Revision>> {
        Ok(self.load(record_id)?.find(revision_key).cloned())
    }

    /// Number of revisions in a record's log.
    pub fn count(&self, record_id: RecordId) -> Result<usize> {
        Ok(self.load(record_id)?.len())
    }

    /// Remove one revision. Returns `false` if no revision has that key.
    pub fn delete(&self, record_id: RecordId, revision_key: RevisionKey) -> Result<bool> {
        self.locks.with_lock(record_id, || {
            let mut log = self.load(record_id)?;
            if log.remove(revision_key).is_none() {
                return Ok(false);
            }

            self.save(record_id, log)?;

            tracing::debug!(%record_id, %revision_key, "revision deleted");
            self.notify(RevisionEvent::Deleted {
                record_id,
                revision_key,
            });
            Ok(true)
        })
    }

    /// Remove the entry equal to `revision`. Unlike [`delete`](Self::delete)
    /// this cannot hit a newer revision that shares the key.
    pub(crate) fn delete_revision(&self, record_id: RecordId, revision: &Revision) -> Result<bool> {
        self.locks.with_lock(record_id, || {
            let mut log = self.load(record_id)?;
            if log.remove_exact(revision).is_none() {
                return Ok(false);
            }

            self.save(record_id, log)?;
            self.notify(RevisionEvent::Deleted {
                record_id,
                revision_key: revision.key(),
            });
            Ok(true)
        })
    }

    /// Remove a record's entire log.
    pub fn delete_all(&self, record_id: RecordId) -> Result<()> {
        self.locks.with_lock(record_id, || {
            self.meta.delete(record_id, &self.config.meta_key)?;
            if let Some(cache) = &self.cache {
                cache.lock().pop(&record_id);
            }

            tracing::info!(%record_id, "revision log removed");
            self.notify(RevisionEvent::Cleared { record_id });
            Ok(())
        })
    }

    // --- Comparison ---

    /// Form fields that differ between a revision and the current record.
    pub fn compare(
        &self,
        record_id: RecordId,
        revision_key: RevisionKey,
    ) -> Result<Vec<FieldChange>> {
        let revision = self
            .get(record_id, revision_key)?
            .ok_or(RevisionError::RevisionNotFound {
                record_id,
                revision_key,
            })?;
        let current = self.current_record(record_id)?;
        Ok(diff::compare(&revision.delta, &current))
    }

    /// A revision with its comparison against the current record.
    pub fn detail(
        &self,
        record_id: RecordId,
        revision_key: RevisionKey,
    ) -> Result<Option<RevisionDetail>> {
        let revision = match self.get(record_id, revision_key)? {
            Some(r) => r,
            None => return Ok(None),
        };
        let current = self.current_record(record_id)?;

        Ok(Some(RevisionDetail {
            summary: RevisionSummary::from_revision(&revision),
            changes: diff::compare(&revision.delta, &current),
        }))
    }

    /// Revisions that would still change a form field if restored, newest first.
    pub fn history(&self, record_id: RecordId) -> Result<Vec<RevisionSummary>> {
        let log = self.load(record_id)?;
        if log.is_empty() {
            return Ok(Vec::new());
        }

        let current = self.current_record(record_id)?;
        Ok(log
            .iter()
            .filter(|r| !diff::compare(&r.delta, &current).is_empty())
            .map(RevisionSummary::from_revision)
            .collect())
    }

    // --- Internal ---

    /// Run `f` holding the record's log lock. Nested store calls on the same
    /// thread re-enter the lock.
    pub(crate) fn with_record_lock<T>(&self, record_id: RecordId, f: impl FnOnce() -> T) -> T {
        self.locks.with_lock(record_id, f)
    }

    pub(crate) fn notify(&self, event: RevisionEvent) {
        if let Some(manager) = &self.subscriptions {
            manager.broadcast(event);
        }
    }

    fn current_record(&self, record_id: RecordId) -> Result<Record> {
        self.records
            .get(record_id)?
            .ok_or(RevisionError::RecordNotFound(record_id))
    }

    /// Cached or decoded log. The miss path fills the cache under the
    /// record's lock so it cannot overwrite a log a writer saved meanwhile.
    fn load(&self, record_id: RecordId) -> Result<RevisionLog> {
        if let Some(cache) = &self.cache {
            if let Some(log) = cache.lock().get(&record_id) {
                return Ok(log.clone());
            }
        }

        self.locks.with_lock(record_id, || {
            if let Some(cache) = &self.cache {
                if let Some(log) = cache.lock().get(&record_id) {
                    return Ok(log.clone());
                }
            }

            let log = match self.meta.get(record_id, &self.config.meta_key)? {
                Some(blob) => codec::decode(&blob)?,
                None => RevisionLog::new(),
            };

            if let Some(cache) = &self.cache {
                cache.lock().put(record_id, log.clone());
            }
            Ok(log)
        })
    }

    fn save(&self, record_id: RecordId, log: RevisionLog) -> Result<()> {
        let blob = codec::encode(&log, self.config.encoding)?;
        self.meta.set(record_id, &self.config.meta_key, blob)?;

        if let Some(cache) = &self.cache {
            cache.lock().put(record_id, log);
        }
        Ok(())
    }
}
