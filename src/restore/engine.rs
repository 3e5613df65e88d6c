//! The restore state machine.

use super::request::{RestoreRequest, RestoreScope};
use crate::backends::{AccessControl, RecordStore};
use crate::error::{Result, RevisionError};
use crate::hooks::{ChangeNotificationAdapter, HandlerId, HookRegistry};
use crate::revisions::RevisionStore;
use crate::subscriptions::RevisionEvent;
use crate::types::{ActorId, Record, RecordId, Revision, RevisionKey};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Restore behavior.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RestoreConfig {
    /// Also restore record-level metadata captured in the revision. When
    /// false the current metadata is kept and only form fields roll back.
    pub restore_entry_meta: bool,

    /// Remove the restored revision from the log afterwards.
    pub delete_after_restore: bool,

    /// Capability an actor needs to restore.
    pub capability: String,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            restore_entry_meta: false,
            delete_after_restore: false,
            capability: "gravityforms_edit_entries".to_string(),
        }
    }
}

impl RestoreConfig {
    /// Parse from JSON; missing keys take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Stages a restore passes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreState {
    Idle,
    Authorizing,
    Resolving,
    Merging,
    SuppressedUpdate,
    Updated,
    Failed,
}

impl RestoreState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreState::Idle => "idle",
            RestoreState::Authorizing => "authorizing",
            RestoreState::Resolving => "resolving",
            RestoreState::Merging => "merging",
            RestoreState::SuppressedUpdate => "suppressed_update",
            RestoreState::Updated => "updated",
            RestoreState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RestoreState::Updated | RestoreState::Failed)
    }
}

impl fmt::Display for RestoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful restore.
#[derive(Clone, Debug, PartialEq)]
pub struct RestoreReport {
    pub record_id: RecordId,
    pub revision_key: RevisionKey,
    /// The pre-restore record was logged as a new revision.
    pub snapshot_added: bool,
    /// The source revision was removed from the log.
    pub source_deleted: bool,
    /// States visited, in order.
    pub states: Vec<RestoreState>,
}

/// Visited states of one restore, logged as they happen.
struct Transitions {
    scope: RestoreScope,
    states: Vec<RestoreState>,
}

impl Transitions {
    fn start(scope: RestoreScope) -> Self {
        Self {
            scope,
            states: vec![RestoreState::Idle],
        }
    }

    fn enter(&mut self, state: RestoreState) {
        tracing::debug!(
            record_id = %self.scope.record_id,
            revision_key = %self.scope.revision_key,
            state = %state,
            "restore state"
        );
        self.states.push(state);
    }

    fn fail(&mut self, error: RevisionError) -> RevisionError {
        self.enter(RestoreState::Failed);
        error
    }
}

/// Rolls records back to a logged revision.
pub struct RestoreEngine {
    config: RestoreConfig,
    revisions: Arc<RevisionStore>,
    records: Arc<dyn RecordStore>,
    access: Arc<dyn AccessControl>,
    hooks: Arc<HookRegistry>,
    /// Handlers detached while the restore writes the record.
    suppressed: Vec<HandlerId>,
}

impl RestoreEngine {
    pub fn new(
        config: RestoreConfig,
        revisions: Arc<RevisionStore>,
        records: Arc<dyn RecordStore>,
        access: Arc<dyn AccessControl>,
        hooks: Arc<HookRegistry>,
    ) -> Self {
        Self {
            config,
            revisions,
            records,
            access,
            hooks,
            suppressed: Vec::new(),
        }
    }

    /// Keep `adapter` from logging the restore's own record writes. Other
    /// handlers of the registry still see them.
    pub fn with_adapter(mut self, adapter: &ChangeNotificationAdapter) -> Self {
        self.suppressed.push(adapter.update_handler());
        self
    }

    pub fn config(&self) -> &RestoreConfig {
        &self.config
    }

    /// Host entry point: parse the raw request parameters and restore if all
    /// of them are present. `Ok(None)` means no restore was requested.
    pub fn handle_request(
        &self,
        actor: ActorId,
        revision: Option<&str>,
        record: Option<&str>,
        token: Option<&str>,
    ) -> Result<Option<RestoreReport>> {
        match RestoreRequest::from_params(revision, record, token)? {
            Some(request) => self.restore(actor, &request).map(Some),
            None => Ok(None),
        }
    }

    /// Restore `request.revision_key` onto `request.record_id` on behalf of
    /// `actor`.
    ///
    /// Nothing is written unless the actor holds the capability and the token
    /// matches the scope. A missing revision or record leaves both the record
    /// and its log untouched, as does a rejected record write. If the
    /// pre-restore snapshot cannot be logged the record is written back.
    pub fn restore(&self, actor: ActorId, request: &RestoreRequest) -> Result<RestoreReport> {
        let scope = request.scope();
        let mut transitions = Transitions::start(scope);

        transitions.enter(RestoreState::Authorizing);
        if let Err(e) = self.authorize(actor, request) {
            tracing::warn!(
                record_id = %scope.record_id,
                revision_key = %scope.revision_key,
                actor = %actor,
                error = %e,
                "restore rejected"
            );
            return Err(transitions.fail(e));
        }

        let (snapshot_added, source_deleted) = self
            .revisions
            .with_record_lock(scope.record_id, || self.apply(scope, &mut transitions))?;

        Ok(RestoreReport {
            record_id: scope.record_id,
            revision_key: scope.revision_key,
            snapshot_added,
            source_deleted,
            states: transitions.states,
        })
    }

    fn authorize(&self, actor: ActorId, request: &RestoreRequest) -> Result<()> {
        if !self.access.has_capability(actor, &self.config.capability) {
            return Err(RevisionError::Unauthorized(format!(
                "actor {actor} lacks capability {}",
                self.config.capability
            )));
        }
        if !self.access.verify_action_token(&request.token, &request.scope()) {
            return Err(RevisionError::Unauthorized(format!(
                "invalid token for {}",
                request.scope()
            )));
        }
        Ok(())
    }

    /// Steps after authorization, run under the record's lock. Returns
    /// `(snapshot_added, source_deleted)`.
    fn apply(&self, scope: RestoreScope, transitions: &mut Transitions) -> Result<(bool, bool)> {
        let RestoreScope {
            record_id,
            revision_key,
        } = scope;

        transitions.enter(RestoreState::Resolving);
        let revision = match self.revisions.get(record_id, revision_key) {
            Ok(Some(revision)) => revision,
            Ok(None) => {
                tracing::warn!(%record_id, %revision_key, "revision to restore not found");
                return Err(transitions.fail(RevisionError::RevisionNotFound {
                    record_id,
                    revision_key,
                }));
            }
            Err(e) => return Err(transitions.fail(e)),
        };
        let current = match self.records.get(record_id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(%record_id, "record to restore not found");
                return Err(transitions.fail(RevisionError::RecordNotFound(record_id)));
            }
            Err(e) => return Err(transitions.fail(e)),
        };

        transitions.enter(RestoreState::Merging);
        let merged = self.merge(&current, &revision);

        transitions.enter(RestoreState::SuppressedUpdate);
        if let Err(e) = self.write_suppressed(record_id, merged) {
            tracing::error!(%record_id, %revision_key, error = %e, "restore write rejected");
            return Err(transitions.fail(RevisionError::UpdateFailed {
                record_id,
                source: Box::new(e),
            }));
        }

        let snapshot_added = match self.revisions.add(record_id, &current) {
            Ok(added) => added,
            Err(e) => {
                tracing::error!(%record_id, %revision_key, error = %e, "failed to log pre-restore snapshot");
                if let Err(rollback) = self.write_suppressed(record_id, current) {
                    tracing::error!(%record_id, error = %rollback, "failed to roll back restore");
                }
                return Err(transitions.fail(e));
            }
        };
        transitions.enter(RestoreState::Updated);

        // The restore already landed; a failed cleanup only keeps the source.
        let source_deleted = self.config.delete_after_restore
            && match self.revisions.delete_revision(record_id, &revision) {
                Ok(deleted) => deleted,
                Err(e) => {
                    tracing::warn!(%record_id, %revision_key, error = %e, "failed to delete restored revision");
                    false
                }
            };

        tracing::info!(%record_id, %revision_key, snapshot_added, source_deleted, "revision restored");
        self.revisions.notify(RevisionEvent::Restored {
            record_id,
            revision_key,
            snapshot_added,
            source_deleted,
        });
        Ok((snapshot_added, source_deleted))
    }

    /// Write `record` with the engine's own handlers detached for it.
    fn write_suppressed(&self, record_id: RecordId, record: Record) -> Result<()> {
        let _suppressed = self.hooks.suppress(&self.suppressed, Some(record_id));
        self.records.update(record_id, record)
    }

    /// The current record with the revision's old values layered on top.
    fn merge(&self, current: &Record, revision: &Revision) -> Record {
        let mut merged = current.clone();
        for (key, value) in &revision.delta {
            if key.is_field() || self.config.restore_entry_meta {
                merged.values.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{
        MemoryMetaStore, MemoryRecordStore, StaticIdentity, TokenAuthority,
    };
    use crate::clock::ManualClock;
    use crate::revisions::RevisionStoreConfig;
    use crate::types::FieldKey;
    use serde_json::json;

    const CAP: &str = "gravityforms_edit_entries";

    struct Fixture {
        meta: Arc<MemoryMetaStore>,
        records: Arc<MemoryRecordStore>,
        revisions: Arc<RevisionStore>,
        access: Arc<TokenAuthority>,
        clock: Arc<ManualClock>,
        hooks: Arc<HookRegistry>,
    }

    fn fixture() -> Fixture {
        let hooks = Arc::new(HookRegistry::new());
        let records = Arc::new(MemoryRecordStore::with_hooks(hooks.clone()));
        let clock = Arc::new(ManualClock::new(10_000));
        let meta = Arc::new(MemoryMetaStore::new());
        let revisions = Arc::new(
            RevisionStore::new(
                RevisionStoreConfig::default(),
                meta.clone(),
                records.clone(),
                Arc::new(StaticIdentity(ActorId(1))),
            )
            .with_clock(clock.clone()),
        );
        let access = Arc::new(TokenAuthority::new("test-secret"));
        access.grant(ActorId(1), CAP);
        Fixture {
            meta,
            records,
            revisions,
            access,
            clock,
            hooks,
        }
    }

    fn engine(f: &Fixture, config: RestoreConfig) -> RestoreEngine {
        RestoreEngine::new(
            config,
            f.revisions.clone(),
            f.records.clone(),
            f.access.clone(),
            f.hooks.clone(),
        )
    }

    /// Store v1, then overwrite with v2 and log the change. Returns the key.
    fn seed(f: &Fixture, v1: Record, v2: Record) -> RevisionKey {
        f.records.insert(v2);
        f.clock.advance(1);
        assert!(f.revisions.add(v1.id, &v1).unwrap());
        f.revisions.get_last(v1.id).unwrap().unwrap().key()
    }

    fn request(f: &Fixture, record_id: RecordId, key: RevisionKey) -> RestoreRequest {
        let token = f.access.issue(&RestoreScope::new(record_id, key));
        RestoreRequest::new(record_id, key, token)
    }

    #[test]
    fn test_restore_walks_every_state() {
        let f = fixture();
        let v1 = Record::new(RecordId(1)).with("1", "a");
        let key = seed(&f, v1.clone(), v1.clone().with("1", "b"));
        f.clock.advance(5);

        let report = engine(&f, RestoreConfig::default())
            .restore(ActorId(1), &request(&f, RecordId(1), key))
            .unwrap();

        assert_eq!(
            report.states,
            vec![
                RestoreState::Idle,
                RestoreState::Authorizing,
                RestoreState::Resolving,
                RestoreState::Merging,
                RestoreState::SuppressedUpdate,
                RestoreState::Updated,
            ]
        );
        assert!(report.snapshot_added);
        assert!(!report.source_deleted);
        assert_eq!(f.records.get(RecordId(1)).unwrap().unwrap(), v1);
    }

    #[test]
    fn test_metadata_kept_by_default() {
        let f = fixture();
        let v1 = Record::new(RecordId(1)).with("1", "a").with("status", "draft");
        let v2 = v1.clone().with("1", "b").with("status", "active");
        let key = seed(&f, v1, v2);

        engine(&f, RestoreConfig::default())
            .restore(ActorId(1), &request(&f, RecordId(1), key))
            .unwrap();

        let restored = f.records.get(RecordId(1)).unwrap().unwrap();
        assert_eq!(restored.get(&FieldKey::from("1")), Some(&json!("a")));
        assert_eq!(restored.get(&FieldKey::from("status")), Some(&json!("active")));
    }

    #[test]
    fn test_metadata_restored_when_enabled() {
        let f = fixture();
        let v1 = Record::new(RecordId(1)).with("1", "a").with("status", "draft");
        let v2 = v1.clone().with("1", "b").with("status", "active");
        let key = seed(&f, v1.clone(), v2);

        let config = RestoreConfig {
            restore_entry_meta: true,
            ..Default::default()
        };
        engine(&f, config)
            .restore(ActorId(1), &request(&f, RecordId(1), key))
            .unwrap();

        assert_eq!(f.records.get(RecordId(1)).unwrap().unwrap(), v1);
    }

    #[test]
    fn test_missing_capability_is_unauthorized() {
        let f = fixture();
        let v1 = Record::new(RecordId(1)).with("1", "a");
        let key = seed(&f, v1.clone(), v1.with("1", "b"));
        let updates = f.records.update_count();

        let err = engine(&f, RestoreConfig::default())
            .restore(ActorId(2), &request(&f, RecordId(1), key))
            .unwrap_err();

        assert!(matches!(err, RevisionError::Unauthorized(_)));
        assert_eq!(f.records.update_count(), updates);
    }

    #[test]
    fn test_token_for_other_revision_is_unauthorized() {
        let f = fixture();
        let v1 = Record::new(RecordId(1)).with("1", "a");
        let key = seed(&f, v1.clone(), v1.with("1", "b"));

        let other = f.access.issue(&RestoreScope::new(RecordId(1), RevisionKey(key.0 + 1)));
        let err = engine(&f, RestoreConfig::default())
            .restore(ActorId(1), &RestoreRequest::new(RecordId(1), key, other))
            .unwrap_err();
        assert!(matches!(err, RevisionError::Unauthorized(_)));
    }

    #[test]
    fn test_restore_same_second_delete_keeps_snapshot() {
        let f = fixture();
        let v1 = Record::new(RecordId(1)).with("1", "a");
        let v2 = v1.clone().with("1", "b");
        let key = seed(&f, v1, v2);

        // No clock advance: the snapshot gets the same key as the source.
        let config = RestoreConfig {
            delete_after_restore: true,
            ..Default::default()
        };
        let report = engine(&f, config)
            .restore(ActorId(1), &request(&f, RecordId(1), key))
            .unwrap();
        assert!(report.source_deleted);

        let log = f.revisions.get_all(RecordId(1)).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].delta[&FieldKey::from("1")], json!("b"));
    }

    #[test]
    fn test_snapshot_failure_rolls_back_record() {
        let f = fixture();
        let v1 = Record::new(RecordId(1)).with("1", "a");
        let v2 = v1.clone().with("1", "b");
        let key = seed(&f, v1, v2.clone());
        f.clock.advance(1);
        f.meta.set_fail_writes(true);

        let err = engine(&f, RestoreConfig::default())
            .restore(ActorId(1), &request(&f, RecordId(1), key))
            .unwrap_err();

        assert!(matches!(err, RevisionError::MetaStore(_)));
        assert_eq!(f.records.get(RecordId(1)).unwrap().unwrap(), v2);
        assert_eq!(f.revisions.count(RecordId(1)).unwrap(), 1);
    }

    #[test]
    fn test_handle_request_without_params() {
        let f = fixture();
        let report = engine(&f, RestoreConfig::default())
            .handle_request(ActorId(1), None, Some("1"), None)
            .unwrap();
        assert!(report.is_none());
        assert_eq!(f.records.update_count(), 0);
    }

    #[test]
    fn test_config_from_json() {
        let config = RestoreConfig::from_json_str(r#"{"delete_after_restore": true}"#).unwrap();
        assert!(config.delete_after_restore);
        assert!(!config.restore_entry_meta);
        assert_eq!(config.capability, CAP);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(RestoreState::SuppressedUpdate.to_string(), "suppressed_update");
        assert!(RestoreState::Failed.is_terminal());
        assert!(!RestoreState::Merging.is_terminal());
    }
}
