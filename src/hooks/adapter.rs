//! Glue between host record events and the revision store.

use super::{EventKind, HandlerId, HookRegistry, HostEvent};
use crate::revisions::RevisionStore;
use crate::types::{Record, RecordId};
use serde::Deserialize;
use std::sync::Arc;

/// Adapter options.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Drop a record's whole revision log when the host deletes the record.
    pub purge_on_delete: bool,
}

/// Records a revision whenever the host reports a record update.
pub struct ChangeNotificationAdapter {
    hooks: Arc<HookRegistry>,
    update_handler: HandlerId,
    handler_ids: Vec<HandlerId>,
}

impl ChangeNotificationAdapter {
    /// Register the adapter's handlers with `hooks`.
    pub fn attach(
        hooks: Arc<HookRegistry>,
        revisions: Arc<RevisionStore>,
        config: AdapterConfig,
    ) -> Self {
        let store = Arc::clone(&revisions);
        let update_handler = hooks.subscribe(EventKind::RecordUpdated, move |event| {
            if let HostEvent::RecordUpdated {
                record_id,
                previous,
            } = event
            {
                on_record_updated(&store, *record_id, previous);
            }
        });
        let mut handler_ids = vec![update_handler];

        if config.purge_on_delete {
            let store = Arc::clone(&revisions);
            handler_ids.push(hooks.subscribe(EventKind::RecordDeleted, move |event| {
                let record_id = event.record_id();
                if let Err(e) = store.delete_all(record_id) {
                    tracing::warn!(%record_id, error = %e, "failed to purge revisions of deleted record");
                }
            }));
        }

        Self {
            hooks,
            update_handler,
            handler_ids,
        }
    }

    /// Unregister every handler this adapter added.
    pub fn detach(self) {
        for id in self.handler_ids {
            self.hooks.unsubscribe(id);
        }
    }

    /// The handler that logs revisions on record updates.
    pub fn update_handler(&self) -> HandlerId {
        self.update_handler
    }

    pub fn handler_ids(&self) -> &[HandlerId] {
        &self.handler_ids
    }
}

/// Handler for "record updated": log a revision of what the update replaced.
///
/// A save that changed nothing is silently accepted. Store failures are logged
/// and swallowed; the host's update already happened.
pub fn on_record_updated(revisions: &RevisionStore, record_id: RecordId, previous: &Record) {
    match revisions.add(record_id, previous) {
        Ok(true) => tracing::debug!(%record_id, "revision recorded"),
        Ok(false) => tracing::trace!(%record_id, "update changed nothing"),
        Err(e) => tracing::warn!(%record_id, error = %e, "failed to record revision"),
    }
}
