//! Subscription types for live revision events.

use crate::types::{ActorId, FieldKey, RecordId, RevisionKey};
use serde::{Deserialize, Serialize};

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping subscriber.
    /// Default: 1000
    pub buffer_size: usize,

    /// Filter criteria.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            filter: SubscriptionFilter::all(),
        }
    }
}

/// Filter criteria for subscriptions.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionFilter {
    /// Only these records (None = all records).
    pub record_ids: Option<Vec<RecordId>>,

    /// Include revision additions.
    pub include_added: bool,

    /// Include single deletions and whole-log purges.
    pub include_deleted: bool,

    /// Include completed restores.
    pub include_restored: bool,
}

impl SubscriptionFilter {
    /// Everything, for every record.
    pub fn all() -> Self {
        Self {
            record_ids: None,
            include_added: true,
            include_deleted: true,
            include_restored: true,
        }
    }

    /// Everything, for the given records.
    pub fn records(ids: Vec<RecordId>) -> Self {
        Self {
            record_ids: Some(ids),
            ..Self::all()
        }
    }

    /// Completed restores only.
    pub fn restores() -> Self {
        Self {
            include_restored: true,
            ..Default::default()
        }
    }
}

/// Events emitted by subscriptions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RevisionEvent {
    /// A revision was appended to a record's log.
    Added {
        record_id: RecordId,
        revision_key: RevisionKey,
        author_id: ActorId,
        changed: Vec<FieldKey>,
    },

    /// One revision was removed.
    Deleted {
        record_id: RecordId,
        revision_key: RevisionKey,
    },

    /// A record's whole log was removed.
    Cleared { record_id: RecordId },

    /// A record was restored to a revision.
    Restored {
        record_id: RecordId,
        revision_key: RevisionKey,
        snapshot_added: bool,
        source_deleted: bool,
    },

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

impl RevisionEvent {
    /// Record the event concerns, if any.
    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            RevisionEvent::Added { record_id, .. }
            | RevisionEvent::Deleted { record_id, .. }
            | RevisionEvent::Cleared { record_id }
            | RevisionEvent::Restored { record_id, .. } => Some(*record_id),
            RevisionEvent::Dropped { .. } => None,
        }
    }
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to manage a subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<RevisionEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<RevisionEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<RevisionEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<RevisionEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
