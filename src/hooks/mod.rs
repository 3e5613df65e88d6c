//! Host event hooks.
//!
//! The host announces record lifecycle events through a [`HookRegistry`].
//! The [`ChangeNotificationAdapter`] listens for updates and turns each one
//! into a revision. A restore detaches that adapter's handler for its own
//! write with [`HookRegistry::suppress`], which hands back a guard; dropping
//! the guard re-attaches it no matter how the write ended.

mod adapter;
mod registry;

pub use adapter::{on_record_updated, AdapterConfig, ChangeNotificationAdapter};
pub use registry::{HandlerId, HookRegistry, SuppressionGuard};

use crate::types::{Record, RecordId};

/// Kinds of host events handlers can subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    RecordUpdated,
    RecordDeleted,
}

/// An event fired by the host.
#[derive(Clone, Debug)]
pub enum HostEvent {
    /// A record was written. Carries the record as it was before the write.
    RecordUpdated { record_id: RecordId, previous: Record },

    /// A record was removed.
    RecordDeleted { record_id: RecordId },
}

impl HostEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HostEvent::RecordUpdated { .. } => EventKind::RecordUpdated,
            HostEvent::RecordDeleted { .. } => EventKind::RecordDeleted,
        }
    }

    pub fn record_id(&self) -> RecordId {
        match self {
            HostEvent::RecordUpdated { record_id, .. } | HostEvent::RecordDeleted { record_id } => {
                *record_id
            }
        }
    }
}
