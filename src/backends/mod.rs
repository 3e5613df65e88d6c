//! Collaborator interfaces the revision engine calls into.
//!
//! The engine owns neither record persistence nor policy. Hosts plug their
//! record store, meta store and access control in through these traits; the
//! in-process implementations here back tests and embedded use.

mod access;
mod memory;

pub use access::{StaticIdentity, TokenAuthority};
pub use memory::{MemoryMetaStore, MemoryRecordStore};

use crate::error::Result;
use crate::restore::RestoreScope;
use crate::types::{ActorId, Record, RecordId};

/// Generic per-record key-value storage for opaque blobs.
///
/// Only single-key atomicity is assumed.
pub trait MetaStore: Send + Sync {
    fn get(&self, record_id: RecordId, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, record_id: RecordId, key: &str, blob: Vec<u8>) -> Result<()>;
    fn delete(&self, record_id: RecordId, key: &str) -> Result<()>;
}

/// Owner of the canonical current records.
pub trait RecordStore: Send + Sync {
    /// Current record, or `None` if it does not exist.
    fn get(&self, id: RecordId) -> Result<Option<Record>>;

    /// Replace the record's values.
    fn update(&self, id: RecordId, record: Record) -> Result<()>;
}

/// Capability and action-token checks.
pub trait AccessControl: Send + Sync {
    fn has_capability(&self, actor: ActorId, capability: &str) -> bool;

    /// Whether `token` was issued for exactly this `(record, revision)` scope.
    fn verify_action_token(&self, token: &str, scope: &RestoreScope) -> bool;
}

/// Identity of the actor performing the current operation.
pub trait IdentityProvider: Send + Sync {
    fn current_actor(&self) -> ActorId;
}
