//! # Entry Revisions
//!
//! Field-level revision history for structured records, with authorized
//! restore of any logged revision.
//!
//! ## Core Concepts
//!
//! - **Revisions**: Old values of the fields a save changed, plus who and when
//! - **Logs**: Per-record revision sequences kept in a key/value meta store
//! - **Restore**: Layer a revision back onto the current record, logging the
//!   pre-restore state as a new revision
//! - **Hooks**: Host update events feed the log through an adapter whose
//!   handler a restore detaches for its own write
//!
//! ## Example
//!
//! ```ignore
//! use entry_revisions::*;
//!
//! let hooks = Arc::new(HookRegistry::new());
//! let records = Arc::new(MemoryRecordStore::with_hooks(hooks.clone()));
//! let revisions = Arc::new(RevisionStore::new(
//!     RevisionStoreConfig::default(),
//!     Arc::new(MemoryMetaStore::new()),
//!     records.clone(),
//!     Arc::new(StaticIdentity(ActorId(1))),
//! ));
//! let adapter = ChangeNotificationAdapter::attach(
//!     hooks.clone(),
//!     revisions.clone(),
//!     AdapterConfig::default(),
//! );
//!
//! // Every host update now logs a revision.
//! records.update(RecordId(7), edited)?;
//!
//! let engine = RestoreEngine::new(RestoreConfig::default(), revisions, records, access, hooks)
//!     .with_adapter(&adapter);
//! engine.handle_request(actor, Some("1700000000"), Some("7"), Some(&token))?;
//! ```

pub mod backends;
pub mod clock;
pub mod diff;
pub mod error;
pub mod hooks;
pub mod restore;
pub mod revisions;
pub mod subscriptions;
pub mod types;
pub mod view;

// Re-exports
pub use backends::{
    AccessControl, IdentityProvider, MemoryMetaStore, MemoryRecordStore, MetaStore, RecordStore,
    StaticIdentity, TokenAuthority,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use diff::{compare, diff, loose_eq, FieldChange};
pub use error::{Result, RevisionError};
pub use hooks::{
    AdapterConfig, ChangeNotificationAdapter, EventKind, HandlerId, HookRegistry, HostEvent,
    SuppressionGuard,
};
pub use restore::{
    RestoreConfig, RestoreEngine, RestoreReport, RestoreRequest, RestoreScope, RestoreState,
};
pub use revisions::{LogEncoding, RevisionLog, RevisionStore, RevisionStoreConfig};
pub use subscriptions::{
    DropReason, RevisionEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId, SubscriptionManager,
};
pub use types::*;
pub use view::{RenderMode, RevisionDetail, RevisionSummary};
