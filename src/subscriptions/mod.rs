//! Live revision-event subscriptions.
//!
//! The revision store and restore engine publish [`RevisionEvent`]s for every
//! change to a log. Subscribers receive them over bounded channels; a
//! subscriber whose buffer fills up is dropped instead of blocking writers.
//!
//! # Example
//!
//! ```ignore
//! let manager = Arc::new(SubscriptionManager::new());
//! let store = RevisionStore::new(config, meta, records, identity)
//!     .with_subscriptions(Arc::clone(&manager));
//!
//! let handle = manager.subscribe(SubscriptionConfig {
//!     filter: SubscriptionFilter::records(vec![RecordId(42)]),
//!     ..Default::default()
//! });
//!
//! while let Ok(event) = handle.recv() {
//!     match event {
//!         RevisionEvent::Added { revision_key, .. } => println!("new revision {revision_key}"),
//!         RevisionEvent::Dropped { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    DropReason, RevisionEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId,
};
