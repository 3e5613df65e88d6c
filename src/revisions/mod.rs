//! Per-record revision logs.
//!
//! A record's log lives in the meta store under a configurable key, encoded
//! by [`codec`]. The [`RevisionStore`] is the only writer: it diffs, appends,
//! looks up and deletes revisions, serializing every read-modify-write per
//! record.

pub mod codec;
mod locks;
mod log;
mod store;

pub use codec::LogEncoding;
pub use log::RevisionLog;
pub use store::{RevisionStore, RevisionStoreConfig};
