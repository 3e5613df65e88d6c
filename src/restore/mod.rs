//! Rolling a record back to a logged revision.
//!
//! A restore runs `Idle → Authorizing → Resolving → Merging →
//! SuppressedUpdate → Updated | Failed`. Everything after authorization holds
//! the record's revision lock, so a concurrent save of the same record cannot
//! interleave with the merge and the snapshot append.
//!
//! During the record write the change notification adapter's handler is
//! suppressed for that record only; other handlers still see the write. The
//! restore itself appends the pre-restore snapshot, so the write is logged
//! exactly once. If that append fails the record is written back.

mod engine;
mod request;

pub use engine::{RestoreConfig, RestoreEngine, RestoreReport, RestoreState};
pub use request::{RestoreRequest, RestoreScope};
