//! Structured data handed to presentation and diff renderers.
//!
//! The engine never produces markup. A renderer asks for [`RenderMode`] to
//! decide between the normal record screen and a single-revision screen, and
//! renders [`RevisionSummary`] lists and [`RevisionDetail`] comparisons.

use crate::diff::FieldChange;
use crate::types::{ActorId, FieldKey, Revision, RevisionKey, Timestamp};
use serde::Serialize;

/// What the record screen should show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    /// The record with its revision list.
    Normal,
    /// One revision compared against the current record, nothing else.
    RevisionDetail(RevisionKey),
}

impl RenderMode {
    /// Derive the mode from the `revision` request parameter.
    ///
    /// Missing, empty or non-numeric values mean [`RenderMode::Normal`].
    pub fn from_query(revision: Option<&str>) -> Self {
        revision
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<i64>().ok())
            .map_or(RenderMode::Normal, |key| {
                RenderMode::RevisionDetail(RevisionKey(key))
            })
    }

    pub fn is_revision_detail(&self) -> bool {
        matches!(self, RenderMode::RevisionDetail(_))
    }
}

/// One entry of a revision list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RevisionSummary {
    pub key: RevisionKey,
    pub created_at: Timestamp,
    pub created_at_gmt: Timestamp,
    pub author_id: ActorId,
    pub changed: Vec<FieldKey>,
}

impl RevisionSummary {
    pub fn from_revision(revision: &Revision) -> Self {
        Self {
            key: revision.key(),
            created_at: revision.metadata.created_at,
            created_at_gmt: revision.metadata.created_at_gmt,
            author_id: revision.metadata.author_id,
            changed: revision.changed_keys(),
        }
    }

    /// Seconds between creation and `now` (both UTC), never negative.
    pub fn age_secs(&self, now: Timestamp) -> i64 {
        (now.0 - self.created_at_gmt.0).max(0)
    }
}

/// A revision compared against the current record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RevisionDetail {
    pub summary: RevisionSummary,
    /// Form fields that would change if the revision were restored.
    pub changes: Vec<FieldChange>,
}

impl RevisionDetail {
    /// Restoring would change no form field.
    pub fn is_identical(&self) -> bool {
        self.changes.is_empty()
    }
}
