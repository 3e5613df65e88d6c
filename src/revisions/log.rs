//! Ordered revision history of one record.

use crate::types::{Revision, RevisionKey};

/// Revisions of one record, stored oldest-first.
///
/// Every read accessor presents newest-first order; lookups by key return the
/// newest revision carrying that key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RevisionLog {
    revisions: Vec<Revision>,
}

impl RevisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from revisions in append (oldest-first) order.
    pub fn from_oldest_first(revisions: Vec<Revision>) -> Self {
        Self { revisions }
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Append a revision as the newest entry.
    pub fn append(&mut self, revision: Revision) {
        self.revisions.push(revision);
    }

    /// Iterate newest-first.
    pub fn iter(&self) -> impl Iterator<Item = &Revision> {
        self.revisions.iter().rev()
    }

    /// Owned copy in newest-first order.
    pub fn newest_first(&self) -> Vec<Revision> {
        self.iter().cloned().collect()
    }

    /// Most recently appended revision.
    pub fn latest(&self) -> Option<&Revision> {
        self.revisions.last()
    }

    /// Newest revision whose key equals `key`.
    pub fn find(&self, key: RevisionKey) -> Option<&Revision> {
        self.iter().find(|r| r.key() == key)
    }

    /// Remove the newest revision whose key equals `key`. Later duplicates
    /// (older revisions with the same key) are left in place.
    pub fn remove(&mut self, key: RevisionKey) -> Option<Revision> {
        let pos = self.revisions.iter().rposition(|r| r.key() == key)?;
        Some(self.revisions.remove(pos))
    }

    /// Remove the newest entry equal to `revision`.
    pub fn remove_exact(&mut self, revision: &Revision) -> Option<Revision> {
        let pos = self.revisions.iter().rposition(|r| r == revision)?;
        Some(self.revisions.remove(pos))
    }

    /// Storage (oldest-first) view.
    pub fn as_slice(&self) -> &[Revision] {
        &self.revisions
    }
}
