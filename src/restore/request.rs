//! Restore request parsing and action scopes.

use crate::error::{Result, RevisionError};
use crate::types::{RecordId, RevisionKey};
use std::fmt;

/// The (record, revision) pair an action token is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RestoreScope {
    pub record_id: RecordId,
    pub revision_key: RevisionKey,
}

impl RestoreScope {
    pub fn new(record_id: RecordId, revision_key: RevisionKey) -> Self {
        Self {
            record_id,
            revision_key,
        }
    }

    /// Action name tokens are issued for.
    pub fn action(&self) -> String {
        format!(
            "restore-record-{}-revision-{}",
            self.record_id, self.revision_key
        )
    }
}

impl fmt::Display for RestoreScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.action())
    }
}

/// A parsed request to restore one revision.
#[derive(Clone, PartialEq, Eq)]
pub struct RestoreRequest {
    pub record_id: RecordId,
    pub revision_key: RevisionKey,
    pub token: String,
}

impl RestoreRequest {
    pub fn new(record_id: RecordId, revision_key: RevisionKey, token: impl Into<String>) -> Self {
        Self {
            record_id,
            revision_key,
            token: token.into(),
        }
    }

    /// Parse the raw request parameters.
    ///
    /// If any parameter is missing or blank no restore was requested and
    /// `Ok(None)` is returned. Ids that are present but not integers are
    /// rejected with [`RevisionError::InvalidRequest`].
    pub fn from_params(
        revision: Option<&str>,
        record: Option<&str>,
        token: Option<&str>,
    ) -> Result<Option<Self>> {
        fn present(p: Option<&str>) -> Option<&str> {
            p.map(str::trim).filter(|s| !s.is_empty())
        }

        let (revision, record, token) = match (present(revision), present(record), present(token)) {
            (Some(rev), Some(rec), Some(tok)) => (rev, rec, tok),
            _ => return Ok(None),
        };

        let revision_key = revision
            .parse::<i64>()
            .map(RevisionKey)
            .map_err(|_| RevisionError::InvalidRequest(format!("bad revision id: {revision:?}")))?;
        let record_id = record
            .parse::<u64>()
            .map(RecordId)
            .map_err(|_| RevisionError::InvalidRequest(format!("bad record id: {record:?}")))?;

        Ok(Some(Self::new(record_id, revision_key, token)))
    }

    pub fn scope(&self) -> RestoreScope {
        RestoreScope::new(self.record_id, self.revision_key)
    }
}

// Tokens stay out of logs and panic messages.
impl fmt::Debug for RestoreRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestoreRequest")
            .field("record_id", &self.record_id)
            .field("revision_key", &self.revision_key)
            .field("token", &"<redacted>")
            .finish()
    }
}
