//! Error types for the revision engine.

use crate::types::{RecordId, RevisionKey};
use thiserror::Error;

/// Main error type for revision operations.
#[derive(Debug, Error)]
pub enum RevisionError {
    #[error("Revision not found: record {record_id}, revision {revision_key}")]
    RevisionNotFound {
        record_id: RecordId,
        revision_key: RevisionKey,
    },

    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Updating record {record_id} failed: {source}")]
    UpdateFailed {
        record_id: RecordId,
        #[source]
        source: Box<RevisionError>,
    },

    #[error("Invalid restore request: {0}")]
    InvalidRequest(String),

    #[error("Meta store error: {0}")]
    MetaStore(String),

    #[error("Record store error: {0}")]
    RecordStore(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },
}

impl RevisionError {
    /// True for both missing revisions and missing records.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RevisionError::RevisionNotFound { .. } | RevisionError::RecordNotFound(_)
        )
    }
}

impl From<serde_json::Error> for RevisionError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            RevisionError::Deserialization(e.to_string())
        } else {
            RevisionError::Serialization(e.to_string())
        }
    }
}

impl From<rmp_serde::encode::Error> for RevisionError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        RevisionError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for RevisionError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        RevisionError::Deserialization(e.to_string())
    }
}

/// Result type for revision operations.
pub type Result<T> = std::result::Result<T, RevisionError>;
