//! Serialized form of a revision log.
//!
//! Layout: magic (4) + version (1) + encoding (1) + payload length (u32 LE)
//! + payload + crc32 of payload (u32 LE). The payload is the revision
//! sequence, oldest-first.
//!
//! Blobs without the magic prefix are legacy JSON. Either form may hold a
//! single bare revision object instead of a sequence; it decodes as a
//! one-element log. New blobs always hold a sequence.

use super::log::RevisionLog;
use crate::error::{Result, RevisionError};
use crate::types::Revision;
use serde::{Deserialize, Serialize};

/// Magic bytes for revision log blobs.
const LOG_MAGIC: &[u8; 4] = b"RVL\0";

/// Current blob format version.
const LOG_VERSION: u8 = 1;

/// magic + version + encoding + payload length
const HEADER_SIZE: usize = 4 + 1 + 1 + 4;

const CHECKSUM_SIZE: usize = 4;

/// Payload encoding of a revision log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEncoding {
    MessagePack,
    Json,
}

impl Default for LogEncoding {
    fn default() -> Self {
        LogEncoding::MessagePack
    }
}

impl LogEncoding {
    fn to_byte(self) -> u8 {
        match self {
            LogEncoding::MessagePack => 1,
            LogEncoding::Json => 0,
        }
    }

    fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(LogEncoding::Json),
            1 => Ok(LogEncoding::MessagePack),
            other => Err(RevisionError::InvalidFormat(format!(
                "Unknown log encoding: {}",
                other
            ))),
        }
    }
}

/// Either shape a stored log may take.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredLog {
    Many(Vec<Revision>),
    One(Revision),
}

impl From<StoredLog> for RevisionLog {
    fn from(stored: StoredLog) -> Self {
        match stored {
            StoredLog::Many(revisions) => RevisionLog::from_oldest_first(revisions),
            StoredLog::One(revision) => RevisionLog::from_oldest_first(vec![revision]),
        }
    }
}

/// Serialize a log into a blob.
pub fn encode(log: &RevisionLog, encoding: LogEncoding) -> Result<Vec<u8>> {
    let payload = match encoding {
        LogEncoding::Json => serde_json::to_vec(log.as_slice())
            .map_err(|e| RevisionError::Serialization(e.to_string()))?,
        LogEncoding::MessagePack => rmp_serde::to_vec_named(log.as_slice())?,
    };

    let mut blob = Vec::with_capacity(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    blob.extend_from_slice(LOG_MAGIC);
    blob.push(LOG_VERSION);
    blob.push(encoding.to_byte());
    blob.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    blob.extend_from_slice(&payload);
    blob.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    Ok(blob)
}

/// Deserialize a blob into a log.
pub fn decode(blob: &[u8]) -> Result<RevisionLog> {
    if !blob.starts_with(LOG_MAGIC) {
        let stored: StoredLog = serde_json::from_slice(blob)
            .map_err(|e| RevisionError::Deserialization(e.to_string()))?;
        return Ok(stored.into());
    }

    if blob.len() < HEADER_SIZE + CHECKSUM_SIZE {
        return Err(RevisionError::InvalidFormat("Truncated log header".into()));
    }

    let version = blob[4];
    if version != LOG_VERSION {
        return Err(RevisionError::InvalidFormat(format!(
            "Unsupported log version: {}",
            version
        )));
    }

    let encoding = LogEncoding::from_byte(blob[5])?;

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&blob[6..HEADER_SIZE]);
    let payload_len = u32::from_le_bytes(len_bytes) as usize;

    if blob.len() != HEADER_SIZE + payload_len + CHECKSUM_SIZE {
        return Err(RevisionError::InvalidFormat(format!(
            "Payload length {} does not match blob size {}",
            payload_len,
            blob.len()
        )));
    }

    let payload = &blob[HEADER_SIZE..HEADER_SIZE + payload_len];

    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&blob[HEADER_SIZE + payload_len..]);
    let expected = u32::from_le_bytes(crc_bytes);
    let got = crc32fast::hash(payload);
    if expected != got {
        return Err(RevisionError::ChecksumMismatch { expected, got });
    }

    let stored: StoredLog = match encoding {
        LogEncoding::Json => serde_json::from_slice(payload)
            .map_err(|e| RevisionError::Deserialization(e.to_string()))?,
        LogEncoding::MessagePack => rmp_serde::from_slice(payload)?,
    };
    Ok(stored.into())
}
