//! Core types for the revision engine.

use crate::diff::is_numeric;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Stable identifier of a record under revision control.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the actor that authored a change (0 = anonymous).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({})", self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Seconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current UTC time.
    pub fn now() -> Self {
        let secs = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(e) => -(e.duration().as_secs() as i64),
        };
        Timestamp(secs)
    }

    /// Shift by a UTC offset in seconds.
    pub fn offset_by(self, secs: i64) -> Self {
        Timestamp(self.0 + secs)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Lookup key of a revision within one record's log: its `created_at_gmt`.
///
/// Two saves within the same clock second produce the same key. Lookups and
/// deletes match the newest revision with that key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionKey(pub i64);

impl fmt::Debug for RevisionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RevisionKey({})", self.0)
    }
}

impl fmt::Display for RevisionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Timestamp> for RevisionKey {
    fn from(ts: Timestamp) -> Self {
        RevisionKey(ts.0)
    }
}

/// Key of a value inside a record.
///
/// Numeric keys (`"1"`, `"4.2"`) name form fields; every other key is a
/// record-level attribute such as `"status"` or `"date_updated"`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldKey(pub String);

impl FieldKey {
    pub fn new(key: impl Into<String>) -> Self {
        FieldKey(key.into())
    }

    /// Whether this key names a form field rather than record metadata.
    pub fn is_field(&self) -> bool {
        is_numeric(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldKey({:?})", self.0)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldKey {
    fn from(s: &str) -> Self {
        FieldKey(s.to_string())
    }
}

impl From<String> for FieldKey {
    fn from(s: String) -> Self {
        FieldKey(s)
    }
}

impl From<u32> for FieldKey {
    fn from(n: u32) -> Self {
        FieldKey(n.to_string())
    }
}

/// Old values of the fields that changed, keyed by field.
pub type Delta = BTreeMap<FieldKey, Value>;

/// A structured record (e.g. a form submission).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identifier.
    pub id: RecordId,

    /// Field values and record-level attributes.
    pub values: BTreeMap<FieldKey, Value>,
}

impl Record {
    /// Create an empty record.
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, key: impl Into<FieldKey>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &FieldKey) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<FieldKey>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Iterate over form fields only.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldKey, &Value)> {
        self.values.iter().filter(|(k, _)| k.is_field())
    }

    /// Iterate over record-level attributes only.
    pub fn meta(&self) -> impl Iterator<Item = (&FieldKey, &Value)> {
        self.values.iter().filter(|(k, _)| !k.is_field())
    }
}

/// Who created a revision and when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionMetadata {
    /// Creation time in the site's local time.
    pub created_at: Timestamp,

    /// Creation time in UTC. Doubles as the revision key.
    pub created_at_gmt: Timestamp,

    /// Actor whose change produced the revision.
    pub author_id: ActorId,
}

impl RevisionMetadata {
    pub fn key(&self) -> RevisionKey {
        RevisionKey::from(self.created_at_gmt)
    }
}

/// One logged delta plus its metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    /// Old values of the fields that changed. Never empty.
    pub delta: Delta,

    pub metadata: RevisionMetadata,
}

impl Revision {
    pub fn key(&self) -> RevisionKey {
        self.metadata.key()
    }

    /// Keys captured by this revision, in key order.
    pub fn changed_keys(&self) -> Vec<FieldKey> {
        self.delta.keys().cloned().collect()
    }
}
