//! Structured comparison of a revision against the current record.

use super::loose_eq;
use crate::types::{Delta, FieldKey, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One field that differs between a revision and the current record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub key: FieldKey,
    /// Value captured by the revision.
    pub revision_value: Value,
    /// Current value (`None` if the record no longer has the field).
    pub current_value: Option<Value>,
}

/// Form fields of `delta` whose value differs from `current`.
///
/// Record-level attributes are skipped; only form fields are rendered.
pub fn compare(delta: &Delta, current: &Record) -> Vec<FieldChange> {
    delta
        .iter()
        .filter(|(key, _)| key.is_field())
        .filter_map(|(key, revision_value)| {
            let current_value = current.get(key);
            let unchanged = current_value.map_or(false, |cv| loose_eq(revision_value, cv));
            if unchanged {
                None
            } else {
                Some(FieldChange {
                    key: key.clone(),
                    revision_value: revision_value.clone(),
                    current_value: current_value.cloned(),
                })
            }
        })
        .collect()
}
