//! Field-level diffing of record snapshots.
//!
//! [`diff`] walks the keys of the *old* snapshot only and keeps every value
//! that is not loosely equal to the new one. Keys that only exist in the new
//! snapshot are never reported, so a revision records what was overwritten or
//! removed, not what was added.

mod compare;
mod loose;

pub use compare::{compare, FieldChange};
pub use loose::{is_numeric, loose_eq};

use crate::types::{Delta, FieldKey, Record};
use serde_json::Value;
use std::collections::BTreeMap;

/// Old values of every key in `old` whose value differs in `new`.
///
/// A key missing from `new` counts as changed.
pub fn diff(old: &Record, new: &Record) -> Delta {
    diff_values(&old.values, &new.values)
}

/// [`diff`] over bare value maps.
pub fn diff_values(old: &BTreeMap<FieldKey, Value>, new: &BTreeMap<FieldKey, Value>) -> Delta {
    old.iter()
        .filter(|(key, old_value)| match new.get(*key) {
            Some(new_value) => !loose_eq(old_value, new_value),
            None => true,
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
