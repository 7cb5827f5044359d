//! Derived grouping keys.
//!
//! Every row gets one key built from its compare-key fields. Uploaded and
//! existing rows must go through the same derivation or nothing matches.

use std::collections::HashMap;

use crate::model::Record;

/// Joins per-field key parts. Not expected to occur in real data.
pub const KEY_SEPARATOR: &str = "__";

/// Trim and lower-case one field value.
pub fn normalize_part(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Build the grouping key for `row` from `compare_keys`, in order.
///
/// Absent fields contribute an empty part, so this never fails.
pub fn derive_key<R, S>(row: &R, compare_keys: &[S]) -> String
where
    R: Record + ?Sized,
    S: AsRef<str>,
{
    compare_keys
        .iter()
        .map(|k| {
            row.field_text(k.as_ref())
                .map(|v| normalize_part(&v))
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Items sharing one derived key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyGroup<T> {
    pub key: String,
    pub items: Vec<T>,
}

/// Group items by key. Groups come out in the order their key was first
/// seen; items keep their input order within a group.
pub fn group_by_key<T, F>(items: impl IntoIterator<Item = T>, mut key_of: F) -> Vec<KeyGroup<T>>
where
    F: FnMut(&T) -> String,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<KeyGroup<T>> = Vec::new();

    for item in items {
        let key = key_of(&item);
        match index.get(&key) {
            Some(&i) => groups[i].items.push(item),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(KeyGroup {
                    key,
                    items: vec![item],
                });
            }
        }
    }

    groups
}
