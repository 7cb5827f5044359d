use std::collections::HashMap;

use crate::key::{derive_key, group_by_key};
use crate::model::{MatchSpec, ReconcileResult, Record, RowMatch};

/// Classify incoming rows as new or as updates to existing rows.
///
/// Same as [`reconcile_normalized`] with no normalization on either side.
pub fn reconcile<I, E>(incoming: Vec<I>, existing: Vec<E>, spec: &MatchSpec) -> ReconcileResult<I, E>
where
    I: Record,
    E: Record,
{
    reconcile_normalized(incoming, existing, spec, |r| r, |r| r)
}

/// Classify incoming rows as new or as updates to existing rows.
///
/// Each row is normalized exactly once, then both populations are grouped by
/// derived key. Within a key, the n-th incoming row pairs with the n-th
/// existing row; incoming rows past the end of the existing group are new.
/// Existing rows nobody pairs with are dropped: this never plans deletions.
///
/// Output order follows the incoming groups in first-appearance order.
pub fn reconcile_normalized<I, E, NI, NE>(
    incoming: Vec<I>,
    existing: Vec<E>,
    spec: &MatchSpec,
    mut normalize_incoming: NI,
    mut normalize_existing: NE,
) -> ReconcileResult<I, E>
where
    I: Record,
    E: Record,
    NI: FnMut(I) -> I,
    NE: FnMut(E) -> E,
{
    let keys = &spec.compare_keys;

    let incoming_groups = group_by_key(incoming.into_iter().map(&mut normalize_incoming), |r| {
        derive_key(r, keys)
    });

    let mut existing_groups: HashMap<String, Vec<E>> = group_by_key(
        existing.into_iter().map(&mut normalize_existing),
        |r| derive_key(r, keys),
    )
    .into_iter()
    .map(|g| (g.key, g.items))
    .collect();

    let mut result = ReconcileResult::default();

    for group in incoming_groups {
        let mut candidates = existing_groups.remove(&group.key).unwrap_or_default().into_iter();

        for row in group.items {
            match candidates.next() {
                Some(existing_row) => {
                    let identity_value = existing_row
                        .field_text(&spec.identity_key)
                        .map(|v| v.into_owned());
                    result.matched_rows.push(RowMatch {
                        existing: existing_row,
                        incoming: row,
                        identity_key: spec.identity_key.clone(),
                        identity_value,
                    });
                }
                None => result.new_rows.push(row),
            }
        }
    }

    log::debug!(
        "reconciled: {} new, {} matched, {} existing key(s) untouched",
        result.new_rows.len(),
        result.matched_rows.len(),
        existing_groups.len()
    );

    result
}
