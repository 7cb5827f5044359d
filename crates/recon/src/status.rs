//! Per-row upload status.
//!
//! After reconciliation each uploaded row is tagged:
//! - `duplicate`: another uploaded row has the same compare key and the same
//!   trimmed value in every field,
//! - `updated`: matched, and some non-compare-key field differs,
//! - `no_change`: matched, nothing differs,
//! - `new`: no existing row to pair with.

use crate::key::{derive_key, group_by_key};
use crate::model::{Numbered, ReconcileResult, Record, Row, RowReport, RowStatus, StatusSummary};

fn trimmed(row: &Row, name: &str) -> String {
    row.field_text(name)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// True when every field of `candidate` has the same trimmed text in `row`.
pub fn rows_identical(candidate: &Row, row: &Row) -> bool {
    candidate
        .field_names()
        .all(|name| trimmed(candidate, name) == trimmed(row, name))
}

/// Flag rows that are exact repeats of another row with the same key.
///
/// Returns one flag per input row, by position.
pub fn true_duplicate_flags(rows: &[Row], compare_keys: &[String]) -> Vec<bool> {
    let mut flags = vec![false; rows.len()];
    let groups = group_by_key(rows.iter().enumerate(), |&(_, row)| derive_key(row, compare_keys));

    for group in groups.iter().filter(|g| g.items.len() > 1) {
        for &(pos, row) in &group.items {
            let identical = group
                .items
                .iter()
                .filter(|&&(_, candidate)| rows_identical(candidate, row))
                .count();
            if identical > 1 {
                flags[pos] = true;
            }
        }
    }

    flags
}

/// Fields outside the compare key whose trimmed text differs between the
/// uploaded row and the existing one, in upload field order.
pub fn changed_fields(existing: &Row, incoming: &Row, compare_keys: &[String]) -> Vec<String> {
    incoming
        .field_names()
        .filter(|name| !compare_keys.iter().any(|k| k.as_str() == *name))
        .filter(|name| trimmed(existing, name) != trimmed(incoming, name))
        .map(|name| name.to_string())
        .collect()
}

/// Turn a reconciliation over position-tagged rows into per-row reports,
/// sorted back into upload order.
pub fn classify(
    result: ReconcileResult<Numbered<Row>, Row>,
    duplicate_flags: &[bool],
    compare_keys: &[String],
) -> Vec<RowReport> {
    let is_duplicate = |pos: usize| duplicate_flags.get(pos).copied().unwrap_or(false);

    let mut reports = Vec::with_capacity(result.new_rows.len() + result.matched_rows.len());

    for numbered in result.new_rows {
        let status = if is_duplicate(numbered.position) {
            RowStatus::Duplicate
        } else {
            RowStatus::New
        };
        reports.push(RowReport {
            position: numbered.position,
            status,
            row: numbered.row,
            identity_value: None,
            changed_fields: Vec::new(),
        });
    }

    for m in result.matched_rows {
        let position = m.incoming.position;
        let identity_value = m
            .existing
            .get(&m.identity_key)
            .filter(|v| !v.is_null())
            .cloned();
        let changed = changed_fields(&m.existing, &m.incoming.row, compare_keys);
        let status = if is_duplicate(position) {
            RowStatus::Duplicate
        } else if changed.is_empty() {
            RowStatus::NoChange
        } else {
            RowStatus::Updated
        };
        reports.push(RowReport {
            position,
            status,
            row: m.incoming.row,
            identity_value,
            changed_fields: changed,
        });
    }

    reports.sort_by_key(|r| r.position);
    reports
}

pub fn summarize(reports: &[RowReport]) -> StatusSummary {
    let mut summary = StatusSummary {
        total: reports.len(),
        ..StatusSummary::default()
    };

    for r in reports {
        match r.status {
            RowStatus::New => summary.new += 1,
            RowStatus::Updated => summary.updated += 1,
            RowStatus::NoChange => summary.no_change += 1,
            RowStatus::Duplicate => summary.duplicate += 1,
        }
    }

    summary
}
