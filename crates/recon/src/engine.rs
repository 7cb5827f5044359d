use serde::Serialize;
use serde_json::Value;

use crate::config::UploadProfile;
use crate::duplicates::{find_duplicate_groups, DuplicateReport};
use crate::error::ReconError;
use crate::matcher::reconcile_normalized;
use crate::model::{number_rows, PlanMeta, Row, RowReport, RowStatus, UploadPlan};
use crate::status::{classify, summarize, true_duplicate_flags};

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Plan updates for matched rows whose fields changed.
    pub overwrite: bool,
    /// Plan even when compare keys repeat; exact repeats are then reported
    /// with `duplicate` status instead of rejecting the upload.
    pub allow_duplicates: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The upload repeats a compare-key combination and must be fixed first.
    Rejected(DuplicateReport),
    Planned(UploadPlan),
}

/// Check an upload for duplicates, reconcile it against existing rows and
/// plan the resulting creates and updates.
///
/// Both row sets go through the profile's normalization first. Rejection on
/// duplicates is a normal outcome, not an error.
pub fn run(
    profile: &UploadProfile,
    incoming: Vec<Row>,
    existing: Vec<Row>,
    options: &RunOptions,
) -> RunOutcome {
    let incoming: Vec<Row> = incoming
        .into_iter()
        .map(|r| profile.incoming.apply(r))
        .collect();

    if !options.allow_duplicates {
        let groups = find_duplicate_groups(&incoming, &profile.compare_keys);
        if !groups.is_empty() {
            let report = DuplicateReport::new(&groups, &profile.compare_keys);
            log::info!(
                "profile '{}': upload rejected, {} duplicate group(s)",
                profile.name,
                report.len()
            );
            return RunOutcome::Rejected(report);
        }
    }

    let flags = true_duplicate_flags(&incoming, &profile.compare_keys);
    let spec = profile.match_spec();
    let existing_normalize = &profile.existing;

    let result = reconcile_normalized(
        number_rows(incoming),
        existing,
        &spec,
        |r| r,
        |r| existing_normalize.apply(r),
    );

    let rows = classify(result, &flags, &profile.compare_keys);
    let summary = summarize(&rows);

    let creates: Vec<Row> = rows
        .iter()
        .filter(|r| r.status == RowStatus::New)
        .map(|r| r.row.clone())
        .collect();

    let updates = if options.overwrite {
        build_updates(&rows, &profile.identity_key)
    } else {
        Vec::new()
    };

    log::debug!(
        "profile '{}': {} create(s), {} update(s), {} unchanged",
        profile.name,
        creates.len(),
        updates.len(),
        summary.no_change
    );

    RunOutcome::Planned(UploadPlan {
        meta: PlanMeta {
            profile_name: profile.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            overwrite: options.overwrite,
        },
        summary,
        rows,
        creates,
        updates,
    })
}

/// Updated rows with the identity of their target injected.
fn build_updates(rows: &[RowReport], identity_key: &str) -> Vec<Row> {
    rows.iter()
        .filter(|r| r.status == RowStatus::Updated)
        .filter_map(|r| match &r.identity_value {
            Some(id) => {
                let mut row = r.row.clone();
                row.insert(identity_key, id.clone());
                Some(row)
            }
            None => {
                log::warn!(
                    "row {} matched a record without '{identity_key}'; update skipped",
                    r.position + 1
                );
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parse an upload for `profile`, checking required headers under their
/// upload names. Rows are returned raw; `run` normalizes them.
pub fn load_upload_rows(csv_data: &str, profile: &UploadProfile) -> Result<Vec<Row>, ReconError> {
    load_csv_rows(csv_data, &profile.upload_headers())
}

/// Parse an uploaded CSV into rows keyed by (trimmed) header.
///
/// Every header in `required_headers` must be present; all missing ones are
/// reported together, in the order given.
pub fn load_csv_rows(csv_data: &str, required_headers: &[String]) -> Result<Vec<Row>, ReconError> {
    let data = csv_data.strip_prefix('\u{feff}').unwrap_or(csv_data);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let missing: Vec<String> = required_headers
        .iter()
        .filter(|h| !headers.contains(h))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ReconError::MissingColumns(missing));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), Value::String(v.to_string())))
            .collect();
        rows.push(row);
    }

    log::debug!("loaded {} CSV row(s) with {} column(s)", rows.len(), headers.len());
    Ok(rows)
}

/// Parse persisted rows: a JSON array of objects, or an object holding one
/// under `records`.
pub fn load_existing_rows(json: &str) -> Result<Vec<Row>, ReconError> {
    let value: Value = serde_json::from_str(json)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("records") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ReconError::ExistingFormat(
                    "object has no `records` array".into(),
                ))
            }
        },
        other => {
            return Err(ReconError::ExistingFormat(format!(
                "expected an array of objects, found {}",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(Row::from(map)),
            other => Err(ReconError::ExistingFormat(format!(
                "element {i} is {}, not an object",
                json_kind(&other)
            ))),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
