use std::path::PathBuf;

use bulkup_recon::engine::{load_csv_rows, load_existing_rows, load_upload_rows, run, RunOptions, RunOutcome};
use bulkup_recon::export::export_csv;
use bulkup_recon::model::{RowStatus, UploadPlan};
use bulkup_recon::{DuplicateReport, UploadProfile};
use serde_json::json;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn read_fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

fn load_and_run(profile: &str, upload: &str, existing: Option<&str>, options: &RunOptions) -> RunOutcome {
    let profile = UploadProfile::from_toml(&read_fixture(profile)).unwrap();
    let incoming = load_csv_rows(&read_fixture(upload), &profile.required_headers).unwrap();
    let existing = match existing {
        Some(name) => load_existing_rows(&read_fixture(name)).unwrap(),
        None => Vec::new(),
    };
    run(&profile, incoming, existing, options)
}

fn expect_plan(outcome: RunOutcome) -> UploadPlan {
    match outcome {
        RunOutcome::Planned(plan) => plan,
        RunOutcome::Rejected(report) => panic!("unexpected rejection:\n{report}"),
    }
}

fn expect_rejection(outcome: RunOutcome) -> DuplicateReport {
    match outcome {
        RunOutcome::Rejected(report) => report,
        RunOutcome::Planned(plan) => panic!("expected rejection, got plan for {} rows", plan.summary.total),
    }
}

// -------------------------------------------------------------------------
// ISL Bible videos
// -------------------------------------------------------------------------

#[test]
fn isl_upload_against_existing() {
    let plan = expect_plan(load_and_run(
        "isl.profile.toml",
        "isl-upload.csv",
        Some("isl-existing.json"),
        &RunOptions::default(),
    ));

    assert_eq!(plan.summary.total, 5);
    assert_eq!(plan.summary.new, 2);
    assert_eq!(plan.summary.updated, 1);
    assert_eq!(plan.summary.no_change, 2);
    assert_eq!(plan.summary.duplicate, 0);
    assert!(plan.summary.has_changes());

    let statuses: Vec<RowStatus> = plan.rows.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            RowStatus::NoChange,
            RowStatus::Updated,
            RowStatus::NoChange,
            RowStatus::New,
            RowStatus::New,
        ]
    );

    assert_eq!(plan.rows[1].identity_value, Some(json!(102)));
    assert_eq!(plan.rows[1].changed_fields, vec!["title".to_string()]);

    // Trimmed by the profile before anything is planned
    assert_eq!(plan.creates[1].get("book"), Some(&json!("mrk")));

    // Overwrite is off
    assert!(plan.updates.is_empty());
}

#[test]
fn isl_overwrite_targets_identity() {
    let options = RunOptions {
        overwrite: true,
        ..RunOptions::default()
    };
    let plan = expect_plan(load_and_run(
        "isl.profile.toml",
        "isl-upload.csv",
        Some("isl-existing.json"),
        &options,
    ));

    assert_eq!(plan.updates.len(), 1);
    let update = &plan.updates[0];
    assert_eq!(update.get("video_id"), Some(&json!(102)));
    assert_eq!(update.get("title"), Some(&json!("Wedding at Cana")));
    assert_eq!(plan.creates.len(), 2);
}

#[test]
fn isl_first_upload_is_all_new() {
    let plan = expect_plan(load_and_run(
        "isl.profile.toml",
        "isl-upload.csv",
        None,
        &RunOptions::default(),
    ));
    assert_eq!(plan.summary.new, 5);
    assert_eq!(plan.creates.len(), 5);
    assert!(plan.rows.iter().all(|r| r.identity_value.is_none()));
}

#[test]
fn isl_duplicates_reject_upload() {
    let report = expect_rejection(load_and_run(
        "isl.profile.toml",
        "isl-upload-dupes.csv",
        Some("isl-existing.json"),
        &RunOptions::default(),
    ));

    assert_eq!(report.headline, "book + chapter combination must be unique");
    assert_eq!(report.len(), 2);
    assert_eq!(report.entries[0].key, "jhn__1");
    assert_eq!(report.entries[0].display, "JHN, 1");
    assert_eq!(report.entries[0].occurrences, 2);
    assert_eq!(report.entries[1].key, "luk__2");
    assert_eq!(report.entries[1].positions, vec![2, 3, 4]);

    let text = report.to_string();
    assert!(text.contains("1) JHN, 1 (2 occurrences)"));
    assert!(text.contains("2) LUK, 2 (3 occurrences)"));
}

#[test]
fn isl_duplicates_allowed_marks_exact_repeats() {
    let options = RunOptions {
        allow_duplicates: true,
        ..RunOptions::default()
    };
    let plan = expect_plan(load_and_run(
        "isl.profile.toml",
        "isl-upload-dupes.csv",
        Some("isl-existing.json"),
        &options,
    ));

    // The two JHN 1 rows differ, so they are reconciled positionally.
    assert_eq!(plan.rows[0].status, RowStatus::NoChange);
    assert_eq!(plan.rows[1].status, RowStatus::New);
    // The three LUK 2 rows are identical after trimming.
    assert_eq!(plan.summary.duplicate, 3);
    assert_eq!(plan.rows[5].status, RowStatus::New);
}

#[test]
fn missing_required_header_is_an_error() {
    let profile = UploadProfile::from_toml(&read_fixture("isl.profile.toml")).unwrap();
    let err = load_csv_rows("book,chapter,title\nJHN,1,x\n", &profile.required_headers).unwrap_err();
    assert_eq!(err.to_string(), "missing required columns: description, url");
}

// -------------------------------------------------------------------------
// Languages (renamed API fields, wrapped JSON)
// -------------------------------------------------------------------------

#[test]
fn languages_with_renamed_existing_fields() {
    let plan = expect_plan(load_and_run(
        "languages.profile.toml",
        "languages.csv",
        Some("languages-existing.json"),
        &RunOptions {
            overwrite: true,
            ..RunOptions::default()
        },
    ));

    let statuses: Vec<RowStatus> = plan.rows.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![RowStatus::NoChange, RowStatus::Updated, RowStatus::New]);

    assert_eq!(plan.updates.len(), 1);
    assert_eq!(plan.updates[0].get("id"), Some(&json!("lang-2")));
    assert_eq!(plan.updates[0].get("name"), Some(&json!("Hindi")));
    assert_eq!(plan.creates[0].get("code"), Some(&json!("ta")));
}

#[test]
fn languages_sheet_headers_renamed_on_upload() {
    let profile = UploadProfile::from_toml(&read_fixture("languages-sheet.profile.toml")).unwrap();
    let incoming = load_upload_rows(&read_fixture("languages-sheet.csv"), &profile).unwrap();
    let existing = load_existing_rows(&read_fixture("languages-existing.json")).unwrap();
    let plan = expect_plan(run(&profile, incoming, existing, &RunOptions::default()));

    let statuses: Vec<RowStatus> = plan.rows.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![RowStatus::NoChange, RowStatus::Updated, RowStatus::New]);
    assert_eq!(plan.creates[0].get("code"), Some(&json!("ta")));
    assert_eq!(plan.creates[0].get("name"), Some(&json!("Tamil")));
}

#[test]
fn languages_sheet_exports_under_field_names() {
    let profile = UploadProfile::from_toml(&read_fixture("languages-sheet.profile.toml")).unwrap();
    let rows: Vec<_> = load_upload_rows(&read_fixture("languages-sheet.csv"), &profile)
        .unwrap()
        .into_iter()
        .map(|r| profile.incoming.apply(r))
        .collect();

    let csv = export_csv(&rows, &profile.required_headers).unwrap();
    assert_eq!(csv, "\u{feff}code,name\nen,English\nhi,Hindi\nta,Tamil\n");
}

#[test]
fn nothing_to_do_when_reuploading_existing() {
    let profile = UploadProfile::from_toml(&read_fixture("languages.profile.toml")).unwrap();
    let incoming = load_csv_rows("code,name\nEN,English\n", &profile.required_headers).unwrap();
    let existing = load_existing_rows(&read_fixture("languages-existing.json")).unwrap();
    let plan = expect_plan(run(&profile, incoming, existing, &RunOptions::default()));
    assert!(!plan.summary.has_changes());
    assert!(plan.creates.is_empty());
}

// -------------------------------------------------------------------------
// Export
// -------------------------------------------------------------------------

#[test]
fn export_existing_rows_reloads_as_upload() {
    let profile = UploadProfile::from_toml(&read_fixture("isl.profile.toml")).unwrap();
    let existing: Vec<_> = load_existing_rows(&read_fixture("isl-existing.json"))
        .unwrap()
        .into_iter()
        .map(|r| profile.existing.apply(r))
        .collect();

    let csv = export_csv(&existing, &profile.required_headers).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ISL_Bible.csv");
    std::fs::write(&path, &csv).unwrap();

    let reloaded = load_csv_rows(&std::fs::read_to_string(&path).unwrap(), &profile.required_headers).unwrap();
    assert_eq!(reloaded.len(), 4);
    assert!(!reloaded[0].contains("video_id"));

    // Re-uploading an export changes nothing
    let plan = expect_plan(run(&profile, reloaded, existing, &RunOptions::default()));
    assert_eq!(plan.summary.no_change, 4);
    assert!(!plan.summary.has_changes());
}
