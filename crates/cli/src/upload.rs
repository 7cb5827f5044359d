//! `bulkup plan` and `bulkup check`: duplicate checks and upload planning.

use std::path::{Path, PathBuf};

use bulkup_recon::engine::{load_existing_rows, load_upload_rows};
use bulkup_recon::model::{Row, UploadPlan};
use bulkup_recon::{find_duplicate_groups, run, DuplicateReport, RunOptions, RunOutcome, UploadProfile};

use crate::exit_codes::{EXIT_DUPLICATES, EXIT_NOTHING_TO_UPLOAD};
use crate::{load_profile, read_input, CliError};

pub struct PlanArgs {
    pub profile: PathBuf,
    pub incoming: PathBuf,
    pub existing: Option<PathBuf>,
    pub overwrite: bool,
    pub allow_duplicates: bool,
    pub json: bool,
    pub output: Option<PathBuf>,
}

fn load_upload(path: &Path, profile: &UploadProfile) -> Result<Vec<Row>, CliError> {
    let csv_data = read_input(path)?;
    let rows = load_upload_rows(&csv_data, profile).map_err(|e| CliError::recon(e).context(path))?;
    log::debug!("{}: {} upload row(s)", path.display(), rows.len());
    Ok(rows)
}

fn load_existing(path: &Path) -> Result<Vec<Row>, CliError> {
    let json = read_input(path)?;
    let rows = load_existing_rows(&json).map_err(|e| CliError::recon(e).context(path))?;
    log::debug!("{}: {} existing record(s)", path.display(), rows.len());
    Ok(rows)
}

fn rejected(report: &DuplicateReport) -> CliError {
    CliError {
        code: EXIT_DUPLICATES,
        message: format!("upload rejected: {} duplicate group(s)", report.len()),
        hint: None,
    }
    .with_hint("fix the rows listed above, or re-run with --allow-duplicates")
}

pub fn cmd_plan(args: PlanArgs) -> Result<(), CliError> {
    let profile = load_profile(&args.profile)?;
    let incoming = load_upload(&args.incoming, &profile)?;
    let existing = match &args.existing {
        Some(path) => load_existing(path)?,
        None => Vec::new(),
    };

    let options = RunOptions {
        overwrite: args.overwrite,
        allow_duplicates: args.allow_duplicates,
    };
    let outcome = run(&profile, incoming, existing, &options);

    // Output
    let json_str = serde_json::to_string_pretty(&outcome)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    }

    match outcome {
        RunOutcome::Rejected(report) => {
            eprint!("{report}");
            Err(rejected(&report))
        }
        RunOutcome::Planned(plan) => {
            print_plan_summary(&plan, args.existing.is_none());
            if plan.summary.has_changes() {
                Ok(())
            } else {
                Err(CliError {
                    code: EXIT_NOTHING_TO_UPLOAD,
                    message: "nothing to upload: every row matches an existing record".into(),
                    hint: None,
                })
            }
        }
    }
}

// Human summary to stderr
fn print_plan_summary(plan: &UploadPlan, first_upload: bool) {
    let s = &plan.summary;
    eprintln!(
        "plan '{}': {} row(s) - {} new, {} updated, {} unchanged, {} duplicate",
        plan.meta.profile_name, s.total, s.new, s.updated, s.no_change, s.duplicate,
    );
    if first_upload {
        eprintln!("no existing records given; every row is new");
    }
    if s.updated > 0 && !plan.meta.overwrite {
        eprintln!(
            "{} changed row(s) will not be sent; pass --overwrite to plan updates",
            s.updated
        );
    } else if plan.meta.overwrite {
        eprintln!("{} create(s), {} update(s)", plan.creates.len(), plan.updates.len());
    }
}

pub fn cmd_check(profile_path: PathBuf, incoming_path: PathBuf, json: bool) -> Result<(), CliError> {
    let profile = load_profile(&profile_path)?;
    let incoming: Vec<Row> = load_upload(&incoming_path, &profile)?
        .into_iter()
        .map(|r| profile.incoming.apply(r))
        .collect();

    let groups = find_duplicate_groups(&incoming, &profile.compare_keys);
    let report = DuplicateReport::new(&groups, &profile.compare_keys);

    if json {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    if report.is_empty() {
        eprintln!(
            "ok: {} row(s), every {} is unique",
            incoming.len(),
            profile.compare_keys.join(" + "),
        );
        Ok(())
    } else {
        eprint!("{report}");
        Err(rejected(&report))
    }
}
