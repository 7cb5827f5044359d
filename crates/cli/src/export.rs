//! `bulkup export`: write rows back out as an upload-ready CSV.

use std::path::{Path, PathBuf};

use bulkup_recon::engine::{load_existing_rows, load_upload_rows};
use bulkup_recon::export::{export_csv, export_file_name};
use bulkup_recon::model::Row;
use bulkup_recon::UploadProfile;

use crate::{load_profile, read_input, CliError};

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Existing records go through the profile's `existing` normalization, so
/// renamed API fields come out under their upload header names.
fn load_rows(path: &Path, profile: &UploadProfile) -> Result<Vec<Row>, CliError> {
    let text = read_input(path)?;
    let rows: Vec<Row> = if is_json(path) {
        load_existing_rows(&text)
            .map_err(|e| CliError::recon(e).context(path))?
            .into_iter()
            .map(|r| profile.existing.apply(r))
            .collect()
    } else {
        load_upload_rows(&text, profile)
            .map_err(|e| CliError::recon(e).context(path))?
            .into_iter()
            .map(|r| profile.incoming.apply(r))
            .collect()
    };
    log::debug!("{}: {} row(s) to export", path.display(), rows.len());
    Ok(rows)
}

pub fn cmd_export(profile_path: PathBuf, input: PathBuf, output: Option<PathBuf>) -> Result<(), CliError> {
    let profile = load_profile(&profile_path)?;
    let rows = load_rows(&input, &profile)?;

    let csv = export_csv(&rows, &profile.required_headers).map_err(CliError::recon)?;

    let path = output.unwrap_or_else(|| PathBuf::from(export_file_name(&profile.name)));
    std::fs::write(&path, csv)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;

    eprintln!("wrote {} row(s) to {}", rows.len(), path.display());
    Ok(())
}
