//! CSV export of rows, for round-tripping records back into an upload.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ReconError;
use crate::model::{Record, Row};

/// Prepended so spreadsheet apps open the file as UTF-8.
pub const UTF8_BOM: &str = "\u{feff}";

/// Write `rows` as CSV projected onto `headers` (absent fields are empty).
///
/// With no `headers`, the first row's field order is used.
pub fn export_csv(rows: &[Row], headers: &[String]) -> Result<String, ReconError> {
    let first = rows.first().ok_or(ReconError::NothingToExport)?;

    let columns: Vec<String> = if headers.is_empty() {
        first.field_names().map(String::from).collect()
    } else {
        headers.to_vec()
    };

    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&columns)?;
    for row in rows {
        writer.write_record(
            columns
                .iter()
                .map(|c| row.field_text(c).map(|v| v.into_owned()).unwrap_or_default()),
        )?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ReconError::Io(e.to_string()))?;
    let body = String::from_utf8(bytes).map_err(|e| ReconError::Io(e.to_string()))?;

    Ok(format!("{UTF8_BOM}{body}"))
}

/// File name for an export titled `title`: whitespace runs become `_`.
pub fn export_file_name(title: &str) -> String {
    format!("{}.csv", whitespace_run().replace_all(title, "_"))
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}
