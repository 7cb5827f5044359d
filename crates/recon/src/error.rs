use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Profile validation error (empty compare keys, blank identity key, etc.).
    ConfigValidation(String),
    /// Uploaded CSV lacks required header(s), listed in profile order.
    MissingColumns(Vec<String>),
    /// Malformed CSV (ragged row, bad quoting, invalid UTF-8).
    Csv { line: Option<u64>, message: String },
    /// Malformed JSON in the existing-rows dump.
    Json(String),
    /// Existing-rows JSON parsed but is not an array of objects.
    ExistingFormat(String),
    /// Export requested with no rows.
    NothingToExport,
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "profile parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "profile validation error: {msg}"),
            Self::MissingColumns(cols) => {
                write!(f, "missing required columns: {}", cols.join(", "))
            }
            Self::Csv { line: Some(line), message } => {
                write!(f, "CSV parse error at line {line}: {message}")
            }
            Self::Csv { line: None, message } => write!(f, "CSV parse error: {message}"),
            Self::Json(msg) => write!(f, "JSON parse error: {msg}"),
            Self::ExistingFormat(msg) => write!(f, "existing rows: {msg}"),
            Self::NothingToExport => write!(f, "no data available to export"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<csv::Error> for ReconError {
    fn from(e: csv::Error) -> Self {
        let line = e.position().map(|p| p.line());
        Self::Csv {
            line,
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for ReconError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}
