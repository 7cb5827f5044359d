//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `bulkup` exit codes.
//! Exit codes are part of the shell contract; upload scripts branch on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified, IO)                      |
//! | 2    | CLI usage error (bad args, unreadable input file)    |
//! | 3    | Upload repeats a compare-key combination             |
//! | 4    | Upload lacks required column(s)                      |
//! | 5    | Parse error (CSV, JSON or TOML syntax)               |
//! | 6    | Nothing to upload (no new or updated rows)           |
//! | 7    | Invalid profile (parsed but failed validation)       |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `recon_exit_code` or the relevant command

use bulkup_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing input file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Upload (3-7)
// =============================================================================

/// Two or more upload rows share a compare-key combination.
pub const EXIT_DUPLICATES: u8 = 3;

/// Uploaded CSV lacks one or more required headers.
pub const EXIT_MISSING_COLUMNS: u8 = 4;

/// Malformed CSV, JSON or TOML.
pub const EXIT_PARSE: u8 = 5;

/// Plan has no new or updated rows. Not a failure, but scripts can skip
/// the upload step.
pub const EXIT_NOTHING_TO_UPLOAD: u8 = 6;

/// Profile parsed but failed validation (empty compare keys, blank identity).
pub const EXIT_INVALID_PROFILE: u8 = 7;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) => EXIT_PARSE,
        ReconError::ConfigValidation(_) => EXIT_INVALID_PROFILE,
        ReconError::MissingColumns(_) => EXIT_MISSING_COLUMNS,
        ReconError::Csv { .. } | ReconError::Json(_) | ReconError::ExistingFormat(_) => EXIT_PARSE,
        ReconError::NothingToExport => EXIT_ERROR,
        ReconError::Io(_) => EXIT_ERROR,
    }
}
