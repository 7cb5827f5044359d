// bulkup CLI - duplicate checks and upload planning for bulk CSV uploads

mod exit_codes;
mod export;
mod upload;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bulkup_recon::{ReconError, UploadProfile};
use clap::{ArgAction, Parser, Subcommand};

use exit_codes::{recon_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "bulkup")]
#[command(about = "Check and plan bulk CSV uploads against existing records")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log engine decisions (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile an upload against existing records and plan creates/updates
    #[command(after_help = "\
Examples:
  bulkup plan isl.profile.toml --incoming upload.csv --existing videos.json
  bulkup plan isl.profile.toml --incoming upload.csv --existing videos.json --overwrite --json
  bulkup plan isl.profile.toml --incoming upload.csv --output plan.json

Exit codes:
  0  plan has new or updated rows
  3  upload repeats a compare-key combination
  4  upload lacks required columns
  6  nothing to upload")]
    Plan {
        /// Path to the upload profile (.toml)
        profile: PathBuf,

        /// Uploaded CSV file
        #[arg(long)]
        incoming: PathBuf,

        /// Existing records as JSON (array, or object with `records`)
        #[arg(long)]
        existing: Option<PathBuf>,

        /// Plan updates for matched rows whose fields changed
        #[arg(long)]
        overwrite: bool,

        /// Plan even when compare keys repeat; exact repeats are marked `duplicate`
        #[arg(long)]
        allow_duplicates: bool,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Check an upload for repeated compare-key combinations only
    #[command(after_help = "\
Examples:
  bulkup check isl.profile.toml --incoming upload.csv
  bulkup check isl.profile.toml --incoming upload.csv --json")]
    Check {
        /// Path to the upload profile (.toml)
        profile: PathBuf,

        /// Uploaded CSV file
        #[arg(long)]
        incoming: PathBuf,

        /// Output the duplicate report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate an upload profile without running
    #[command(after_help = "\
Examples:
  bulkup validate isl.profile.toml")]
    Validate {
        /// Path to the upload profile (.toml)
        profile: PathBuf,
    },

    /// Re-export rows as an upload-ready CSV
    #[command(after_help = "\
Examples:
  bulkup export isl.profile.toml --input videos.json
  bulkup export isl.profile.toml --input upload.csv --output cleaned.csv")]
    Export {
        /// Path to the upload profile (.toml)
        profile: PathBuf,

        /// Rows to export (.csv upload or .json existing records)
        #[arg(long)]
        input: PathBuf,

        /// Output file (default: profile name with `.csv`, in the current directory)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  bulkup-recon ", env!("CARGO_PKG_VERSION"),
    )
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Plan {
            profile,
            incoming,
            existing,
            overwrite,
            allow_duplicates,
            json,
            output,
        } => upload::cmd_plan(upload::PlanArgs {
            profile,
            incoming,
            existing,
            overwrite,
            allow_duplicates,
            json,
            output,
        }),
        Commands::Check { profile, incoming, json } => upload::cmd_check(profile, incoming, json),
        Commands::Validate { profile } => cmd_validate(profile),
        Commands::Export { profile, input, output } => export::cmd_export(profile, input, output),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn cmd_validate(profile_path: PathBuf) -> Result<(), CliError> {
    let profile = load_profile(&profile_path)?;
    eprintln!(
        "valid: profile '{}' comparing on {} with identity '{}', {} required header(s)",
        profile.name,
        profile.compare_keys.join(" + "),
        profile.identity_key,
        profile.required_headers.len(),
    );
    Ok(())
}

// =============================================================================
// Shared helpers
// =============================================================================

pub(crate) fn read_input(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::args(format!("cannot read {}: {e}", path.display())))
}

pub(crate) fn load_profile(path: &Path) -> Result<UploadProfile, CliError> {
    let text = read_input(path)?;
    let profile = UploadProfile::from_toml(&text).map_err(|e| CliError::recon(e).context(path))?;
    log::debug!(
        "profile '{}' from {}: compare keys [{}], identity '{}'",
        profile.name,
        path.display(),
        profile.compare_keys.join(", "),
        profile.identity_key,
    );
    Ok(profile)
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from engine error with proper exit code.
    pub fn recon(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::MissingColumns(_) => {
                Some("header names are matched exactly after trimming; check spelling and case".to_string())
            }
            ReconError::ExistingFormat(_) => {
                Some("existing records must be a JSON array of objects, or {\"records\": [...]}".to_string())
            }
            ReconError::ConfigValidation(_) => Some("run `bulkup validate <profile>` after editing".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Prefix the message with the file it came from.
    pub fn context(mut self, path: &Path) -> Self {
        self.message = format!("{}: {}", path.display(), self.message);
        self
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
