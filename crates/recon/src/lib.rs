//! `bulkup-recon`: bulk-upload reconciliation engine.
//!
//! Pure engine crate: receives parsed upload rows and persisted rows, returns
//! duplicate groups, new/matched classification and an upload plan.
//! No CLI or network dependencies; file loading takes already-read strings.

pub mod config;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod export;
pub mod key;
pub mod matcher;
pub mod model;
pub mod status;

pub use config::{NormalizeConfig, UploadProfile};
pub use duplicates::{find_duplicate_groups, DuplicateReport};
pub use engine::{run, RunOptions, RunOutcome};
pub use error::ReconError;
pub use key::derive_key;
pub use matcher::{reconcile, reconcile_normalized};
pub use model::{DuplicateGroup, MatchSpec, ReconcileResult, Record, Row, RowMatch, RowStatus, UploadPlan};
