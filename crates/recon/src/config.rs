use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ReconError;
use crate::model::{MatchSpec, Row};

// ---------------------------------------------------------------------------
// Top-level profile
// ---------------------------------------------------------------------------

/// How one record type (ISL videos, languages, licenses, ...) is uploaded.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadProfile {
    pub name: String,
    /// Fields whose normalized values identify a record within a resource.
    pub compare_keys: Vec<String>,
    /// Field on persisted records used to target updates.
    pub identity_key: String,
    /// Headers the uploaded CSV must carry. Also the export column order.
    #[serde(default)]
    pub required_headers: Vec<String>,
    /// Applied to every uploaded row before anything else.
    #[serde(default)]
    pub incoming: NormalizeConfig,
    /// Applied to every persisted row before matching.
    #[serde(default)]
    pub existing: NormalizeConfig,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Declarative row reshaping: rename, then project, then trim.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NormalizeConfig {
    /// Source field name to target field name.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    /// Keep only these fields, in this order. Absent fields are not invented.
    #[serde(default)]
    pub keep: Option<Vec<String>>,
    /// Trim surrounding whitespace from string values.
    #[serde(default)]
    pub trim_values: bool,
}

impl NormalizeConfig {
    pub fn is_identity(&self) -> bool {
        self.rename.is_empty() && self.keep.is_none() && !self.trim_values
    }

    /// The field name that `rename` turns into `target`, or `target` itself.
    pub fn source_name<'a>(&'a self, target: &'a str) -> &'a str {
        self.rename
            .iter()
            .find(|(_, to)| to.as_str() == target)
            .map_or(target, |(from, _)| from.as_str())
    }

    pub fn apply(&self, row: Row) -> Row {
        if self.is_identity() {
            return row;
        }

        let renamed: Row = row
            .into_inner()
            .into_iter()
            .map(|(name, value)| match self.rename.get(&name) {
                Some(target) => (target.clone(), value),
                None => (name, value),
            })
            .collect();

        let projected = match &self.keep {
            Some(keep) => keep
                .iter()
                .filter_map(|name| renamed.get(name).map(|v| (name.clone(), v.clone())))
                .collect(),
            None => renamed,
        };

        if !self.trim_values {
            return projected;
        }

        projected
            .into_inner()
            .into_iter()
            .map(|(name, value)| match value {
                Value::String(s) => (name, Value::String(s.trim().to_string())),
                other => (name, other),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl UploadProfile {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let profile: UploadProfile =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.compare_keys.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one compare key is required".into(),
            ));
        }

        for (i, key) in self.compare_keys.iter().enumerate() {
            if key.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "compare key #{} is blank",
                    i + 1
                )));
            }
            if self.compare_keys[..i].contains(key) {
                return Err(ReconError::ConfigValidation(format!(
                    "compare key '{key}' is listed twice"
                )));
            }
        }

        if self.identity_key.trim().is_empty() {
            return Err(ReconError::ConfigValidation("identity_key is blank".into()));
        }

        if self.required_headers.iter().any(|h| h.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "required_headers contains a blank name".into(),
            ));
        }

        if !self.required_headers.is_empty() {
            for key in &self.compare_keys {
                if !self.required_headers.contains(key) {
                    log::warn!(
                        "profile '{}': compare key '{key}' is not a required header; rows without it all share one key part",
                        self.name
                    );
                }
            }
        }

        Ok(())
    }

    /// `required_headers` as they must appear in the uploaded file, i.e.
    /// before `[incoming.rename]` maps them to field names.
    pub fn upload_headers(&self) -> Vec<String> {
        self.required_headers
            .iter()
            .map(|h| self.incoming.source_name(h).to_string())
            .collect()
    }

    pub fn match_spec(&self) -> MatchSpec {
        MatchSpec::new(self.compare_keys.iter().cloned(), self.identity_key.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
