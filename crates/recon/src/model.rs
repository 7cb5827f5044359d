use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Field access
// ---------------------------------------------------------------------------

/// Read access to a record's fields by name.
///
/// `None` means the field is absent. Key derivation treats absent fields
/// (and JSON nulls) as the empty string, so no record shape is ever rejected.
pub trait Record {
    fn field_text(&self, name: &str) -> Option<Cow<'_, str>>;
}

/// Render a JSON value the way it reads in a CSV cell.
///
/// Strings are returned as is, numbers in their shortest form (`1`, `1.5`),
/// booleans as `true`/`false`. Null is absent. Arrays and objects fall back
/// to compact JSON.
pub fn value_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Bool(true) => Some(Cow::Borrowed("true")),
        Value::Bool(false) => Some(Cow::Borrowed("false")),
        Value::Number(n) => Some(Cow::Owned(number_text(n))),
        other => Some(Cow::Owned(other.to_string())),
    }
}

/// Integral floats render without a fraction (`1.0` reads as `1`), so a
/// dump that stores whole numbers as floats still keys like the CSV cell.
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f == 0.0 => "0".to_string(),
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
        _ => n.to_string(),
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn field_text(&self, name: &str) -> Option<Cow<'_, str>> {
        (**self).field_text(name)
    }
}

impl Record for Map<String, Value> {
    fn field_text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).and_then(value_text)
    }
}

impl Record for HashMap<String, String> {
    fn field_text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|s| Cow::Borrowed(s.as_str()))
    }
}

impl Record for BTreeMap<String, String> {
    fn field_text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|s| Cow::Borrowed(s.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// One uploaded or persisted record: field name to untyped scalar.
///
/// Field order is insertion order, which is the CSV header order for uploaded
/// rows and the JSON key order for existing ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl Record for Row {
    fn field_text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.0.field_text(name)
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A record tagged with its zero-based position in the uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Numbered<R> {
    pub position: usize,
    pub row: R,
}

impl<R: Record> Record for Numbered<R> {
    fn field_text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.row.field_text(name)
    }
}

pub fn number_rows<R>(rows: Vec<R>) -> Vec<Numbered<R>> {
    rows.into_iter()
        .enumerate()
        .map(|(position, row)| Numbered { position, row })
        .collect()
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Which fields group rows together and which field identifies a persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpec {
    pub compare_keys: Vec<String>,
    pub identity_key: String,
}

impl MatchSpec {
    pub fn new<S: Into<String>>(
        compare_keys: impl IntoIterator<Item = S>,
        identity_key: impl Into<String>,
    ) -> Self {
        Self {
            compare_keys: compare_keys.into_iter().map(Into::into).collect(),
            identity_key: identity_key.into(),
        }
    }
}

/// Two or more incoming rows sharing one derived key.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup<'a, R> {
    pub key: String,
    pub rows: Vec<&'a R>,
    /// Zero-based input positions of `rows`, ascending.
    pub positions: Vec<usize>,
}

impl<R> DuplicateGroup<'_, R> {
    pub fn occurrences(&self) -> usize {
        self.rows.len()
    }
}

/// An incoming row paired with the existing row it is taken to update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowMatch<I, E> {
    pub existing: E,
    pub incoming: I,
    pub identity_key: String,
    /// `None` when the existing row has no value under `identity_key`.
    pub identity_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileResult<I, E> {
    pub new_rows: Vec<I>,
    pub matched_rows: Vec<RowMatch<I, E>>,
}

impl<I, E> Default for ReconcileResult<I, E> {
    fn default() -> Self {
        Self {
            new_rows: Vec::new(),
            matched_rows: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Row status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    New,
    Updated,
    NoChange,
    Duplicate,
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Updated => write!(f, "updated"),
            Self::NoChange => write!(f, "no_change"),
            Self::Duplicate => write!(f, "duplicate"),
        }
    }
}

/// Status of one uploaded row, in upload order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowReport {
    pub position: usize,
    pub status: RowStatus,
    pub row: Row,
    /// Identity of the matched existing row, as stored there.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_value: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub new: usize,
    pub updated: usize,
    pub no_change: usize,
    pub duplicate: usize,
}

impl StatusSummary {
    /// True when the upload would create or update at least one record.
    pub fn has_changes(&self) -> bool {
        self.new + self.updated > 0
    }
}

// ---------------------------------------------------------------------------
// Plan + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PlanMeta {
    pub profile_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub overwrite: bool,
}

/// Everything a caller needs to drive create/update calls for one upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadPlan {
    pub meta: PlanMeta,
    pub summary: StatusSummary,
    pub rows: Vec<RowReport>,
    /// Rows to create, in upload order.
    pub creates: Vec<Row>,
    /// Rows to update, each carrying the identity field of its target.
    /// Empty unless the run allowed overwrites.
    pub updates: Vec<Row>,
}
