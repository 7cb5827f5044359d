use std::fmt;

use serde::Serialize;

use crate::key::{derive_key, group_by_key};
use crate::model::{DuplicateGroup, Record};

/// Find every derived key shared by two or more rows.
///
/// Groups come out in the order their key first appears; rows keep their
/// input order. Only `rows` is inspected, so callers pass the uploaded
/// population here, never the persisted one.
pub fn find_duplicate_groups<'a, R, S>(rows: &'a [R], compare_keys: &[S]) -> Vec<DuplicateGroup<'a, R>>
where
    R: Record,
    S: AsRef<str>,
{
    let groups = group_by_key(rows.iter().enumerate(), |&(_, row)| derive_key(row, compare_keys));

    let duplicates: Vec<DuplicateGroup<'a, R>> = groups
        .into_iter()
        .filter(|g| g.items.len() > 1)
        .map(|g| {
            let (positions, rows): (Vec<usize>, Vec<&'a R>) = g.items.into_iter().unzip();
            DuplicateGroup {
                key: g.key,
                rows,
                positions,
            }
        })
        .collect();

    if !duplicates.is_empty() {
        log::debug!(
            "{} duplicate key group(s) across {} row(s)",
            duplicates.len(),
            rows.len()
        );
    }

    duplicates
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// User-facing rejection for an upload that repeats a compare-key combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
    pub compare_keys: Vec<String>,
    pub headline: String,
    pub entries: Vec<DuplicateEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateEntry {
    pub key: String,
    /// The first row's compare-key values as typed, joined with `", "`.
    pub display: String,
    pub occurrences: usize,
    pub positions: Vec<usize>,
}

impl DuplicateReport {
    pub fn new<R, S>(groups: &[DuplicateGroup<'_, R>], compare_keys: &[S]) -> Self
    where
        R: Record,
        S: AsRef<str>,
    {
        let compare_keys: Vec<String> = compare_keys.iter().map(|k| k.as_ref().to_string()).collect();

        let headline = if compare_keys.len() > 1 {
            format!("{} combination must be unique", compare_keys.join(" + "))
        } else {
            format!("{} value must be unique", compare_keys.join(""))
        };

        let entries = groups
            .iter()
            .map(|g| DuplicateEntry {
                key: g.key.clone(),
                display: display_values(g.rows.first().copied(), &compare_keys),
                occurrences: g.occurrences(),
                positions: g.positions.clone(),
            })
            .collect();

        Self {
            compare_keys,
            headline,
            entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn display_values<R: Record>(first: Option<&R>, compare_keys: &[String]) -> String {
    let Some(row) = first else {
        return String::new();
    };
    compare_keys
        .iter()
        .map(|k| row.field_text(k).map(|v| v.into_owned()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for DuplicateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}; the upload contains {} repeated {}:",
            self.headline,
            self.entries.len(),
            if self.compare_keys.len() > 1 { "combination(s)" } else { "value(s)" },
        )?;
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(f, "{}) {} ({} occurrences)", i + 1, entry.display, entry.occurrences)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Row;
    use serde_json::json;

    fn rows(v: serde_json::Value) -> Vec<Row> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn one_group_for_repeated_pair() {
        let input = rows(json!([
            {"book": "John", "title": "A"},
            {"book": "John", "title": "A"},
            {"book": "Luke", "title": "B"},
        ]));
        let groups = find_duplicate_groups(&input, &["book", "title"]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "john__a");
        assert_eq!(groups[0].occurrences(), 2);
        assert_eq!(groups[0].positions, vec![0, 1]);
    }

    #[test]
    fn empty_input() {
        let input: Vec<Row> = Vec::new();
        assert!(find_duplicate_groups(&input, &["book"]).is_empty());
    }

    #[test]
    fn case_and_whitespace_collapse() {
        let input = rows(json!([
            {"book": "Mark "},
            {"book": "mark"},
            {"book": " MARK"},
        ]));
        let groups = find_duplicate_groups(&input, &["book"]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].positions, vec![0, 1, 2]);
    }

    #[test]
    fn groups_ordered_by_first_appearance() {
        let input = rows(json!([
            {"book": "Luke"},
            {"book": "John"},
            {"book": "John"},
            {"book": "Luke"},
            {"book": "Acts"},
        ]));
        let groups = find_duplicate_groups(&input, &["book"]);
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["luke", "john"]);
        assert_eq!(groups[0].positions, vec![0, 3]);
    }

    #[test]
    fn absent_compare_key_collapses_everything() {
        let input = rows(json!([
            {"book": "Luke"},
            {"book": "John"},
            {"book": "Acts"},
        ]));
        let groups = find_duplicate_groups(&input, &["language"]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "");
        assert_eq!(groups[0].occurrences(), 3);
    }

    #[test]
    fn report_formats_like_the_upload_dialog() {
        let input = rows(json!([
            {"book": "John", "title": "A"},
            {"book": "john ", "title": "a"},
            {"book": "Luke", "title": "B"},
            {"book": "Luke", "title": "B"},
            {"book": "Luke", "title": "B"},
        ]));
        let keys = ["book", "title"];
        let groups = find_duplicate_groups(&input, &keys);
        let report = DuplicateReport::new(&groups, &keys);

        assert_eq!(report.headline, "book + title combination must be unique");
        assert_eq!(report.len(), 2);
        assert_eq!(report.entries[0].display, "John, A");
        assert_eq!(report.entries[1].occurrences, 3);

        let text = report.to_string();
        assert!(text.contains("1) John, A (2 occurrences)"));
        assert!(text.contains("2) Luke, B (3 occurrences)"));
    }

    #[test]
    fn report_single_key_wording() {
        let input = rows(json!([{"code": "en"}, {"code": "EN"}]));
        let groups = find_duplicate_groups(&input, &["code"]);
        let report = DuplicateReport::new(&groups, &["code"]);
        assert_eq!(report.headline, "code value must be unique");
        assert_eq!(report.entries[0].display, "en");
        assert!(report.to_string().contains("repeated value(s)"));
    }
}
