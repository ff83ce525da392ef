//! Scan data model: repository identity, root listings, and the run aggregate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one repository within an organization.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RepoRef {
    pub organization: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(organization: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            name: name.into(),
        }
    }

    /// `org/name` form used in diagnostics.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.organization, self.name)
    }
}

/// Kind of an entry in a repository's root listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    File,
    #[serde(rename = "dir")]
    Directory,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// One entry in a repository's root listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
}

impl ContentEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ContentKind::File,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ContentKind::Directory,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == ContentKind::File
    }
}

/// Outcome of evaluating every registered rule against one repository.
///
/// `results` holds exactly one entry per registered rule id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub repo_name: String,
    pub results: BTreeMap<String, bool>,
}

impl ValidationRecord {
    /// Result for `rule_id`, or `None` if the rule was not registered.
    pub fn result(&self, rule_id: &str) -> Option<bool> {
        self.results.get(rule_id).copied()
    }

    /// Whether every rule passed.
    pub fn compliant(&self) -> bool {
        self.results.values().all(|passed| *passed)
    }
}

/// Column descriptor for a registered rule, in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleColumn {
    pub id: String,
    pub label: String,
}

/// A repository excluded from `records` because its root listing failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRepo {
    pub name: String,
    pub reason: String,
}

/// Aggregate of one completed scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRun {
    pub scan_id: String,
    pub organization: String,
    /// Registered rules in evaluation/column order.
    pub rules: Vec<RuleColumn>,
    /// Records in listing order.
    pub records: Vec<ValidationRecord>,
    pub skipped: Vec<SkippedRepo>,
    pub scanned_count: usize,
    pub errored_count: usize,
    pub pages_fetched: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScanRun {
    /// Number of records where every rule passed.
    pub fn compliant_count(&self) -> usize {
        self.records.iter().filter(|r| r.compliant()).count()
    }

    /// User-visible end-of-run summary.
    pub fn summary_line(&self) -> String {
        format!(
            "Scanned {} repositories in {} ({} errored, {} fully compliant)",
            self.scanned_count,
            self.organization,
            self.errored_count,
            self.compliant_count()
        )
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, results: &[(&str, bool)]) -> ValidationRecord {
        ValidationRecord {
            repo_name: name.to_string(),
            results: results
                .iter()
                .map(|(id, v)| (id.to_string(), *v))
                .collect(),
        }
    }

    #[test]
    fn test_content_entry_deserializes_github_kinds() {
        let entries: Vec<ContentEntry> = serde_json::from_str(
            r#"[
                {"name": "README.md", "type": "file"},
                {"name": "src", "type": "dir"},
                {"name": "link", "type": "symlink"},
                {"name": "vendor", "type": "submodule"},
                {"name": "odd", "type": "something-new"}
            ]"#,
        )
        .expect("deserialize");
        let kinds: Vec<ContentKind> = entries.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ContentKind::File,
                ContentKind::Directory,
                ContentKind::Symlink,
                ContentKind::Submodule,
                ContentKind::Other,
            ]
        );
    }

    #[test]
    fn test_repo_ref_full_name() {
        assert_eq!(RepoRef::new("acme", "api").full_name(), "acme/api");
    }

    #[test]
    fn test_record_compliance() {
        assert!(record("a", &[("x", true), ("y", true)]).compliant());
        assert!(!record("b", &[("x", true), ("y", false)]).compliant());
        assert_eq!(record("c", &[("x", false)]).result("x"), Some(false));
        assert_eq!(record("c", &[("x", false)]).result("missing"), None);
    }

    #[test]
    fn test_summary_line_reports_counts() {
        let now = Utc::now();
        let run = ScanRun {
            scan_id: "s".into(),
            organization: "acme".into(),
            rules: vec![],
            records: vec![record("a", &[("x", true)]), record("b", &[("x", false)])],
            skipped: vec![SkippedRepo {
                name: "c".into(),
                reason: "gone".into(),
            }],
            scanned_count: 2,
            errored_count: 1,
            pages_fetched: 1,
            started_at: now,
            finished_at: now,
        };
        let line = run.summary_line();
        assert!(line.contains("Scanned 2 repositories in acme"));
        assert!(line.contains("1 errored"));
        assert!(line.contains("1 fully compliant"));
    }
}
