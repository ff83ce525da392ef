//! Repository hygiene rules.
//!
//! A [`RuleSet`] is an ordered collection of [`RuleDefinition`]s. Each rule is
//! a pure predicate over a repository name and its root listing, and
//! [`RuleSet::evaluate`] produces one boolean per registered rule id. New
//! checks are appended to the set; the scanner never needs to know about them.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CheckError, CheckResult};
use crate::model::{ContentEntry, RuleColumn, ValidationRecord};

/// Canonical editor-config filename used by the standard rule set.
pub const EDITOR_CONFIG_FILE_NAME: &str = ".editorconfig";

pub const RULE_KEBAB_CASE_NAMING: &str = "has_valid_kebab_case_naming";
pub const RULE_README: &str = "has_readme";
pub const RULE_CODE_OWNERS: &str = "has_code_owners";
pub const RULE_EDITOR_CONFIG: &str = "has_editor_config";
pub const RULE_BUILD_GRADLE: &str = "has_build_gradle";
pub const RULE_MAVEN_BUILD: &str = "has_maven_build";

const KEBAB_CASE_PATTERN: &str = r"^[a-z0-9]+(-[a-z0-9]+)*$";

fn kebab_case_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(KEBAB_CASE_PATTERN).expect("kebab-case pattern is valid"))
}

/// Whether `name` is lowercase alphanumerics joined by single hyphens.
pub fn is_kebab_case(name: &str) -> bool {
    kebab_case_regex().is_match(name)
}

/// Whether `contents` holds a file entry whose name case-insensitively equals
/// `file_name`. Directories and other entry kinds never match.
pub fn has_file(contents: &[ContentEntry], file_name: &str) -> bool {
    contents
        .iter()
        .any(|entry| entry.is_file() && entry.name.eq_ignore_ascii_case(file_name))
}

// ---------------------------------------------------------------------------
// Rule definitions
// ---------------------------------------------------------------------------

/// The predicate a rule applies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RulePredicate {
    /// Repository name matches the kebab-case grammar.
    KebabCaseName,
    /// Root listing holds a file with this name (case-insensitive).
    FilePresent { file_name: String },
}

impl RulePredicate {
    pub fn evaluate(&self, repo_name: &str, contents: &[ContentEntry]) -> bool {
        match self {
            RulePredicate::KebabCaseName => is_kebab_case(repo_name),
            RulePredicate::FilePresent { file_name } => has_file(contents, file_name),
        }
    }
}

/// A named rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleDefinition {
    /// Stable identifier, used as the key in [`ValidationRecord::results`].
    pub id: String,
    /// Column header for tabular renderers.
    pub label: String,
    pub predicate: RulePredicate,
}

impl RuleDefinition {
    pub fn new(id: impl Into<String>, label: impl Into<String>, predicate: RulePredicate) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            predicate,
        }
    }

    pub fn file_present(
        id: impl Into<String>,
        label: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            label,
            RulePredicate::FilePresent {
                file_name: file_name.into(),
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Rule set
// ---------------------------------------------------------------------------

/// Ordered collection of rules with unique ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<RuleDefinition>,
}

impl RuleSet {
    /// An empty rule set.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The six standard hygiene rules in report column order.
    pub fn standard() -> Self {
        Self {
            rules: vec![
                RuleDefinition::new(
                    RULE_KEBAB_CASE_NAMING,
                    "HasValidKebabCaseNaming",
                    RulePredicate::KebabCaseName,
                ),
                RuleDefinition::file_present(RULE_README, "HasReadme", "README.md"),
                RuleDefinition::file_present(RULE_CODE_OWNERS, "HasCodeOwners", "CODEOWNERS"),
                RuleDefinition::file_present(
                    RULE_EDITOR_CONFIG,
                    "HasEditorConfig",
                    EDITOR_CONFIG_FILE_NAME,
                ),
                RuleDefinition::file_present(RULE_BUILD_GRADLE, "HasBuildGradle", "build.gradle"),
                RuleDefinition::file_present(RULE_MAVEN_BUILD, "HasMavenBuild", "pom.xml"),
            ],
        }
    }

    /// Append a rule. Rejects a duplicate id.
    pub fn with_rule(mut self, rule: RuleDefinition) -> CheckResult<Self> {
        if self.rules.iter().any(|r| r.id == rule.id) {
            return Err(CheckError::Configuration(format!(
                "duplicate rule id '{}'",
                rule.id
            )));
        }
        self.rules.push(rule);
        Ok(self)
    }

    /// Point the editor-config rule at a different filename.
    pub fn with_editor_config_file_name(mut self, file_name: &str) -> Self {
        for rule in &mut self.rules {
            if rule.id == RULE_EDITOR_CONFIG {
                rule.predicate = RulePredicate::FilePresent {
                    file_name: file_name.to_string(),
                };
            }
        }
        self
    }

    pub fn rules(&self) -> &[RuleDefinition] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Column descriptors in registration order.
    pub fn columns(&self) -> Vec<RuleColumn> {
        self.rules
            .iter()
            .map(|r| RuleColumn {
                id: r.id.clone(),
                label: r.label.clone(),
            })
            .collect()
    }

    /// Evaluate every rule. Total and pure.
    pub fn evaluate(&self, repo_name: &str, contents: &[ContentEntry]) -> BTreeMap<String, bool> {
        self.rules
            .iter()
            .map(|rule| (rule.id.clone(), rule.predicate.evaluate(repo_name, contents)))
            .collect()
    }

    /// Evaluate and wrap the results into a record for `repo_name`.
    pub fn validate(&self, repo_name: &str, contents: &[ContentEntry]) -> ValidationRecord {
        ValidationRecord {
            repo_name: repo_name.to_string(),
            results: self.evaluate(repo_name, contents),
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}
