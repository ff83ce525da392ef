//! repocheck core library
//!
//! Audits every repository of a source-control organization against a fixed,
//! extensible set of hygiene rules and aggregates one validation record per
//! repository.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use repocheck_core::{ClientConfig, GitHubClient, ScanOptions, ScanTarget, Scanner};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = GitHubClient::new(ClientConfig::from_env().with_token("ghp_..."))?;
//! let scanner = Scanner::new(Arc::new(client), ScanOptions::default())?;
//! let run = scanner
//!     .scan(&ScanTarget::organization("acme")?, &CancellationToken::new())
//!     .await?;
//! println!("{}", repocheck_core::render_table(&run));
//! ```

pub mod config;
pub mod error;
pub mod fakes;
pub mod github;
pub mod model;
pub mod obs;
pub mod report;
pub mod rules;
pub mod scanner;
pub mod source;
pub mod telemetry;

pub use config::{ClientConfig, ScanOptions, ScanTarget, DEFAULT_PAGE_SIZE};
pub use error::{CheckError, CheckResult};
pub use github::GitHubClient;
pub use model::{
    ContentEntry, ContentKind, RepoRef, RuleColumn, ScanRun, SkippedRepo, ValidationRecord,
};
pub use report::{
    render, render_csv, render_html, render_json, render_table, write_report, ReportFormat,
};
pub use rules::{RuleDefinition, RulePredicate, RuleSet, EDITOR_CONFIG_FILE_NAME};
pub use scanner::Scanner;
pub use source::{RepoPage, RepoPages, RepoSource};
pub use telemetry::init_tracing;

/// repocheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
