//! Scan and client configuration.
//!
//! Values are resolved from explicit arguments first and the environment
//! second (`GITHUB_API_URL`, `GITHUB_TOKEN`). Validation happens before any
//! request is made, so a missing input surfaces as
//! [`CheckError::Configuration`] rather than a transport failure.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CheckError, CheckResult};
use crate::rules::EDITOR_CONFIG_FILE_NAME;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// GitHub caps `per_page` at 100.
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the source-control API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API root, e.g. `https://api.github.com` or a GitHub Enterprise `/api/v3` URL.
    pub api_base_url: String,
    /// Bearer token sent on every request.
    #[serde(skip_serializing)]
    pub token: String,
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_base_url: std::env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            token: std::env::var("GITHUB_TOKEN").unwrap_or_default(),
            user_agent: format!("repocheck/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Create a config from environment variables.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create a config for a specific API root.
    pub fn new(api_base_url: &str) -> Self {
        ClientConfig {
            api_base_url: api_base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = token.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> CheckResult<()> {
        if self.token.trim().is_empty() {
            return Err(CheckError::Configuration(
                "an API token is required (--token or GITHUB_TOKEN)".to_string(),
            ));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(CheckError::Configuration(
                "the API base URL must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tuning knobs for a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Repositories requested per listing page.
    pub page_size: u32,
    /// Maximum concurrent root-listing fetches within one page. `1` is fully
    /// sequential.
    pub concurrency: usize,
    /// Filename the editor-config rule looks for.
    pub editor_config_file_name: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: 1,
            editor_config_file_name: EDITOR_CONFIG_FILE_NAME.to_string(),
        }
    }
}

impl ScanOptions {
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_editor_config_file_name(mut self, file_name: &str) -> Self {
        self.editor_config_file_name = file_name.to_string();
        self
    }

    pub fn validate(&self) -> CheckResult<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(CheckError::Configuration(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if self.concurrency == 0 {
            return Err(CheckError::Configuration(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.editor_config_file_name.trim().is_empty() {
            return Err(CheckError::Configuration(
                "editor-config filename must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// What to scan: a whole organization or one repository in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTarget {
    pub organization: String,
    pub repository: Option<String>,
}

impl ScanTarget {
    /// Every repository in `organization`.
    pub fn organization(organization: &str) -> CheckResult<Self> {
        let organization = required("organization", organization)?;
        Ok(Self {
            organization,
            repository: None,
        })
    }

    /// A single repository, skipping pagination.
    pub fn repository(organization: &str, repository: &str) -> CheckResult<Self> {
        Ok(Self {
            organization: required("organization", organization)?,
            repository: Some(required("repository", repository)?),
        })
    }

    /// Build from an optional repository argument.
    pub fn from_args(organization: &str, repository: Option<&str>) -> CheckResult<Self> {
        match repository {
            Some(repo) => Self::repository(organization, repo),
            None => Self::organization(organization),
        }
    }
}

fn required(what: &str, value: &str) -> CheckResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CheckError::Configuration(format!("{what} name is required")));
    }
    Ok(trimmed.to_string())
}
