//! Error taxonomy for the scan pipeline.

use thiserror::Error;

/// Errors produced while enumerating, fetching, or rendering.
#[derive(Debug, Error)]
pub enum CheckError {
    /// Network, auth, or rate-limit failure talking to the source-control API.
    #[error("transport error while {context}: {detail}")]
    Transport { context: String, detail: String },

    /// A repository or its root listing is absent.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// Missing or invalid required input, detected before any scan starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The scan was cancelled between repositories.
    #[error("scan cancelled after {scanned} scanned and {errored} errored repositories")]
    Cancelled { scanned: usize, errored: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("template error: {0}")]
    Template(String),

    /// A root-listing task panicked or was torn down before returning.
    #[error("fetch task failed: {0}")]
    Task(String),
}

impl CheckError {
    pub fn transport(context: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        CheckError::Transport {
            context: context.into(),
            detail: detail.to_string(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        CheckError::NotFound {
            resource: resource.into(),
        }
    }

    /// Whether this error is an expected repository-level outcome. Other
    /// kinds are still skipped by the scanner but logged as errors.
    pub fn is_repo_recoverable(&self) -> bool {
        matches!(
            self,
            CheckError::Transport { .. } | CheckError::NotFound { .. }
        )
    }
}

/// Convenience result alias.
pub type CheckResult<T> = std::result::Result<T, CheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_displays_context_and_detail() {
        let err = CheckError::transport("listing repositories for acme", "HTTP 502");
        let msg = err.to_string();
        assert!(msg.contains("listing repositories for acme"));
        assert!(msg.contains("HTTP 502"));
    }

    #[test]
    fn test_not_found_displays_resource() {
        let err = CheckError::not_found("acme/ghost root listing");
        assert!(err.to_string().contains("acme/ghost"));
    }

    #[test]
    fn test_only_transport_and_not_found_are_repo_recoverable() {
        assert!(CheckError::transport("x", "y").is_repo_recoverable());
        assert!(CheckError::not_found("x").is_repo_recoverable());
        assert!(!CheckError::Configuration("missing org".into()).is_repo_recoverable());
        assert!(!CheckError::Cancelled {
            scanned: 1,
            errored: 0
        }
        .is_repo_recoverable());
        assert!(!CheckError::Template("bad".into()).is_repo_recoverable());
        assert!(!CheckError::Task("panicked".into()).is_repo_recoverable());
    }
}
