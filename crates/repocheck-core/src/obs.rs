//! Structured observability hooks for the scan lifecycle.
//!
//! Events are emitted at `info!` level except skips and aborts, which are
//! warnings, and unexpected repository failures, which are errors. Filter
//! with `RUST_LOG`.

use tracing::{error, info, warn};

/// Span carrying `scan_id` and `org` for every event of one scan.
///
/// Attach it with `tracing::Instrument` so the scan future stays `Send`.
pub fn scan_span(scan_id: &str, organization: &str) -> tracing::Span {
    tracing::info_span!("repocheck.scan", scan_id = %scan_id, org = %organization)
}

pub fn emit_scan_started(organization: &str, repository: Option<&str>, rule_count: usize) {
    info!(
        event = "scan.started",
        org = %organization,
        repo = repository.unwrap_or("*"),
        rules = rule_count,
    );
}

/// Emitted after each listing page, with the cumulative processed count.
pub fn emit_page_fetched(page: usize, repos_in_page: usize, processed_total: usize) {
    info!(
        event = "scan.page_fetched",
        page = page,
        repos = repos_in_page,
        processed = processed_total,
        "processed {} repositories",
        processed_total
    );
}

pub fn emit_repo_evaluated(repo: &str, passed: usize, total: usize) {
    tracing::debug!(event = "scan.repo_evaluated", repo = %repo, passed = passed, total = total);
}

/// A repository was excluded because its root listing failed.
pub fn emit_repo_skipped(repo: &str, error: &dyn std::fmt::Display) {
    warn!(event = "scan.repo_skipped", repo = %repo, error = %error);
}

/// A repository was excluded because of a failure other than transport or
/// absence (a local I/O error, a panicked fetch task).
pub fn emit_repo_failed(repo: &str, err: &dyn std::fmt::Display) {
    error!(event = "scan.repo_failed", repo = %repo, error = %err);
}

pub fn emit_scan_finished(scanned: usize, errored: usize, pages: usize, duration_ms: u64) {
    info!(
        event = "scan.finished",
        scanned = scanned,
        errored = errored,
        pages = pages,
        duration_ms = duration_ms,
    );
}

/// The scan stopped before the listing was exhausted.
pub fn emit_scan_aborted(error: &dyn std::fmt::Display) {
    warn!(event = "scan.aborted", error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_span_enter() {
        let _span = scan_span("scan-1", "acme").entered();
        emit_scan_started("acme", None, 6);
        emit_repo_skipped("acme/x", &"boom");
        emit_repo_failed("acme/y", &"task panicked");
    }
}
