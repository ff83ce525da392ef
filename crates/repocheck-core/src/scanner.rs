//! Scan orchestrator.
//!
//! [`Scanner::scan`] drains the repository page sequence, fetches each
//! repository's root listing, evaluates the rule set, and accumulates a
//! [`ScanRun`].
//!
//! Failure isolation:
//! - a listing page failure aborts the scan (the caller cannot know which
//!   repositories were missed);
//! - a root-listing failure of any kind (including a panicked fetch task)
//!   skips that repository, counts it as errored, and the scan continues.
//!
//! Within one page, root listings may be fetched concurrently up to
//! [`ScanOptions::concurrency`]. Records are always appended by a single
//! consumer in listing order.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{warn, Instrument};
use uuid::Uuid;

use crate::config::{ScanOptions, ScanTarget};
use crate::error::{CheckError, CheckResult};
use crate::model::{ContentEntry, RepoRef, ScanRun, SkippedRepo, ValidationRecord};
use crate::obs;
use crate::rules::RuleSet;
use crate::source::{RepoPages, RepoSource};

type FetchOutcome = (RepoRef, CheckResult<Vec<ContentEntry>>);

/// Drives one or more scans against a [`RepoSource`].
pub struct Scanner {
    source: Arc<dyn RepoSource>,
    rules: Arc<RuleSet>,
    options: ScanOptions,
}

impl Scanner {
    /// Create a scanner using the standard rule set. Fails when `options`
    /// are invalid.
    pub fn new(source: Arc<dyn RepoSource>, options: ScanOptions) -> CheckResult<Self> {
        options.validate()?;
        let rules = RuleSet::standard().with_editor_config_file_name(&options.editor_config_file_name);
        Ok(Self {
            source,
            rules: Arc::new(rules),
            options,
        })
    }

    /// Replace the rule set. The configured editor-config filename is
    /// reapplied to the `has_editor_config` rule if `rules` registers it.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        let rules = rules.with_editor_config_file_name(&self.options.editor_config_file_name);
        self.rules = Arc::new(rules);
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// The lazy repository sequence for `target`.
    pub fn pages(&self, target: &ScanTarget) -> RepoPages {
        match &target.repository {
            Some(repo) => RepoPages::fixed(
                Arc::clone(&self.source),
                RepoRef::new(&target.organization, repo),
            ),
            None => RepoPages::organization(
                Arc::clone(&self.source),
                &target.organization,
                self.options.page_size,
            ),
        }
    }

    /// Scan `target` to completion.
    ///
    /// Returns [`CheckError::Transport`] if a listing page fails and
    /// [`CheckError::Cancelled`] if `cancel` fires first.
    pub async fn scan(
        &self,
        target: &ScanTarget,
        cancel: &CancellationToken,
    ) -> CheckResult<ScanRun> {
        let scan_id = Uuid::new_v4().to_string();
        let span = obs::scan_span(&scan_id, &target.organization);
        let result = self.run(scan_id, target, cancel).instrument(span.clone()).await;
        if let Err(e) = &result {
            span.in_scope(|| obs::emit_scan_aborted(e));
        }
        result
    }

    async fn run(
        &self,
        scan_id: String,
        target: &ScanTarget,
        cancel: &CancellationToken,
    ) -> CheckResult<ScanRun> {
        let started_at = Utc::now();
        obs::emit_scan_started(
            &target.organization,
            target.repository.as_deref(),
            self.rules.len(),
        );

        let mut acc = Accumulator::default();
        let mut pages = self.pages(target);

        loop {
            if cancel.is_cancelled() {
                return Err(acc.cancelled());
            }
            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(acc.cancelled()),
                page = pages.next_page() => page?,
            };
            let Some(repos) = page else { break };
            acc.pages_fetched += 1;
            let repos_in_page = repos.len();

            let outcomes = if self.options.concurrency <= 1 {
                self.fetch_sequential(repos, cancel).await
            } else {
                self.fetch_concurrent(repos, cancel).await
            };
            for outcome in outcomes {
                acc.record(&self.rules, outcome);
            }
            if cancel.is_cancelled() {
                return Err(acc.cancelled());
            }

            obs::emit_page_fetched(acc.pages_fetched, repos_in_page, acc.processed());
        }

        let finished_at = Utc::now();
        let run = ScanRun {
            scan_id,
            organization: target.organization.clone(),
            rules: self.rules.columns(),
            records: acc.records,
            skipped: acc.skipped,
            scanned_count: acc.scanned,
            errored_count: acc.errored,
            pages_fetched: acc.pages_fetched,
            started_at,
            finished_at,
        };
        obs::emit_scan_finished(
            run.scanned_count,
            run.errored_count,
            run.pages_fetched,
            run.duration_ms(),
        );
        Ok(run)
    }

    /// One fetch at a time; stops before the next repository once cancelled.
    async fn fetch_sequential(
        &self,
        repos: Vec<RepoRef>,
        cancel: &CancellationToken,
    ) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::with_capacity(repos.len());
        for repo in repos {
            if cancel.is_cancelled() {
                break;
            }
            let source = Arc::clone(&self.source);
            let (organization, name) = (repo.organization.clone(), repo.name.clone());
            let contents = tokio::spawn(
                async move { source.root_contents(&organization, &name).await }.in_current_span(),
            )
            .await
            .unwrap_or_else(|e| Err(task_failed(&repo, &e)));
            outcomes.push((repo, contents));
        }
        outcomes
    }

    /// Up to `concurrency` fetches in flight. Output keeps listing order;
    /// repositories not started before cancellation are omitted. A task that
    /// panics still yields an outcome for its repository.
    async fn fetch_concurrent(
        &self,
        repos: Vec<RepoRef>,
        cancel: &CancellationToken,
    ) -> Vec<FetchOutcome> {
        let permits = Arc::new(Semaphore::new(self.options.concurrency));
        let mut join_set = JoinSet::new();

        for (idx, repo) in repos.iter().cloned().enumerate() {
            let source = Arc::clone(&self.source);
            let permits = Arc::clone(&permits);
            let cancel = cancel.clone();
            join_set.spawn(
                async move {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return (idx, Slot::NotStarted);
                    };
                    if cancel.is_cancelled() {
                        return (idx, Slot::NotStarted);
                    }
                    let contents = source.root_contents(&repo.organization, &repo.name).await;
                    (idx, Slot::Done(contents))
                }
                .in_current_span(),
            );
        }

        let mut slots: Vec<Slot> = (0..repos.len()).map(|_| Slot::Pending).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, slot)) => slots[idx] = slot,
                Err(e) => warn!(error = %e, "root listing task failed"),
            }
        }

        // Every task that returned filled its slot, so a slot still pending
        // belongs to a task that ended in a join error.
        repos
            .into_iter()
            .zip(slots)
            .filter_map(|(repo, slot)| match slot {
                Slot::Done(contents) => Some((repo, contents)),
                Slot::NotStarted => None,
                Slot::Pending => {
                    let err = CheckError::Task(format!(
                        "{} root listing task did not complete",
                        repo.full_name()
                    ));
                    Some((repo, Err(err)))
                }
            })
            .collect()
    }
}

/// Per-repository state of a concurrent fetch.
enum Slot {
    Pending,
    NotStarted,
    Done(CheckResult<Vec<ContentEntry>>),
}

fn task_failed(repo: &RepoRef, e: &tokio::task::JoinError) -> CheckError {
    CheckError::Task(format!("{}: {e}", repo.full_name()))
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("rules", &self.rules)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Mutable scan state, owned by one consumer.
#[derive(Debug, Default)]
struct Accumulator {
    records: Vec<ValidationRecord>,
    skipped: Vec<SkippedRepo>,
    scanned: usize,
    errored: usize,
    pages_fetched: usize,
}

impl Accumulator {
    /// Record one fetch outcome. Repository-level failures of any kind are
    /// counted and skipped; only listing failures abort a scan.
    fn record(&mut self, rules: &RuleSet, (repo, contents): FetchOutcome) {
        match contents {
            Ok(contents) => {
                let record = rules.validate(&repo.name, &contents);
                let passed = record.results.values().filter(|v| **v).count();
                obs::emit_repo_evaluated(&repo.full_name(), passed, record.results.len());
                self.records.push(record);
                self.scanned += 1;
            }
            Err(e) => {
                if e.is_repo_recoverable() {
                    obs::emit_repo_skipped(&repo.full_name(), &e);
                } else {
                    obs::emit_repo_failed(&repo.full_name(), &e);
                }
                self.skipped.push(SkippedRepo {
                    name: repo.name,
                    reason: e.to_string(),
                });
                self.errored += 1;
            }
        }
    }

    fn processed(&self) -> usize {
        self.scanned + self.errored
    }

    fn cancelled(&self) -> CheckError {
        CheckError::Cancelled {
            scanned: self.scanned,
            errored: self.errored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryRepoSource;
    use crate::rules::{RULE_README, RULE_KEBAB_CASE_NAMING};

    fn scanner(source: MemoryRepoSource, options: ScanOptions) -> Scanner {
        scanner_shared(Arc::new(source), options)
    }

    fn scanner_shared(source: Arc<MemoryRepoSource>, options: ScanOptions) -> Scanner {
        Scanner::new(source, options).expect("valid options")
    }

    #[test]
    fn test_new_rejects_invalid_options() {
        let result = Scanner::new(
            Arc::new(MemoryRepoSource::new("acme")),
            ScanOptions::default().with_page_size(0),
        );
        assert!(matches!(result, Err(CheckError::Configuration(_))));
    }

    #[test]
    fn test_new_applies_editor_config_file_name() {
        let s = scanner(
            MemoryRepoSource::new("acme"),
            ScanOptions::default().with_editor_config_file_name(".ediorconfig"),
        );
        let results = s
            .rules()
            .evaluate("x", &[ContentEntry::file(".ediorconfig")]);
        assert!(results[crate::rules::RULE_EDITOR_CONFIG]);
    }

    #[test]
    fn test_with_rules_keeps_configured_editor_config_file_name() {
        let s = scanner(
            MemoryRepoSource::new("acme"),
            ScanOptions::default().with_editor_config_file_name(".ediorconfig"),
        )
        .with_rules(RuleSet::standard());
        let results = s
            .rules()
            .evaluate("x", &[ContentEntry::file(".ediorconfig")]);
        assert!(results[crate::rules::RULE_EDITOR_CONFIG]);
        let results = s
            .rules()
            .evaluate("x", &[ContentEntry::file(".editorconfig")]);
        assert!(!results[crate::rules::RULE_EDITOR_CONFIG]);
    }

    #[test]
    fn test_accumulator_skips_every_repo_level_error() {
        let rules = RuleSet::standard();
        let mut acc = Accumulator::default();
        acc.record(
            &rules,
            (RepoRef::new("acme", "ok"), Ok(vec![ContentEntry::file("README.md")])),
        );
        acc.record(
            &rules,
            (RepoRef::new("acme", "gone"), Err(CheckError::not_found("gone"))),
        );
        acc.record(
            &rules,
            (
                RepoRef::new("acme", "disk"),
                Err(CheckError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk",
                ))),
            ),
        );
        acc.record(
            &rules,
            (
                RepoRef::new("acme", "boom"),
                Err(CheckError::Task("panicked".into())),
            ),
        );
        assert_eq!(acc.scanned, 1);
        assert_eq!(acc.errored, 3);
        let skipped: Vec<&str> = acc.skipped.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(skipped, vec!["gone", "disk", "boom"]);
        assert!(acc.records[0].results[RULE_README]);
        assert!(acc.records[0].results[RULE_KEBAB_CASE_NAMING]);
    }

    #[tokio::test]
    async fn test_panicking_fetch_is_counted_in_both_modes() {
        for concurrency in [1, 2] {
            let source = Arc::new(
                MemoryRepoSource::new("acme")
                    .with_repos(["a"])
                    .with_panicking_repo("boom")
                    .with_repos(["c"]),
            );
            let s = scanner_shared(source, ScanOptions::default().with_concurrency(concurrency));
            let run = s
                .scan(
                    &ScanTarget::organization("acme").expect("target"),
                    &CancellationToken::new(),
                )
                .await
                .expect("scan survives a panicking fetch");
            assert_eq!(run.scanned_count, 2, "concurrency {concurrency}");
            assert_eq!(run.errored_count, 1, "concurrency {concurrency}");
            assert_eq!(run.scanned_count + run.errored_count, 3);
            assert_eq!(run.skipped[0].name, "boom");
            let names: Vec<&str> = run.records.iter().map(|r| r.repo_name.as_str()).collect();
            assert_eq!(names, vec!["a", "c"]);
        }
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_aborts_before_listing() {
        let source = Arc::new(MemoryRepoSource::new("acme").with_repos(["a"]));
        let s = Scanner::new(source.clone(), ScanOptions::default()).expect("scanner");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = s
            .scan(&ScanTarget::organization("acme").expect("target"), &cancel)
            .await
            .expect_err("cancelled");
        assert!(matches!(
            err,
            CheckError::Cancelled {
                scanned: 0,
                errored: 0
            }
        ));
        assert_eq!(source.list_calls(), 0);
    }
}
