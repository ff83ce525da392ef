//! In-memory [`RepoSource`] for tests.
//!
//! `MemoryRepoSource` serves a fixed organization snapshot, paginates it the
//! way the GitHub API does, and can be told to fail individual pages or
//! repositories.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CheckError, CheckResult};
use crate::model::{ContentEntry, RepoRef};
use crate::source::{RepoPage, RepoSource};

#[derive(Debug, Clone)]
enum RepoBehavior {
    Contents(Vec<ContentEntry>),
    TransportFailure,
    IoFailure,
    Panic,
    Missing,
}

/// Organization snapshot served from memory.
#[derive(Debug, Default)]
pub struct MemoryRepoSource {
    organization: String,
    repos: Vec<(String, RepoBehavior)>,
    failing_pages: HashSet<u32>,
    delays: HashMap<String, Duration>,
    list_calls: AtomicUsize,
    contents_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryRepoSource {
    pub fn new(organization: &str) -> Self {
        Self {
            organization: organization.to_string(),
            ..Self::default()
        }
    }

    /// Add a repository with the given root listing.
    pub fn with_repo(mut self, name: &str, contents: Vec<ContentEntry>) -> Self {
        self.repos
            .push((name.to_string(), RepoBehavior::Contents(contents)));
        self
    }

    /// Add repositories with empty root listings.
    pub fn with_repos<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        for name in names {
            self = self.with_repo(name, Vec::new());
        }
        self
    }

    /// Add a repository whose root listing fails with a transport error.
    pub fn with_failing_repo(mut self, name: &str) -> Self {
        self.repos
            .push((name.to_string(), RepoBehavior::TransportFailure));
        self
    }

    /// Add a repository whose root listing fails with a local I/O error.
    pub fn with_io_failing_repo(mut self, name: &str) -> Self {
        self.repos.push((name.to_string(), RepoBehavior::IoFailure));
        self
    }

    /// Add a repository whose root listing panics.
    pub fn with_panicking_repo(mut self, name: &str) -> Self {
        self.repos.push((name.to_string(), RepoBehavior::Panic));
        self
    }

    /// Add a repository whose root listing is absent.
    pub fn with_missing_repo(mut self, name: &str) -> Self {
        self.repos.push((name.to_string(), RepoBehavior::Missing));
        self
    }

    /// Make listing page `page` (1-based) fail.
    pub fn with_failing_page(mut self, page: u32) -> Self {
        self.failing_pages.insert(page);
        self
    }

    /// Delay the root listing of `name`.
    pub fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn contents_calls(&self) -> usize {
        self.contents_calls.load(Ordering::SeqCst)
    }

    /// Highest number of root listings observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepoSource for MemoryRepoSource {
    async fn list_page(
        &self,
        organization: &str,
        page: u32,
        per_page: u32,
    ) -> CheckResult<RepoPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if organization != self.organization {
            return Err(CheckError::transport(
                format!("listing repositories for {organization}"),
                "HTTP 404 Not Found",
            ));
        }
        if self.failing_pages.contains(&page) {
            return Err(CheckError::transport(
                format!("listing page {page} for {organization}"),
                "HTTP 502 Bad Gateway",
            ));
        }

        let per_page = per_page.max(1) as usize;
        let start = (page.saturating_sub(1) as usize) * per_page;
        let end = (start + per_page).min(self.repos.len());
        let repos = self
            .repos
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|(name, _)| RepoRef::new(organization, name.clone()))
            .collect();
        let next_page = (end < self.repos.len()).then_some(page + 1);

        Ok(RepoPage { repos, next_page })
    }

    async fn root_contents(
        &self,
        organization: &str,
        repository: &str,
    ) -> CheckResult<Vec<ContentEntry>> {
        self.contents_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(repository) {
            tokio::time::sleep(*delay).await;
        }

        let behavior = self
            .repos
            .iter()
            .find(|(name, _)| name == repository)
            .map(|(_, behavior)| behavior.clone());

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let resource = format!("{organization}/{repository} root listing");
        if organization != self.organization {
            return Err(CheckError::not_found(resource));
        }
        match behavior {
            Some(RepoBehavior::Contents(contents)) => Ok(contents),
            Some(RepoBehavior::TransportFailure) => Err(CheckError::transport(
                format!("fetching {resource}"),
                "connection reset by peer",
            )),
            Some(RepoBehavior::IoFailure) => Err(CheckError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk",
            ))),
            Some(RepoBehavior::Panic) => panic!("root listing of {resource} panicked"),
            Some(RepoBehavior::Missing) | None => Err(CheckError::not_found(resource)),
        }
    }
}
