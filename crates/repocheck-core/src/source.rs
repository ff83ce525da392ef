//! Adapter boundary between the scanner and the source-control API.
//!
//! [`RepoSource`] exposes the two calls the scanner needs. [`RepoPages`]
//! turns the paged listing call into a lazy, restartable sequence so the
//! scanner never handles page cursors itself.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CheckResult;
use crate::model::{ContentEntry, RepoRef};

/// One page of an organization's repository listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoPage {
    pub repos: Vec<RepoRef>,
    /// Page number to request next, or `None` when this was the last page.
    pub next_page: Option<u32>,
}

/// Injectable source of repository listings and root contents.
///
/// Implementations must be safe to call concurrently; the scanner may fetch
/// several root listings at once.
#[async_trait]
pub trait RepoSource: Send + Sync {
    /// Fetch page `page` (1-based) of `organization`'s repositories.
    ///
    /// Fails with [`CheckError::Transport`](crate::CheckError::Transport) on
    /// any request failure.
    async fn list_page(&self, organization: &str, page: u32, per_page: u32)
        -> CheckResult<RepoPage>;

    /// Fetch the root directory listing of `organization/repository`.
    ///
    /// Fails with [`CheckError::NotFound`](crate::CheckError::NotFound) when
    /// the root cannot be listed and `Transport` on any other failure. An
    /// empty successful listing is `Ok(vec![])`.
    async fn root_contents(
        &self,
        organization: &str,
        repository: &str,
    ) -> CheckResult<Vec<ContentEntry>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Next(u32),
    Done,
}

#[derive(Debug, Clone)]
enum Mode {
    Paged { organization: String, per_page: u32 },
    Fixed(RepoRef),
}

/// Lazy page-by-page sequence of repositories.
///
/// Each call to [`RepoPages::next_page`] issues at most one listing request.
/// A failed page terminates the sequence; [`RepoPages::restart`] rewinds it
/// to the first page.
pub struct RepoPages {
    source: Arc<dyn RepoSource>,
    mode: Mode,
    cursor: Cursor,
}

impl RepoPages {
    /// Pages of every repository in `organization`.
    pub fn organization(source: Arc<dyn RepoSource>, organization: &str, per_page: u32) -> Self {
        Self {
            source,
            mode: Mode::Paged {
                organization: organization.to_string(),
                per_page,
            },
            cursor: Cursor::Next(1),
        }
    }

    /// A single page holding exactly `repo`, with no listing request.
    pub fn fixed(source: Arc<dyn RepoSource>, repo: RepoRef) -> Self {
        Self {
            source,
            mode: Mode::Fixed(repo),
            cursor: Cursor::Next(1),
        }
    }

    /// Produce the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> CheckResult<Option<Vec<RepoRef>>> {
        let page = match self.cursor {
            Cursor::Done => return Ok(None),
            Cursor::Next(page) => page,
        };

        match &self.mode {
            Mode::Fixed(repo) => {
                self.cursor = Cursor::Done;
                Ok(Some(vec![repo.clone()]))
            }
            Mode::Paged {
                organization,
                per_page,
            } => {
                let result = self.source.list_page(organization, page, *per_page).await;
                match result {
                    Ok(listing) => {
                        self.cursor = match listing.next_page {
                            Some(next) if next > page => Cursor::Next(next),
                            _ => Cursor::Done,
                        };
                        Ok(Some(listing.repos))
                    }
                    Err(e) => {
                        self.cursor = Cursor::Done;
                        Err(e)
                    }
                }
            }
        }
    }

    /// Rewind to the first page.
    pub fn restart(&mut self) {
        self.cursor = Cursor::Next(1);
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor == Cursor::Done
    }
}

impl std::fmt::Debug for RepoPages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoPages")
            .field("mode", &self.mode)
            .field("cursor", &self.cursor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckError;
    use crate::fakes::MemoryRepoSource;

    fn names(page: &[RepoRef]) -> Vec<&str> {
        page.iter().map(|r| r.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_pages_follow_next_page_until_exhausted() {
        let source = Arc::new(MemoryRepoSource::new("acme").with_repos(["a", "b", "c", "d", "e"]));
        let mut pages = RepoPages::organization(source.clone(), "acme", 2);

        let mut seen = Vec::new();
        while let Some(page) = pages.next_page().await.expect("page") {
            seen.push(names(&page).join(","));
        }
        assert_eq!(seen, vec!["a,b", "c,d", "e"]);
        assert!(pages.is_exhausted());
        assert_eq!(source.list_calls(), 3);
        assert!(pages.next_page().await.expect("exhausted").is_none());
        assert_eq!(source.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_restart_rewinds_to_first_page() {
        let source = Arc::new(MemoryRepoSource::new("acme").with_repos(["a", "b", "c"]));
        let mut pages = RepoPages::organization(source, "acme", 2);
        while pages.next_page().await.expect("page").is_some() {}

        pages.restart();
        let first = pages.next_page().await.expect("page").expect("some");
        assert_eq!(names(&first), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_page_failure_terminates_sequence() {
        let source = Arc::new(
            MemoryRepoSource::new("acme")
                .with_repos(["a", "b", "c"])
                .with_failing_page(2),
        );
        let mut pages = RepoPages::organization(source, "acme", 2);
        assert!(pages.next_page().await.expect("first page").is_some());
        let err = pages.next_page().await.expect_err("second page fails");
        assert!(matches!(err, CheckError::Transport { .. }));
        assert!(pages.next_page().await.expect("terminated").is_none());
    }

    #[tokio::test]
    async fn test_fixed_yields_single_repo_without_listing() {
        let source = Arc::new(MemoryRepoSource::new("acme").with_repos(["a", "b"]));
        let mut pages = RepoPages::fixed(source.clone(), RepoRef::new("acme", "solo"));
        let page = pages.next_page().await.expect("page").expect("some");
        assert_eq!(names(&page), vec!["solo"]);
        assert!(pages.next_page().await.expect("done").is_none());
        assert_eq!(source.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_organization_yields_one_empty_page() {
        let source = Arc::new(MemoryRepoSource::new("acme"));
        let mut pages = RepoPages::organization(source, "acme", 10);
        let page = pages.next_page().await.expect("page").expect("some");
        assert!(page.is_empty());
        assert!(pages.next_page().await.expect("done").is_none());
    }
}
