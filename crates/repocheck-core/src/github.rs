//! GitHub REST adapter.
//!
//! Lists organization repositories via `GET /orgs/{org}/repos` (following the
//! `Link: rel="next"` header for pagination) and root listings via
//! `GET /repos/{org}/{repo}/contents/`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{CheckError, CheckResult};
use crate::model::{ContentEntry, RepoRef};
use crate::source::{RepoPage, RepoSource};

const GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Subset of the repository object the listing returns.
#[derive(Debug, Deserialize)]
struct RepositoryItem {
    name: String,
}

/// GitHub API client. Holds no mutable state and is safe to share across
/// concurrent fetches.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl GitHubClient {
    /// Create a client. Fails with a configuration error when the token or
    /// base URL is missing.
    pub fn new(config: ClientConfig) -> CheckResult<Self> {
        config.validate()?;
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| CheckError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(GitHubClient {
            config,
            http_client,
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> CheckResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    async fn get(&self, url: &str, context: &str) -> CheckResult<reqwest::Response> {
        debug!(url = %url, "GET");
        self.http_client
            .get(url)
            .header(ACCEPT, GITHUB_JSON)
            .header(API_VERSION_HEADER, API_VERSION)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.token))
            .send()
            .await
            .map_err(|e| CheckError::transport(context, e))
    }
}

#[async_trait]
impl RepoSource for GitHubClient {
    async fn list_page(
        &self,
        organization: &str,
        page: u32,
        per_page: u32,
    ) -> CheckResult<RepoPage> {
        let context = format!("listing page {page} of repositories for {organization}");
        let url = self.endpoint(&format!(
            "/orgs/{organization}/repos?per_page={per_page}&page={page}"
        ));
        let response = self.get(&url, &context).await?;

        check_listing_status(response.status(), response.headers(), &context)?;

        let next_page = next_page_from_link(response.headers());
        let items: Vec<RepositoryItem> = response
            .json()
            .await
            .map_err(|e| CheckError::transport(&context, e))?;

        Ok(RepoPage {
            repos: items
                .into_iter()
                .map(|item| RepoRef::new(organization, item.name))
                .collect(),
            next_page,
        })
    }

    async fn root_contents(
        &self,
        organization: &str,
        repository: &str,
    ) -> CheckResult<Vec<ContentEntry>> {
        let resource = format!("{organization}/{repository} root listing");
        let context = format!("fetching {resource}");
        let url = self.endpoint(&format!("/repos/{organization}/{repository}/contents/"));
        let response = self.get(&url, &context).await?;

        check_contents_status(response.status(), response.headers(), &resource, &context)?;

        let body = response
            .text()
            .await
            .map_err(|e| CheckError::transport(&context, e))?;
        parse_root_listing(&body, &resource)
    }
}

/// Any non-success status on a listing page is a transport failure.
pub(crate) fn check_listing_status(
    status: StatusCode,
    headers: &HeaderMap,
    context: &str,
) -> CheckResult<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(CheckError::transport(context, status_detail(status, headers)))
    }
}

/// 404 on a root listing means the repository (or its root) is absent;
/// other non-success statuses are transport failures.
pub(crate) fn check_contents_status(
    status: StatusCode,
    headers: &HeaderMap,
    resource: &str,
    context: &str,
) -> CheckResult<()> {
    if status == StatusCode::NOT_FOUND {
        return Err(CheckError::not_found(resource));
    }
    check_listing_status(status, headers, context)
}

/// Decode a contents response. A directory listing is a JSON array; anything
/// else (a file object, `null`) means the root could not be listed.
pub(crate) fn parse_root_listing(body: &str, resource: &str) -> CheckResult<Vec<ContentEntry>> {
    let decode_error =
        |e: serde_json::Error| CheckError::transport(format!("decoding {resource}"), e);
    let value: serde_json::Value = serde_json::from_str(body).map_err(decode_error)?;
    if !value.is_array() {
        return Err(CheckError::not_found(resource));
    }
    serde_json::from_value(value).map_err(decode_error)
}

/// Extract the `page` query parameter of the `rel="next"` link, if any.
pub(crate) fn next_page_from_link(headers: &HeaderMap) -> Option<u32> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let target = segments.next()?.trim();
        let is_next = segments.any(|s| s.trim() == r#"rel="next""#);
        if !is_next {
            return None;
        }
        let url = Url::parse(target.trim_start_matches('<').trim_end_matches('>')).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}

fn status_detail(status: StatusCode, headers: &HeaderMap) -> String {
    let rate_limited = headers
        .get(RATE_LIMIT_REMAINING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim() == "0")
        .unwrap_or(false);
    if rate_limited {
        format!("HTTP {status} (rate limit exhausted)")
    } else {
        format!("HTTP {status}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContentKind;
    use reqwest::header::HeaderValue;

    fn link_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(LINK, HeaderValue::from_str(value).expect("valid header"));
        headers
    }

    #[test]
    fn test_next_page_from_link_header() {
        let headers = link_headers(
            r#"<https://api.github.com/organizations/1/repos?per_page=10&page=3>; rel="next", <https://api.github.com/organizations/1/repos?per_page=10&page=7>; rel="last""#,
        );
        assert_eq!(next_page_from_link(&headers), Some(3));
    }

    #[test]
    fn test_last_page_has_no_next_link() {
        let headers = link_headers(
            r#"<https://api.github.com/organizations/1/repos?per_page=10&page=1>; rel="first", <https://api.github.com/organizations/1/repos?per_page=10&page=6>; rel="prev""#,
        );
        assert_eq!(next_page_from_link(&headers), None);
        assert_eq!(next_page_from_link(&HeaderMap::new()), None);
    }

    #[test]
    fn test_parse_root_listing_array() {
        let body = r#"[
            {"name": "README.md", "path": "README.md", "type": "file", "size": 12},
            {"name": "src", "path": "src", "type": "dir", "size": 0}
        ]"#;
        let entries = parse_root_listing(body, "acme/api root listing").expect("listing");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, ContentKind::File);
        assert_eq!(entries[1].kind, ContentKind::Directory);
    }

    #[test]
    fn test_parse_root_listing_empty_array_is_ok() {
        let entries = parse_root_listing("[]", "acme/api root listing").expect("listing");
        assert!(entries.is_empty());
    }

    #[test]
    fn test_parse_root_listing_non_array_is_not_found() {
        let err = parse_root_listing(r#"{"name": "README.md", "type": "file"}"#, "acme/api")
            .expect_err("object body");
        assert!(matches!(err, CheckError::NotFound { .. }));
        let err = parse_root_listing("null", "acme/api").expect_err("null body");
        assert!(matches!(err, CheckError::NotFound { .. }));
    }

    #[test]
    fn test_parse_root_listing_garbage_is_transport() {
        let err = parse_root_listing("<html>", "acme/api").expect_err("not json");
        assert!(matches!(err, CheckError::Transport { .. }));
    }

    #[test]
    fn test_status_detail_flags_rate_limit() {
        let mut headers = HeaderMap::new();
        headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from_static("0"));
        let detail = status_detail(StatusCode::FORBIDDEN, &headers);
        assert!(detail.contains("403"));
        assert!(detail.contains("rate limit"));
        assert!(!status_detail(StatusCode::UNAUTHORIZED, &HeaderMap::new()).contains("rate"));
    }

    fn rate_limited() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from_static("0"));
        headers
    }

    #[test]
    fn test_contents_status_mapping() {
        let none = HeaderMap::new();
        let check = |status, headers: &HeaderMap| {
            check_contents_status(status, headers, "acme/api root listing", "fetching acme/api")
        };

        assert!(check(StatusCode::OK, &none).is_ok());
        assert!(matches!(
            check(StatusCode::NOT_FOUND, &none),
            Err(CheckError::NotFound { resource }) if resource == "acme/api root listing"
        ));
        match check(StatusCode::FORBIDDEN, &rate_limited()) {
            Err(CheckError::Transport { context, detail }) => {
                assert_eq!(context, "fetching acme/api");
                assert!(detail.contains("403"));
                assert!(detail.contains("rate limit exhausted"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
        assert!(matches!(
            check(StatusCode::INTERNAL_SERVER_ERROR, &none),
            Err(CheckError::Transport { .. })
        ));
        assert!(matches!(
            check(StatusCode::UNAUTHORIZED, &none),
            Err(CheckError::Transport { .. })
        ));
    }

    #[test]
    fn test_listing_status_mapping() {
        let none = HeaderMap::new();
        assert!(check_listing_status(StatusCode::OK, &none, "listing").is_ok());
        // An unknown organization is fatal at the page level, not a skip.
        assert!(matches!(
            check_listing_status(StatusCode::NOT_FOUND, &none, "listing"),
            Err(CheckError::Transport { .. })
        ));
        match check_listing_status(StatusCode::FORBIDDEN, &rate_limited(), "listing page 2") {
            Err(CheckError::Transport { context, detail }) => {
                assert_eq!(context, "listing page 2");
                assert!(detail.contains("rate limit"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
        assert!(matches!(
            check_listing_status(StatusCode::BAD_GATEWAY, &none, "listing"),
            Err(CheckError::Transport { .. })
        ));
    }

    #[test]
    fn test_client_requires_token() {
        let result = GitHubClient::new(ClientConfig::new("https://api.github.com").with_token(""));
        assert!(matches!(result, Err(CheckError::Configuration(_))));
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let client = GitHubClient::new(
            ClientConfig::new("https://ghe.example.com/api/v3/").with_token("t"),
        )
        .expect("client");
        assert_eq!(
            client.endpoint("/orgs/acme/repos"),
            "https://ghe.example.com/api/v3/orgs/acme/repos"
        );
    }
}
