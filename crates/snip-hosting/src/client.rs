use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use snip_config::HostingConfig;
use snip_core::Secret;

use crate::HostingError;
use crate::location::BlobLocation;
use crate::status::{FetchOutcome, FetchStatus};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const CLIENT_USER_AGENT: &str = concat!("snip/", env!("CARGO_PKG_VERSION"));
const COMMITS_PER_PAGE: usize = 100;
const MAX_COMMIT_PAGES: usize = 10;

/// Content and history provider for upstream files.
pub trait SourceHost {
    /// Content at the ref named in the location.
    fn fetch_file(&self, location: &BlobLocation) -> FetchOutcome;

    /// Content at an explicit commit.
    fn file_at_revision(&self, location: &BlobLocation, sha: &str) -> FetchOutcome;

    /// Commits touching the location's path, newest first.
    fn commits_for_path(&self, location: &BlobLocation) -> Result<Vec<CommitRef>, HostingError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    /// Unix timestamp when the quota resets.
    pub reset: u64,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: RateLimit,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_base: String,
    token: Secret,
}

impl GitHubClient {
    pub fn new(config: &HostingConfig, token: Secret) -> Result<Self, HostingError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            token,
        })
    }

    /// Returns the login the token belongs to.
    pub fn validate_token(&self) -> Result<String, HostingError> {
        let response = self.get(&format!("{}/user", self.api_base), &[])?;
        let response = ensure_success(response)?;
        Ok(response.json::<UserResponse>()?.login)
    }

    pub fn rate_limit(&self) -> Result<RateLimit, HostingError> {
        let response = self.get(&format!("{}/rate_limit", self.api_base), &[])?;
        let response = ensure_success(response)?;
        Ok(response.json::<RateLimitResponse>()?.resources.core)
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, reqwest::Error> {
        self.client
            .get(url)
            .bearer_auth(self.token.expose())
            .query(query)
            .send()
    }

    fn fetch_at(&self, location: &BlobLocation, reference: &str) -> FetchOutcome {
        let url = location.contents_endpoint(&self.api_base);
        let response = match self.get(&url, &[("ref", reference)]) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(url = %location, error = %err, "content request failed");
                return FetchOutcome::failed(FetchStatus::RequestException, None);
            }
        };

        let code = response.status().as_u16();
        if !response.status().is_success() {
            tracing::warn!(url = %location, status = code, "content request rejected");
            return FetchOutcome::failed(FetchStatus::from_http(code), Some(code));
        }

        let body = match response.json::<ContentResponse>() {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(url = %location, error = %err, "content response unreadable");
                return FetchOutcome::failed(FetchStatus::OtherError, Some(code));
            }
        };

        match body.content.as_deref().map(decode_content) {
            None => FetchOutcome::failed(FetchStatus::EmptyContent, Some(code)),
            Some(Ok(content)) if content.is_empty() => {
                FetchOutcome::failed(FetchStatus::EmptyContent, Some(code))
            }
            Some(Ok(content)) => {
                tracing::debug!(url = %location, chars = content.len(), "fetched content");
                FetchOutcome::success(content)
            }
            Some(Err(err)) => {
                tracing::warn!(url = %location, error = %err, "content is not valid base64");
                FetchOutcome::failed(FetchStatus::OtherError, Some(code))
            }
        }
    }
}

impl SourceHost for GitHubClient {
    fn fetch_file(&self, location: &BlobLocation) -> FetchOutcome {
        self.fetch_at(location, &location.reference)
    }

    fn file_at_revision(&self, location: &BlobLocation, sha: &str) -> FetchOutcome {
        self.fetch_at(location, sha)
    }

    fn commits_for_path(&self, location: &BlobLocation) -> Result<Vec<CommitRef>, HostingError> {
        let url = location.commits_endpoint(&self.api_base);
        let per_page = COMMITS_PER_PAGE.to_string();

        let listing = collect_commit_pages(|page| {
            let page = page.to_string();
            let response = self.get(
                &url,
                &[
                    ("path", location.path.as_str()),
                    ("per_page", per_page.as_str()),
                    ("page", page.as_str()),
                ],
            )?;
            Ok(ensure_success(response)?.json::<Vec<CommitRef>>()?)
        })?;

        if listing.truncated {
            tracing::warn!(
                url = %location,
                commits = listing.commits.len(),
                "commit listing hit the page cap; oldest revision is the oldest listed"
            );
        }
        Ok(listing.commits)
    }
}

#[derive(Debug)]
struct CommitListing {
    commits: Vec<CommitRef>,
    /// Every allowed page came back full, so older commits may exist.
    truncated: bool,
}

fn collect_commit_pages(
    mut fetch_page: impl FnMut(usize) -> Result<Vec<CommitRef>, HostingError>,
) -> Result<CommitListing, HostingError> {
    let mut commits = Vec::new();
    for page in 1..=MAX_COMMIT_PAGES {
        let batch = fetch_page(page)?;
        let done = batch.len() < COMMITS_PER_PAGE;
        commits.extend(batch);
        if done {
            return Ok(CommitListing {
                commits,
                truncated: false,
            });
        }
    }
    Ok(CommitListing {
        commits,
        truncated: true,
    })
}

fn ensure_success(response: Response) -> Result<Response, HostingError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    Err(HostingError::Status {
        status: status.as_u16(),
        url,
    })
}

/// Decodes the API's base64 payload, which is wrapped at 60 columns.
pub fn decode_content(encoded: &str) -> Result<String, base64::DecodeError> {
    let compact = encoded
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>();
    let bytes = STANDARD.decode(compact)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use snip_config::HostingConfig;
    use snip_core::Secret;

    use super::{
        COMMITS_PER_PAGE, CommitRef, GitHubClient, MAX_COMMIT_PAGES, collect_commit_pages,
        decode_content,
    };

    fn page_of(len: usize, page: usize) -> Vec<CommitRef> {
        (0..len)
            .map(|index| CommitRef {
                sha: format!("p{page}-{index}"),
            })
            .collect()
    }

    #[test]
    fn decodes_wrapped_base64_content() {
        let encoded = "ZGVmIGYoKToKICAgIHJl\ndHVybiAx\n";
        assert_eq!(
            decode_content(encoded).expect("decode"),
            "def f():\n    return 1"
        );
        assert!(decode_content("not base64!").is_err());
    }

    #[test]
    fn client_builds_from_config() {
        let config = HostingConfig {
            api_base: "https://ghe.example.com/api/v3/".to_owned(),
            ..HostingConfig::default()
        };
        let client = GitHubClient::new(&config, Secret::new("ghp_test".to_owned()))
            .expect("client");

        assert_eq!(client.api_base, "https://ghe.example.com/api/v3");
        assert!(!format!("{client:?}").contains("ghp_test"));
    }

    #[test]
    fn short_page_ends_the_listing() {
        let mut requested = Vec::new();
        let listing = collect_commit_pages(|page| {
            requested.push(page);
            Ok(page_of(if page == 1 { COMMITS_PER_PAGE } else { 3 }, page))
        })
        .expect("listing");

        assert_eq!(requested, vec![1, 2]);
        assert_eq!(listing.commits.len(), COMMITS_PER_PAGE + 3);
        assert!(!listing.truncated);
    }

    #[test]
    fn full_pages_up_to_the_cap_mark_the_listing_truncated() {
        let mut requests = 0;
        let listing = collect_commit_pages(|page| {
            requests += 1;
            Ok(page_of(COMMITS_PER_PAGE, page))
        })
        .expect("listing");

        assert_eq!(requests, MAX_COMMIT_PAGES);
        assert_eq!(listing.commits.len(), COMMITS_PER_PAGE * MAX_COMMIT_PAGES);
        assert!(listing.truncated);
        assert_eq!(
            listing.commits.last().map(|commit| commit.sha.as_str()),
            Some("p10-99")
        );
    }
}
