//! GitHub REST API resolver
//!
//! Resolves the head of an upstream branch with
//! `GET /repos/{owner}/{repo}/branches/{branch}`.
//!
//! # Status mapping
//!
//! - `200`: `Some(commit.sha)`
//! - `404`: `None`, the repository or branch is gone
//! - anything else, or a transport error: [`FetchError`]

use crate::DEFAULT_BRANCH;
use async_trait::async_trait;
use backstroke_domain::traits::UpstreamResolver;
use backstroke_domain::{FetchError, LinkSyncCandidate};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default timeout for API requests (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("backstroke/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in a [`FetchError::Status`]
const MAX_ERROR_BODY: usize = 200;

/// Response from the branches API (only the fields we read)
#[derive(Deserialize)]
struct BranchResponse {
    commit: CommitRef,
}

#[derive(Deserialize)]
struct CommitRef {
    sha: String,
}

/// Upstream resolver backed by the GitHub REST API
///
/// Requests are authenticated with the link owner's access token, falling
/// back to a configured token when the owner has none.
pub struct GithubResolver {
    api_url: Url,
    client: reqwest::Client,
    fallback_token: Option<String>,
}

impl GithubResolver {
    /// Create a resolver against `api_url` (e.g. `https://api.github.com`)
    pub fn new(api_url: impl AsRef<str>) -> Result<Self, FetchError> {
        let api_url = Url::parse(api_url.as_ref())
            .map_err(|e| FetchError::Request(format!("invalid API URL: {}", e)))?;
        if api_url.cannot_be_a_base() {
            return Err(FetchError::Request(format!(
                "invalid API URL: {} cannot be a base",
                api_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self {
            api_url,
            client,
            fallback_token: None,
        })
    }

    /// Create a resolver against the public GitHub API
    pub fn default_endpoint() -> Result<Self, FetchError> {
        Self::new(DEFAULT_API_URL)
    }

    /// Token used when a link owner has no access token
    pub fn with_fallback_token(mut self, token: Option<String>) -> Self {
        self.fallback_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Each name is percent-encoded as a single path segment
    fn branch_url(&self, owner: &str, repo: &str, branch: &str) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["repos", owner, repo, "branches", branch]);
        }
        url
    }

    fn token_for<'a>(&'a self, candidate: &'a LinkSyncCandidate) -> Option<&'a str> {
        let own = candidate.owner.access_token.as_str();
        if own.is_empty() {
            self.fallback_token.as_deref()
        } else {
            Some(own)
        }
    }
}

#[async_trait]
impl UpstreamResolver for GithubResolver {
    async fn head_sha(&self, candidate: &LinkSyncCandidate) -> Result<Option<String>, FetchError> {
        let upstream = &candidate.link.upstream;
        let (Some(owner), Some(repo)) = (&upstream.owner, &upstream.repo) else {
            return Err(FetchError::IncompleteLink(candidate.id()));
        };
        let branch = upstream.branch.as_deref().unwrap_or(DEFAULT_BRANCH);
        let url = self.branch_url(owner, repo, branch);

        let mut request = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = self.token_for(candidate) {
            request = request.bearer_auth(token);
        }

        debug!("Fetching upstream head for link {}: {}", candidate.id(), url);
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: BranchResponse = response
                    .json()
                    .await
                    .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;
                Ok(Some(body.commit.sha))
            }
            status => {
                let mut message = response.text().await.unwrap_or_default();
                if message.len() > MAX_ERROR_BODY {
                    let mut cut = MAX_ERROR_BODY;
                    while !message.is_char_boundary(cut) {
                        cut -= 1;
                    }
                    message.truncate(cut);
                }
                Err(FetchError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}
