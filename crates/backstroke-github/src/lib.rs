//! Backstroke Upstream Resolvers
//!
//! Implementations of the `UpstreamResolver` trait from `backstroke-domain`.
//!
//! # Resolvers
//!
//! - `GithubResolver`: Looks up branch heads through the GitHub REST API
//! - `StaticResolver`: Scripted answers for tests and local runs
//!
//! # Examples
//!
//! ```
//! use backstroke_github::{StaticResolver, Answer};
//!
//! let resolver = StaticResolver::new();
//! resolver.set("rust-lang/rust", "master", Answer::sha("abc"));
//! assert_eq!(resolver.lookups(), 0);
//! ```

#![warn(missing_docs)]

pub mod github;

use async_trait::async_trait;
use backstroke_domain::traits::UpstreamResolver;
use backstroke_domain::{FetchError, LinkSyncCandidate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub use github::GithubResolver;

/// Branch used when a link does not name one
pub const DEFAULT_BRANCH: &str = "master";

/// Scripted outcome of a lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Lookup succeeds with this head SHA
    Sha(String),

    /// Lookup succeeds but the branch has no head (deleted upstream)
    Missing,

    /// Lookup fails with this message
    Fail(String),

    /// Lookup never completes
    Pending,
}

impl Answer {
    /// Shorthand for [`Answer::Sha`]
    pub fn sha(sha: impl Into<String>) -> Self {
        Answer::Sha(sha.into())
    }
}

/// Resolver that answers from a fixed table
///
/// Keys are `owner/repo` plus a branch. Unknown keys fail, like an API error
/// would.
#[derive(Debug, Default)]
pub struct StaticResolver {
    answers: Mutex<HashMap<(String, String), Answer>>,
    lookups: AtomicUsize,
}

impl StaticResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the answer for `slug` (`owner/repo`) at `branch`
    pub fn set(&self, slug: &str, branch: &str, answer: Answer) {
        if let Ok(mut answers) = self.answers.lock() {
            answers.insert((slug.to_string(), branch.to_string()), answer);
        }
    }

    /// Number of lookups performed so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn answer_for(&self, candidate: &LinkSyncCandidate) -> Answer {
        let Some(slug) = candidate.link.upstream_slug() else {
            return Answer::Fail(format!("link {} has no upstream", candidate.id()));
        };
        let branch = candidate
            .link
            .upstream
            .branch
            .clone()
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());

        self.answers
            .lock()
            .ok()
            .and_then(|answers| answers.get(&(slug.clone(), branch.clone())).cloned())
            .unwrap_or_else(|| Answer::Fail(format!("no scripted answer for {}:{}", slug, branch)))
    }
}

#[async_trait]
impl UpstreamResolver for StaticResolver {
    async fn head_sha(&self, candidate: &LinkSyncCandidate) -> Result<Option<String>, FetchError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        match self.answer_for(candidate) {
            Answer::Sha(sha) => Ok(Some(sha)),
            Answer::Missing => Ok(None),
            Answer::Fail(message) => Err(FetchError::Request(message)),
            Answer::Pending => std::future::pending().await,
        }
    }
}
