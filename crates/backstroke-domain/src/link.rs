//! Link module - fork-to-upstream pairings and their owners

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of a link row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub i64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Primary key of a user row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of upstream a link tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpstreamType {
    /// A single repository
    Repo,
}

impl UpstreamType {
    /// Get the stored name of the upstream type
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamType::Repo => "repo",
        }
    }

    /// Parse an upstream type from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "repo" => Some(UpstreamType::Repo),
            _ => None,
        }
    }
}

/// Kind of fork target a link syncs into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForkType {
    /// A single fork repository
    Repo,

    /// Every fork of the upstream
    ForkAll,
}

impl ForkType {
    /// Get the stored name of the fork type
    pub fn as_str(&self) -> &'static str {
        match self {
            ForkType::Repo => "repo",
            ForkType::ForkAll => "fork-all",
        }
    }

    /// Parse a fork type from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "repo" => Some(ForkType::Repo),
            "fork-all" => Some(ForkType::ForkAll),
            _ => None,
        }
    }
}

/// A user who owns links
///
/// The access token travels with job payloads because the worker acts on the
/// owner's behalf. Status reads redact it (see [`crate::status::redact_sensitive`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier
    pub id: UserId,

    /// GitHub login
    pub username: String,

    /// Contact email, if shared
    pub email: Option<String>,

    /// GitHub account id
    pub github_id: String,

    /// OAuth token used for API calls on the user's behalf
    pub access_token: String,

    /// Registered with the `public` scope only (open source repos)
    pub public_scope: Option<bool>,

    /// When the user was created
    pub created_at: DateTime<Utc>,

    /// Last login time
    pub last_logged_in_at: DateTime<Utc>,
}

/// Upstream side of a link
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamDescriptor {
    /// Upstream kind
    #[serde(rename = "upstreamType")]
    pub kind: Option<UpstreamType>,

    /// Repository owner
    #[serde(rename = "upstreamOwner")]
    pub owner: Option<String>,

    /// Repository name
    #[serde(rename = "upstreamRepo")]
    pub repo: Option<String>,

    /// Whether the upstream is itself a fork
    #[serde(rename = "upstreamIsFork")]
    pub is_fork: Option<bool>,

    /// Cached branch list (serialized)
    #[serde(rename = "upstreamBranches")]
    pub branches: Option<String>,

    /// Branch to track
    #[serde(rename = "upstreamBranch")]
    pub branch: Option<String>,

    /// Last known commit at the head of `branch`
    #[serde(rename = "upstreamLastSHA")]
    pub last_sha: Option<String>,
}

/// Fork side of a link
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForkDescriptor {
    /// Fork kind
    #[serde(rename = "forkType")]
    pub kind: Option<ForkType>,

    /// Repository owner
    #[serde(rename = "forkOwner")]
    pub owner: Option<String>,

    /// Repository name
    #[serde(rename = "forkRepo")]
    pub repo: Option<String>,

    /// Cached branch list (serialized)
    #[serde(rename = "forkBranches")]
    pub branches: Option<String>,

    /// Branch to sync into
    #[serde(rename = "forkBranch")]
    pub branch: Option<String>,
}

/// A persisted link between an upstream and a fork
///
/// Serializes to the flat camelCase shape workers expect inside a job payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Unique identifier
    pub id: LinkId,

    /// Display name (empty names are never polled)
    pub name: String,

    /// Whether automatic syncing is on
    pub enabled: bool,

    /// Public identifier used for webhook triggers and status lookups
    pub webhook_id: Option<String>,

    /// Last time the upstream was checked
    pub last_synced_at: DateTime<Utc>,

    /// Upstream side
    #[serde(flatten)]
    pub upstream: UpstreamDescriptor,

    /// Fork side
    #[serde(flatten)]
    pub fork: ForkDescriptor,

    /// Owning user
    pub owner_id: Option<UserId>,
}

impl Link {
    /// Whether every field that identifies both repositories is present
    pub fn is_complete(&self) -> bool {
        self.upstream.kind.is_some()
            && self.upstream.owner.is_some()
            && self.upstream.repo.is_some()
            && self.fork.kind.is_some()
            && self.fork.owner.is_some()
            && self.fork.repo.is_some()
    }

    /// Whether this link is due for a sync check
    ///
    /// The rule behind `LinkRepository::find_sync_candidates`: enabled, named,
    /// complete, and last checked strictly before `older_than`.
    pub fn is_eligible(&self, older_than: DateTime<Utc>) -> bool {
        self.enabled
            && !self.name.is_empty()
            && self.is_complete()
            && self.last_synced_at < older_than
    }

    /// `owner/repo` of the upstream, when known
    pub fn upstream_slug(&self) -> Option<String> {
        match (&self.upstream.owner, &self.upstream.repo) {
            (Some(owner), Some(repo)) => Some(format!("{}/{}", owner, repo)),
            _ => None,
        }
    }
}

/// A link joined with its owner, eligible for a sync check
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSyncCandidate {
    /// The link itself
    pub link: Link,

    /// The owner snapshot taken when the candidate was queried
    pub owner: User,
}

impl LinkSyncCandidate {
    /// Identifier of the underlying link
    pub fn id(&self) -> LinkId {
        self.link.id
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn user() -> User {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        User {
            id: UserId(7),
            username: "octocat".to_string(),
            email: None,
            github_id: "583231".to_string(),
            access_token: "gho_secret".to_string(),
            public_scope: Some(false),
            created_at: at,
            last_logged_in_at: at,
        }
    }

    pub fn link(last_synced_at: DateTime<Utc>) -> Link {
        Link {
            id: LinkId(1),
            name: "my link".to_string(),
            enabled: true,
            webhook_id: Some("abc123".to_string()),
            last_synced_at,
            upstream: UpstreamDescriptor {
                kind: Some(UpstreamType::Repo),
                owner: Some("rust-lang".to_string()),
                repo: Some("rust".to_string()),
                is_fork: Some(false),
                branches: None,
                branch: Some("master".to_string()),
                last_sha: Some("abc".to_string()),
            },
            fork: ForkDescriptor {
                kind: Some(ForkType::Repo),
                owner: Some("octocat".to_string()),
                repo: Some("rust".to_string()),
                branches: None,
                branch: Some("master".to_string()),
            },
            owner_id: Some(UserId(7)),
        }
    }
}
