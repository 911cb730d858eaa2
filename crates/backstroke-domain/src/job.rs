//! Job module - queued sync work and its wire format

use crate::link::{Link, LinkSyncCandidate, User};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who asked for a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    /// Enqueued by the change-detection poller
    Automatic,

    /// Enqueued by a webhook or user request
    Manual,
}

/// Why the poller enqueued a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnqueueReason {
    /// No upstream SHA has ever been recorded for the link
    FirstSync,

    /// The upstream head moved since the last check
    NewCommits,
}

impl EnqueueReason {
    /// Get the reason name as it appears in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            EnqueueReason::FirstSync => "FIRST_SYNC",
            EnqueueReason::NewCommits => "NEW_COMMITS",
        }
    }
}

impl fmt::Display for EnqueueReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request for a worker to sync one link
///
/// Wire format: `{"type": "AUTOMATIC"|"MANUAL", "user": {..}, "link": {..}, "fromRequest": null|{..}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncJob {
    /// Job origin
    #[serde(rename = "type")]
    pub kind: JobType,

    /// Owner snapshot
    pub user: User,

    /// Link snapshot
    pub link: Link,

    /// Request context for manual jobs
    #[serde(rename = "fromRequest")]
    pub from_request: Option<serde_json::Value>,
}

impl SyncJob {
    /// Build the job the poller enqueues for a candidate
    pub fn automatic(candidate: &LinkSyncCandidate) -> Self {
        Self {
            kind: JobType::Automatic,
            user: candidate.owner.clone(),
            link: candidate.link.clone(),
            from_request: None,
        }
    }
}

/// A message taken off the job queue
///
/// The payload is kept serialized: a malformed body must not be lost on the
/// floor by the queue itself, since popping already removed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Queue-assigned unique identifier
    pub id: String,

    /// Serialized job
    pub payload: String,
}

impl QueueMessage {
    /// Decode the payload as a [`SyncJob`]
    pub fn decode(&self) -> Result<SyncJob, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}
