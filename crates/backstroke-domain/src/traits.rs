//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the change-detection logic and
//! infrastructure. Implementations live in other crates (`backstroke-store`,
//! `backstroke-github`). All of them are object safe and `Send + Sync` so the
//! poller can share one instance across concurrently evaluated candidates.

use crate::error::{FetchError, QueueError, RepositoryError, StatusStoreError};
use crate::job::{QueueMessage, SyncJob};
use crate::link::{LinkId, LinkSyncCandidate};
use crate::status::DEFAULT_STATUS_TTL;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

/// Read/write access to links
///
/// Implemented by the infrastructure layer (backstroke-store)
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// All links due for a sync check, joined with their owners
    ///
    /// A link qualifies when it is enabled, has a non-empty name, every
    /// upstream/fork identifying field is set, and `last_synced_at < older_than`.
    async fn find_sync_candidates(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<LinkSyncCandidate>, RepositoryError>;

    /// Record that a link was checked, storing the observed upstream head
    async fn record_sync_check(
        &self,
        id: LinkId,
        checked_at: DateTime<Utc>,
        upstream_sha: Option<&str>,
    ) -> Result<(), RepositoryError>;
}

/// Resolves the current head commit of a candidate's upstream branch
///
/// Implemented by the infrastructure layer (backstroke-github)
#[async_trait]
pub trait UpstreamResolver: Send + Sync {
    /// Head SHA of the upstream branch
    ///
    /// `Ok(None)` means the lookup succeeded but there is no head, e.g. the
    /// upstream repository was deleted.
    async fn head_sha(&self, candidate: &LinkSyncCandidate) -> Result<Option<String>, FetchError>;
}

/// Durable FIFO of sync jobs
///
/// # Delivery guarantee
///
/// `pop` is destructive: the message is gone as soon as it is returned. There is
/// no lease, visibility timeout or redelivery, so a consumer that fails after
/// popping loses the job. This is weaker than at-least-once delivery on the
/// consumer side.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Name of the underlying queue
    fn name(&self) -> &str;

    /// Ensure the queue exists
    ///
    /// Idempotent: an already existing queue is success. Any other failure is
    /// returned.
    async fn initialize(&self) -> Result<(), QueueError>;

    /// Serialize and append a job, returning the new message id
    async fn push(&self, job: &SyncJob) -> Result<String, QueueError>;

    /// Remove and return the oldest message, or `None` when the queue is empty
    ///
    /// Non-blocking: never waits for a message to arrive.
    async fn pop(&self) -> Result<Option<QueueMessage>, QueueError>;
}

/// TTL-keyed status cache for job outcomes
///
/// Keys are webhook/status ids; implementations namespace them with
/// [`crate::status::status_key`].
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Store `status` under `id` for `ttl`, overwriting any previous value
    ///
    /// Returns the storage key that was written.
    async fn set(&self, id: &str, status: &Value, ttl: Duration)
        -> Result<String, StatusStoreError>;

    /// Stored status for `id`, or `None` if absent or expired
    ///
    /// With `hide_sensitive`, credentials are stripped from the payload.
    async fn get(&self, id: &str, hide_sensitive: bool) -> Result<Option<Value>, StatusStoreError>;

    /// TTL applied by [`StatusStore::set_default`]
    fn default_ttl(&self) -> Duration {
        DEFAULT_STATUS_TTL
    }

    /// Store `status` with the default TTL
    async fn set_default(&self, id: &str, status: &Value) -> Result<String, StatusStoreError> {
        self.set(id, status, self.default_ttl()).await
    }

    /// Stored status for `id` with credentials stripped
    async fn get_redacted(&self, id: &str) -> Result<Option<Value>, StatusStoreError> {
        self.get(id, true).await
    }
}
