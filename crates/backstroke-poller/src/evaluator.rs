//! Per-link sync decision and bookkeeping
//!
//! For one candidate the evaluator:
//!
//! 1. Resolves the upstream head SHA
//! 2. Decides whether a sync job is needed ([`decide`])
//! 3. Enqueues an `AUTOMATIC` job if so
//! 4. Records the check (`last_synced_at = now`, `upstream_last_sha = head`)
//!
//! A fetch failure stops at step 1 with no side effects, so the link stays
//! eligible and is retried on the next tick. A queue failure stops at step 3
//! without bookkeeping.

use crate::EvaluationError;
use backstroke_domain::traits::{JobQueue, LinkRepository, UpstreamResolver};
use backstroke_domain::{EnqueueReason, LinkSyncCandidate, SyncJob};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What to do with a candidate given the stored and observed SHAs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Enqueue a sync job for this reason
    Enqueue(EnqueueReason),

    /// Nothing changed upstream
    Skip,

    /// The upstream has no head (e.g. deleted); nothing to sync
    UpstreamMissing,
}

/// Outcome of evaluating one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// A job was enqueued and the check recorded
    Enqueued {
        /// Why the job was enqueued
        reason: EnqueueReason,
        /// Queue message id of the job
        message_id: String,
    },

    /// Upstream unchanged; the check was recorded
    Unchanged,

    /// Upstream has no head; the check was recorded
    UpstreamMissing,

    /// The upstream lookup failed; nothing was changed
    FetchFailed,
}

/// Decide whether a link needs a sync job
///
/// Empty SHAs count as absent.
///
/// | stored  | head    | decision          |
/// |---------|---------|-------------------|
/// | absent  | any     | `FIRST_SYNC`      |
/// | `a`     | absent  | upstream missing  |
/// | `a`     | `b`     | `NEW_COMMITS`     |
/// | `a`     | `a`     | skip              |
pub fn decide(stored: Option<&str>, head: Option<&str>) -> Decision {
    let stored = stored.filter(|s| !s.is_empty());
    let head = head.filter(|s| !s.is_empty());
    match (stored, head) {
        (None, _) => Decision::Enqueue(EnqueueReason::FirstSync),
        (Some(_), None) => Decision::UpstreamMissing,
        (Some(stored), Some(head)) if stored != head => {
            Decision::Enqueue(EnqueueReason::NewCommits)
        }
        (Some(_), Some(_)) => Decision::Skip,
    }
}

/// Evaluates candidates against their upstream and enqueues sync jobs
pub struct LinkSyncEvaluator {
    links: Arc<dyn LinkRepository>,
    upstream: Arc<dyn UpstreamResolver>,
    queue: Arc<dyn JobQueue>,
    preserve_sha_on_missing_upstream: bool,
}

impl LinkSyncEvaluator {
    /// Create an evaluator over the given collaborators
    pub fn new(
        links: Arc<dyn LinkRepository>,
        upstream: Arc<dyn UpstreamResolver>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            links,
            upstream,
            queue,
            preserve_sha_on_missing_upstream: false,
        }
    }

    /// Keep the stored SHA instead of clearing it when the upstream head is absent
    pub fn preserve_sha_on_missing_upstream(mut self, preserve: bool) -> Self {
        self.preserve_sha_on_missing_upstream = preserve;
        self
    }

    /// Evaluate one candidate
    ///
    /// # Errors
    ///
    /// Returns an error if enqueueing or bookkeeping fails. Upstream lookup
    /// failures are reported as [`Evaluation::FetchFailed`] instead.
    pub async fn evaluate(
        &self,
        candidate: &LinkSyncCandidate,
    ) -> Result<Evaluation, EvaluationError> {
        let id = candidate.id();
        let stored = candidate.link.upstream.last_sha.as_deref();

        let head = match self.upstream.head_sha(candidate).await {
            Ok(head) => head,
            Err(e) => {
                warn!("Failed to resolve upstream head for link {}: {}", id, e);
                return Ok(Evaluation::FetchFailed);
            }
        };

        let decision = decide(stored, head.as_deref());
        debug!(
            "Link {}: stored={:?} head={:?} -> {:?}",
            id, stored, head, decision
        );

        let evaluation = match decision {
            Decision::Enqueue(reason) => {
                let message_id = self.queue.push(&SyncJob::automatic(candidate)).await?;
                info!(
                    "Enqueued sync job {} for link {} ({})",
                    message_id, id, reason
                );
                Evaluation::Enqueued { reason, message_id }
            }
            Decision::Skip => Evaluation::Unchanged,
            Decision::UpstreamMissing => {
                warn!(
                    "Upstream head for link {} is missing (last known: {:?}), not syncing",
                    id, stored
                );
                Evaluation::UpstreamMissing
            }
        };

        let recorded_sha = match (&evaluation, self.preserve_sha_on_missing_upstream) {
            (Evaluation::UpstreamMissing, true) => stored,
            _ => head.as_deref(),
        };
        self.links
            .record_sync_check(id, Utc::now(), recorded_sha)
            .await?;

        Ok(evaluation)
    }
}
