//! In-memory collaborators for unit tests

use async_trait::async_trait;
use backstroke_domain::traits::{JobQueue, LinkRepository};
use backstroke_domain::{
    ForkDescriptor, ForkType, Link, LinkId, LinkSyncCandidate, QueueError, QueueMessage,
    RepositoryError, SyncJob, UpstreamDescriptor, UpstreamType, User, UserId,
};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn candidate(id: i64, last_sha: Option<&str>) -> LinkSyncCandidate {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    LinkSyncCandidate {
        link: Link {
            id: LinkId(id),
            name: format!("link {}", id),
            enabled: true,
            webhook_id: None,
            last_synced_at: Utc::now() - ChronoDuration::hours(1),
            upstream: UpstreamDescriptor {
                kind: Some(UpstreamType::Repo),
                owner: Some("upstream-org".to_string()),
                repo: Some(format!("project{}", id)),
                is_fork: Some(false),
                branches: None,
                branch: Some("master".to_string()),
                last_sha: last_sha.map(str::to_string),
            },
            fork: ForkDescriptor {
                kind: Some(ForkType::Repo),
                owner: Some("octocat".to_string()),
                repo: Some(format!("project{}", id)),
                branches: None,
                branch: Some("master".to_string()),
            },
            owner_id: Some(UserId(1)),
        },
        owner: User {
            id: UserId(1),
            username: "octocat".to_string(),
            email: None,
            github_id: "583231".to_string(),
            access_token: "gho_secret".to_string(),
            public_scope: None,
            created_at: at,
            last_logged_in_at: at,
        },
    }
}

/// Link repository over a fixed candidate list
#[derive(Default)]
pub struct MemoryLinks {
    candidates: Mutex<Vec<LinkSyncCandidate>>,
    checks: Mutex<Vec<(LinkId, DateTime<Utc>, Option<String>)>>,
    queries: AtomicUsize,
    query_delay: Option<Duration>,
    fail_query: bool,
}

impl MemoryLinks {
    pub fn with(candidates: Vec<LinkSyncCandidate>) -> Self {
        Self {
            candidates: Mutex::new(candidates),
            ..Default::default()
        }
    }

    /// Candidate query sleeps for `delay` before answering
    pub fn slow(delay: Duration) -> Self {
        Self {
            query_delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_query: true,
            ..Default::default()
        }
    }

    pub fn checks(&self) -> Vec<(LinkId, DateTime<Utc>, Option<String>)> {
        self.checks.lock().unwrap().clone()
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkRepository for MemoryLinks {
    async fn find_sync_candidates(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<LinkSyncCandidate>, RepositoryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_query {
            return Err(RepositoryError::Backend("database is locked".to_string()));
        }
        Ok(self
            .candidates
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.link.is_eligible(older_than))
            .cloned()
            .collect())
    }

    async fn record_sync_check(
        &self,
        id: LinkId,
        checked_at: DateTime<Utc>,
        upstream_sha: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut candidates = self.candidates.lock().unwrap();
        let candidate = candidates
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or(RepositoryError::NotFound(id))?;
        candidate.link.last_synced_at = checked_at;
        candidate.link.upstream.last_sha = upstream_sha.map(str::to_string);

        self.checks
            .lock()
            .unwrap()
            .push((id, checked_at, upstream_sha.map(str::to_string)));
        Ok(())
    }
}

/// Queue that keeps pushed jobs in a vector
#[derive(Default)]
pub struct MemoryQueue {
    jobs: Mutex<Vec<SyncJob>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<SyncJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    fn name(&self) -> &str {
        "memory"
    }

    async fn initialize(&self) -> Result<(), QueueError> {
        Ok(())
    }

    async fn push(&self, job: &SyncJob) -> Result<String, QueueError> {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.push(job.clone());
        Ok(format!("msg{}", jobs.len()))
    }

    async fn pop(&self) -> Result<Option<QueueMessage>, QueueError> {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.is_empty() {
            return Ok(None);
        }
        let job = jobs.remove(0);
        Ok(Some(QueueMessage {
            id: "msg".to_string(),
            payload: serde_json::to_string(&job)?,
        }))
    }
}

/// Queue whose pushes always fail
pub struct FailingQueue;

#[async_trait]
impl JobQueue for FailingQueue {
    fn name(&self) -> &str {
        "failing"
    }

    async fn initialize(&self) -> Result<(), QueueError> {
        Ok(())
    }

    async fn push(&self, _job: &SyncJob) -> Result<String, QueueError> {
        Err(QueueError::Backend("connection refused".to_string()))
    }

    async fn pop(&self) -> Result<Option<QueueMessage>, QueueError> {
        Ok(None)
    }
}
