//! One change-detection pass over all eligible links

use crate::{CycleReport, EvaluationError, LinkSyncEvaluator, PollerConfig, PollerError};
use backstroke_domain::traits::{JobQueue, LinkRepository, UpstreamResolver};
use backstroke_domain::LinkId;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Collaborators a cycle needs
#[derive(Clone)]
pub struct CycleDeps {
    /// Source of candidates and sink for bookkeeping
    pub links: Arc<dyn LinkRepository>,

    /// Upstream head lookups
    pub upstream: Arc<dyn UpstreamResolver>,

    /// Destination of sync jobs
    pub queue: Arc<dyn JobQueue>,
}

enum CandidateOutcome {
    Finished(Result<crate::Evaluation, EvaluationError>),
    TimedOut,
}

/// Finds eligible links and evaluates each one concurrently
///
/// One candidate's failure, slowness or panic never affects the others.
pub struct ChangeDetectionCycle {
    links: Arc<dyn LinkRepository>,
    evaluator: Arc<LinkSyncEvaluator>,
    staleness: chrono::Duration,
    candidate_timeout: Option<Duration>,
}

impl ChangeDetectionCycle {
    /// Create a cycle with the given staleness window
    pub fn new(deps: CycleDeps, staleness: Duration) -> Result<Self, PollerError> {
        Self::build(deps, staleness, false)
    }

    /// Create a cycle from configuration
    pub fn from_config(deps: CycleDeps, config: &PollerConfig) -> Result<Self, PollerError> {
        let cycle = Self::build(
            deps,
            config.staleness()?,
            config.preserve_sha_on_missing_upstream,
        )?;
        Ok(cycle.with_candidate_timeout(config.candidate_timeout()))
    }

    fn build(deps: CycleDeps, staleness: Duration, preserve_sha: bool) -> Result<Self, PollerError> {
        let staleness = chrono::Duration::from_std(staleness)
            .map_err(|e| PollerError::Config(format!("staleness out of range: {}", e)))?;
        eligibility_cutoff(staleness)?;
        let evaluator = LinkSyncEvaluator::new(deps.links.clone(), deps.upstream, deps.queue)
            .preserve_sha_on_missing_upstream(preserve_sha);

        Ok(Self {
            links: deps.links,
            evaluator: Arc::new(evaluator),
            staleness,
            candidate_timeout: None,
        })
    }

    /// Give up on a candidate after `timeout`
    ///
    /// A timed-out candidate gets no bookkeeping, so it stays eligible.
    pub fn with_candidate_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.candidate_timeout = timeout;
        self
    }

    /// Run one cycle to completion
    ///
    /// # Errors
    ///
    /// Only the candidate query can fail the cycle. Per-candidate failures are
    /// logged and counted in the report.
    pub async fn run_once(&self) -> Result<CycleReport, PollerError> {
        let started = Instant::now();
        let older_than = eligibility_cutoff(self.staleness)?;

        let candidates = self.links.find_sync_candidates(older_than).await?;
        if candidates.is_empty() {
            debug!("No links to update");
            return Ok(CycleReport::new(0));
        }
        info!("Checking {} links for upstream changes", candidates.len());

        let mut report = CycleReport::new(candidates.len());
        let mut tasks: JoinSet<(LinkId, CandidateOutcome)> = JoinSet::new();

        for candidate in candidates {
            let evaluator = Arc::clone(&self.evaluator);
            let timeout = self.candidate_timeout;
            tasks.spawn(async move {
                let id = candidate.id();
                let outcome = match timeout {
                    Some(limit) => {
                        match tokio::time::timeout(limit, evaluator.evaluate(&candidate)).await {
                            Ok(result) => CandidateOutcome::Finished(result),
                            Err(_) => CandidateOutcome::TimedOut,
                        }
                    }
                    None => CandidateOutcome::Finished(evaluator.evaluate(&candidate).await),
                };
                (id, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, CandidateOutcome::Finished(Ok(evaluation)))) => report.record(&evaluation),
                Ok((id, CandidateOutcome::Finished(Err(e)))) => {
                    error!("Failed to process link {}: {}", id, e);
                    report.record_failure();
                }
                Ok((id, CandidateOutcome::TimedOut)) => {
                    warn!("Link {} did not finish within the deadline", id);
                    report.record_timeout();
                }
                Err(e) => {
                    error!("Link evaluation task failed: {}", e);
                    report.record_failure();
                }
            }
        }

        report.elapsed = started.elapsed();
        info!("Cycle finished: {}", report.summary());
        Ok(report)
    }
}

/// Links last checked before this instant are eligible
fn eligibility_cutoff(staleness: chrono::Duration) -> Result<DateTime<Utc>, PollerError> {
    Utc::now().checked_sub_signed(staleness).ok_or_else(|| {
        PollerError::Config(format!(
            "staleness of {} seconds reaches before the earliest timestamp",
            staleness.num_seconds()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{candidate, MemoryLinks, MemoryQueue};
    use async_trait::async_trait;
    use backstroke_domain::{FetchError, LinkSyncCandidate};
    use backstroke_github::{Answer, StaticResolver};

    fn deps(
        links: &Arc<MemoryLinks>,
        resolver: Arc<dyn UpstreamResolver>,
        queue: &Arc<MemoryQueue>,
    ) -> CycleDeps {
        CycleDeps {
            links: links.clone(),
            upstream: resolver,
            queue: queue.clone(),
        }
    }

    fn ten_minutes() -> Duration {
        Duration::from_secs(600)
    }

    #[tokio::test]
    async fn test_no_candidates_is_a_no_op() {
        let links = Arc::new(MemoryLinks::with(vec![]));
        let resolver = Arc::new(StaticResolver::new());
        let queue = Arc::new(MemoryQueue::new());

        let cycle =
            ChangeDetectionCycle::new(deps(&links, resolver.clone(), &queue), ten_minutes())
                .unwrap();
        let report = cycle.run_once().await.unwrap();

        assert_eq!(report, CycleReport::new(0));
        assert_eq!(resolver.lookups(), 0);
        assert!(queue.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_mixed_outcomes_are_counted() {
        let links = Arc::new(MemoryLinks::with(vec![
            candidate(1, None),
            candidate(2, Some("abc")),
            candidate(3, Some("abc")),
            candidate(4, Some("abc")),
        ]));
        let resolver = Arc::new(StaticResolver::new());
        resolver.set("upstream-org/project1", "master", Answer::sha("abc"));
        resolver.set("upstream-org/project2", "master", Answer::sha("def"));
        resolver.set("upstream-org/project3", "master", Answer::sha("abc"));
        resolver.set(
            "upstream-org/project4",
            "master",
            Answer::Fail("boom".to_string()),
        );
        let queue = Arc::new(MemoryQueue::new());

        let cycle =
            ChangeDetectionCycle::new(deps(&links, resolver, &queue), ten_minutes()).unwrap();
        let report = cycle.run_once().await.unwrap();

        assert_eq!(report.candidates, 4);
        assert_eq!(report.first_sync, 1);
        assert_eq!(report.new_commits, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.fetch_failed, 1);
        assert!(!report.has_failures());
        assert_eq!(queue.jobs().len(), 2);

        let mut checked: Vec<i64> = links.checks().iter().map(|c| c.0 .0).collect();
        checked.sort();
        assert_eq!(checked, vec![1, 2, 3]);

        // Checked links fall out of the window; the failed one is retried
        let again = cycle.run_once().await.unwrap();
        assert_eq!(again.candidates, 1);
        assert_eq!(again.fetch_failed, 1);
    }

    #[tokio::test]
    async fn test_query_failure_fails_the_cycle() {
        let links = Arc::new(MemoryLinks::failing());
        let queue = Arc::new(MemoryQueue::new());
        let cycle = ChangeDetectionCycle::new(
            deps(&links, Arc::new(StaticResolver::new()), &queue),
            ten_minutes(),
        )
        .unwrap();

        assert!(matches!(
            cycle.run_once().await,
            Err(PollerError::Repository(_))
        ));
    }

    struct PanickingResolver;

    #[async_trait]
    impl UpstreamResolver for PanickingResolver {
        async fn head_sha(
            &self,
            candidate: &LinkSyncCandidate,
        ) -> Result<Option<String>, FetchError> {
            if candidate.id() == LinkId(1) {
                panic!("resolver bug");
            }
            Ok(Some("abc".to_string()))
        }
    }

    #[tokio::test]
    async fn test_panicking_candidate_is_isolated() {
        let links = Arc::new(MemoryLinks::with(vec![
            candidate(1, None),
            candidate(2, None),
        ]));
        let queue = Arc::new(MemoryQueue::new());
        let cycle = ChangeDetectionCycle::new(
            deps(&links, Arc::new(PanickingResolver), &queue),
            ten_minutes(),
        )
        .unwrap();

        let report = cycle.run_once().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.first_sync, 1);
        assert_eq!(queue.jobs()[0].link.id, LinkId(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_candidate_timeout_leaves_link_eligible() {
        let links = Arc::new(MemoryLinks::with(vec![
            candidate(1, None),
            candidate(2, None),
        ]));
        let resolver = Arc::new(StaticResolver::new());
        resolver.set("upstream-org/project1", "master", Answer::Pending);
        resolver.set("upstream-org/project2", "master", Answer::sha("abc"));
        let queue = Arc::new(MemoryQueue::new());

        let cycle = ChangeDetectionCycle::new(deps(&links, resolver, &queue), ten_minutes())
            .unwrap()
            .with_candidate_timeout(Some(Duration::from_secs(5)));
        let report = cycle.run_once().await.unwrap();

        assert_eq!(report.timed_out, 1);
        assert_eq!(report.first_sync, 1);
        let checks = links.checks();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].0, LinkId(2));
    }

    #[tokio::test]
    async fn test_from_config_applies_options() {
        let links = Arc::new(MemoryLinks::with(vec![candidate(1, Some("abc"))]));
        let resolver = Arc::new(StaticResolver::new());
        resolver.set("upstream-org/project1", "master", Answer::Missing);
        let queue = Arc::new(MemoryQueue::new());

        let config = PollerConfig {
            preserve_sha_on_missing_upstream: true,
            ..Default::default()
        };
        let cycle =
            ChangeDetectionCycle::from_config(deps(&links, resolver, &queue), &config).unwrap();
        let report = cycle.run_once().await.unwrap();

        assert_eq!(report.upstream_missing, 1);
        assert_eq!(links.checks()[0].2.as_deref(), Some("abc"));
    }

    #[test]
    fn test_staleness_beyond_timestamp_range_is_rejected() {
        let links = Arc::new(MemoryLinks::with(vec![]));
        let queue = Arc::new(MemoryQueue::new());
        let config = PollerConfig {
            staleness_threshold: "50000000 weeks".to_string(),
            ..Default::default()
        };

        assert!(matches!(config.validate(), Err(PollerError::Config(_))));
        assert!(matches!(
            ChangeDetectionCycle::from_config(
                deps(&links, Arc::new(StaticResolver::new()), &queue),
                &config
            ),
            Err(PollerError::Config(_))
        ));
        assert!(matches!(
            ChangeDetectionCycle::new(
                deps(&links, Arc::new(StaticResolver::new()), &queue),
                Duration::from_secs(50_000_000 * 7 * 24 * 60 * 60)
            ),
            Err(PollerError::Config(_))
        ));
    }
}
