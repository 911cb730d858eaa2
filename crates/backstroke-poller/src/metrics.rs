//! Outcome counters for change-detection cycles

use crate::Evaluation;
use backstroke_domain::EnqueueReason;
use std::time::Duration;

/// Counts of candidate outcomes for one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Candidates returned by the query
    pub candidates: usize,

    /// Jobs enqueued because no SHA was stored yet
    pub first_sync: usize,

    /// Jobs enqueued because the upstream head moved
    pub new_commits: usize,

    /// Candidates whose upstream head was unchanged
    pub unchanged: usize,

    /// Candidates whose upstream has no head
    pub upstream_missing: usize,

    /// Candidates whose upstream lookup failed (retried next tick)
    pub fetch_failed: usize,

    /// Candidates whose enqueue or bookkeeping failed, or whose task panicked
    pub failed: usize,

    /// Candidates that did not finish before the per-candidate deadline
    pub timed_out: usize,

    /// Wall time of the cycle
    pub elapsed: Duration,
}

impl CycleReport {
    /// Create an empty report for `candidates` candidates
    pub fn new(candidates: usize) -> Self {
        Self {
            candidates,
            ..Default::default()
        }
    }

    /// Record a finished evaluation
    pub fn record(&mut self, evaluation: &Evaluation) {
        match evaluation {
            Evaluation::Enqueued {
                reason: EnqueueReason::FirstSync,
                ..
            } => self.first_sync += 1,
            Evaluation::Enqueued {
                reason: EnqueueReason::NewCommits,
                ..
            } => self.new_commits += 1,
            Evaluation::Unchanged => self.unchanged += 1,
            Evaluation::UpstreamMissing => self.upstream_missing += 1,
            Evaluation::FetchFailed => self.fetch_failed += 1,
        }
    }

    /// Record a candidate that errored or panicked
    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Record a candidate that hit the deadline
    pub fn record_timeout(&mut self) {
        self.timed_out += 1;
    }

    /// Jobs enqueued in this cycle
    pub fn total_enqueued(&self) -> usize {
        self.first_sync + self.new_commits
    }

    /// Candidates that reached an outcome (including failures)
    pub fn total_processed(&self) -> usize {
        self.total_enqueued()
            + self.unchanged
            + self.upstream_missing
            + self.fetch_failed
            + self.failed
            + self.timed_out
    }

    /// Whether any candidate failed in a way that is not retried automatically
    ///
    /// Fetch failures and timeouts leave the link eligible and do not count.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} candidates in {:?}: {} enqueued ({} first sync, {} new commits), {} unchanged, {} upstream missing, {} fetch failed, {} failed, {} timed out",
            self.candidates,
            self.elapsed,
            self.total_enqueued(),
            self.first_sync,
            self.new_commits,
            self.unchanged,
            self.upstream_missing,
            self.fetch_failed,
            self.failed,
            self.timed_out
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_creation() {
        let report = CycleReport::new(3);
        assert_eq!(report.candidates, 3);
        assert_eq!(report.total_enqueued(), 0);
        assert_eq!(report.total_processed(), 0);
        assert!(!report.has_failures());
    }

    #[test]
    fn test_record_outcomes() {
        let mut report = CycleReport::new(6);
        report.record(&Evaluation::Enqueued {
            reason: EnqueueReason::FirstSync,
            message_id: "a".to_string(),
        });
        report.record(&Evaluation::Enqueued {
            reason: EnqueueReason::NewCommits,
            message_id: "b".to_string(),
        });
        report.record(&Evaluation::Unchanged);
        report.record(&Evaluation::UpstreamMissing);
        report.record(&Evaluation::FetchFailed);
        report.record_timeout();

        assert_eq!(report.total_enqueued(), 2);
        assert_eq!(report.total_processed(), 6);
        assert!(!report.has_failures());

        report.record_failure();
        assert!(report.has_failures());
    }

    #[test]
    fn test_summary() {
        let mut report = CycleReport::new(1);
        report.record(&Evaluation::Unchanged);
        let summary = report.summary();
        assert!(summary.starts_with("1 candidates"));
        assert!(summary.contains("1 unchanged"));
        assert!(summary.contains("0 enqueued"));
    }
}
