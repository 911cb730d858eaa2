//! Background scheduler for continuous change detection

use crate::{ChangeDetectionCycle, OverlapPolicy, PollerConfig};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Counters shared between the scheduler loop and its cycles
#[derive(Debug, Default)]
struct SchedulerCounters {
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    in_flight: AtomicUsize,
}

/// Point-in-time copy of scheduler counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Cycles started
    pub started: u64,

    /// Cycles that ran to completion (including ones with per-link failures)
    pub completed: u64,

    /// Cycles whose candidate query failed
    pub failed: u64,

    /// Ticks skipped because a cycle was still running
    pub skipped: u64,

    /// Cycles running right now
    pub in_flight: usize,
}

/// Decrements the in-flight count when a cycle task ends, even by panic
struct InFlight(Arc<SchedulerCounters>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs a [`ChangeDetectionCycle`] on a fixed interval
///
/// The first cycle starts immediately. Each tick spawns its cycle as a
/// separate task, so a slow cycle never delays the next tick. Whether ticks
/// may overlap is controlled by [`OverlapPolicy`].
///
/// # Examples
///
/// ```no_run
/// use backstroke_poller::{ChangeDetectionCycle, CycleDeps, PollerConfig, Scheduler};
/// use std::sync::Arc;
///
/// # async fn example(deps: CycleDeps) -> Result<(), Box<dyn std::error::Error>> {
/// let config = PollerConfig::default();
/// let cycle = Arc::new(ChangeDetectionCycle::from_config(deps, &config)?);
/// let handle = Scheduler::from_config(cycle, &config).start();
///
/// tokio::signal::ctrl_c().await?;
/// handle.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Scheduler {
    cycle: Arc<ChangeDetectionCycle>,
    interval: Duration,
    overlap: OverlapPolicy,
}

impl Scheduler {
    /// Create a scheduler ticking every `interval`
    pub fn new(cycle: Arc<ChangeDetectionCycle>, interval: Duration, overlap: OverlapPolicy) -> Self {
        Self {
            cycle,
            interval,
            overlap,
        }
    }

    /// Create a scheduler from configuration
    pub fn from_config(cycle: Arc<ChangeDetectionCycle>, config: &PollerConfig) -> Self {
        Self::new(cycle, config.poll_interval(), config.overlap_policy)
    }

    /// Start ticking in the background
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let counters = Arc::new(SchedulerCounters::default());
        let task = tokio::spawn(self.run(shutdown_rx, Arc::clone(&counters)));

        SchedulerHandle {
            shutdown_tx,
            task,
            counters,
        }
    }

    async fn run(self, mut shutdown_rx: broadcast::Receiver<()>, counters: Arc<SchedulerCounters>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Change detection started (interval: {:?}, overlap: {:?})",
            self.interval,
            self.overlap
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick(&counters),
                // Fires on an explicit stop and when the handle is dropped
                _ = shutdown_rx.recv() => break,
            }
        }

        tracing::info!("Change detection stopped");
    }

    fn tick(&self, counters: &Arc<SchedulerCounters>) {
        let previous = counters.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(Arc::clone(counters));

        if self.overlap == OverlapPolicy::Skip && previous > 0 {
            counters.skipped.fetch_add(1, Ordering::SeqCst);
            tracing::warn!("Previous cycle still running, skipping tick");
            return;
        }

        counters.started.fetch_add(1, Ordering::SeqCst);
        let cycle = Arc::clone(&self.cycle);
        let counters = Arc::clone(counters);

        tokio::spawn(async move {
            let _guard = guard;
            match cycle.run_once().await {
                Ok(_) => {
                    counters.completed.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::SeqCst);
                    tracing::error!("Change detection cycle failed: {}", e);
                }
            }
        });
    }
}

/// Handle to a running scheduler
///
/// Dropping the handle also stops the scheduler.
pub struct SchedulerHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
    counters: Arc<SchedulerCounters>,
}

impl SchedulerHandle {
    /// Stop scheduling new cycles
    ///
    /// Returns once the tick loop has exited. Cycles already running are not
    /// cancelled and finish in the background.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            tracing::error!("Scheduler task failed: {}", e);
        }
    }

    /// Whether the tick loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Current counters
    pub fn stats(&self) -> SchedulerStats {
        let c = &self.counters;
        SchedulerStats {
            started: c.started.load(Ordering::SeqCst),
            completed: c.completed.load(Ordering::SeqCst),
            failed: c.failed.load(Ordering::SeqCst),
            skipped: c.skipped.load(Ordering::SeqCst),
            in_flight: c.in_flight.load(Ordering::SeqCst),
        }
    }
}
