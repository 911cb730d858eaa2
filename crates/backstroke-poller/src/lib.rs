//! Backstroke Poller
//!
//! Periodic change detection for links: finds links that have not been checked
//! recently, compares each upstream's head commit with the last one seen, and
//! enqueues a sync job when the fork is behind.
//!
//! # Overview
//!
//! - **Evaluator**: decides `FIRST_SYNC` / `NEW_COMMITS` / nothing for one link
//!   and records the check
//! - **Cycle**: one pass over all eligible links, evaluated concurrently
//! - **Scheduler**: runs a cycle every `poll_interval_secs` until stopped
//!
//! ## Eligibility
//!
//! A link is checked when it is enabled, named, fully configured on both the
//! upstream and fork side, and its `last_synced_at` is older than the
//! staleness threshold (10 minutes by default). Bookkeeping moves
//! `last_synced_at` forward, so a link is checked at most once per window
//! unless its upstream lookup failed.
//!
//! # Usage
//!
//! ## One Cycle
//!
//! ```no_run
//! use backstroke_poller::{ChangeDetectionCycle, CycleDeps, PollerConfig};
//!
//! # async fn example(deps: CycleDeps) -> Result<(), Box<dyn std::error::Error>> {
//! let cycle = ChangeDetectionCycle::from_config(deps, &PollerConfig::default())?;
//! let report = cycle.run_once().await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Background Scheduler
//!
//! ```no_run
//! use backstroke_poller::{ChangeDetectionCycle, CycleDeps, PollerConfig, Scheduler};
//! use std::sync::Arc;
//!
//! # async fn example(deps: CycleDeps) -> Result<(), Box<dyn std::error::Error>> {
//! let config = PollerConfig::default();
//! let cycle = Arc::new(ChangeDetectionCycle::from_config(deps, &config)?);
//! let handle = Scheduler::from_config(cycle, &config).start();
//! // ...
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod cycle;
mod error;
mod evaluator;
mod metrics;
mod scheduler;

#[cfg(test)]
mod testing;

pub use config::{OverlapPolicy, PollerConfig};
pub use cycle::{ChangeDetectionCycle, CycleDeps};
pub use error::{EvaluationError, PollerError};
pub use evaluator::{decide, Decision, Evaluation, LinkSyncEvaluator};
pub use metrics::CycleReport;
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerStats};
