//! Continuous polling command.

use super::build_cycle;
use crate::config::Settings;
use crate::error::Result;
use backstroke_poller::Scheduler;
use std::sync::Arc;

/// Poll until Ctrl+C.
pub async fn execute_run(settings: &Settings) -> Result<()> {
    let cycle = Arc::new(build_cycle(settings).await?);
    let handle = Scheduler::from_config(cycle, &settings.poller).start();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping poller");

    let stats = handle.stats();
    handle.stop().await;
    tracing::info!(
        "Poller stopped after {} cycles ({} failed, {} skipped)",
        stats.started,
        stats.failed,
        stats.skipped
    );
    Ok(())
}
