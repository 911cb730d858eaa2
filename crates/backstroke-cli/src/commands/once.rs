//! Single-cycle command.

use super::build_cycle;
use crate::config::Settings;
use crate::error::{CliError, Result};
use backstroke_poller::CycleReport;

/// Run one change-detection cycle.
///
/// Fails when the candidate query fails or any link hit a queue or
/// repository error. Upstream lookup failures are retried on a later run and
/// do not fail the command.
pub async fn execute_once(settings: &Settings) -> Result<CycleReport> {
    let cycle = build_cycle(settings).await?;
    let report = cycle.run_once().await?;

    println!("{}", report.summary());
    if report.has_failures() {
        return Err(CliError::CycleFailed(report.failed));
    }
    Ok(report)
}
