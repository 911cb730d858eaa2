//! Status lookup and reporting commands.

use crate::cli::{ReportArgs, StatusArgs};
use crate::config::Settings;
use crate::error::{CliError, Result};
use backstroke_domain::traits::StatusStore;
use backstroke_store::{Database, SqliteStatusStore};
use serde_json::Value;
use tracing::info;

/// Status store whose default TTL comes from the poller settings.
pub fn open_status_store(settings: &Settings) -> Result<SqliteStatusStore> {
    Ok(SqliteStatusStore::new(Database::open(&settings.database)?)
        .with_default_ttl(settings.poller.status_ttl()))
}

/// Look up a status record and print it as pretty JSON.
pub async fn execute_status(args: &StatusArgs, settings: &Settings) -> Result<Value> {
    let store = open_status_store(settings)?;

    let status = store
        .get(&args.id, !args.show_sensitive)
        .await?
        .ok_or_else(|| CliError::StatusNotFound(args.id.clone()))?;

    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(status)
}

/// Store a job outcome with the configured status TTL.
///
/// Returns the storage key that was written.
pub async fn execute_report(args: &ReportArgs, settings: &Settings) -> Result<String> {
    let status: Value = serde_json::from_str(&args.status)?;
    let store = open_status_store(settings)?;

    let key = store.set_default(&args.id, &status).await?;
    info!(
        "Recorded status {} (expires in {}s)",
        key, settings.poller.status_ttl_secs
    );
    Ok(key)
}
