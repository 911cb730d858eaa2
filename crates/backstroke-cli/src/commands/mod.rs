//! Command implementations.

pub mod once;
pub mod run;
pub mod status;

pub use self::once::execute_once;
pub use self::run::execute_run;
pub use self::status::{execute_report, execute_status, open_status_store};

use crate::config::Settings;
use crate::error::Result;
use backstroke_domain::traits::JobQueue;
use backstroke_github::GithubResolver;
use backstroke_poller::{ChangeDetectionCycle, CycleDeps};
use backstroke_store::{Database, SqliteJobQueue, SqliteStore};
use std::sync::Arc;

/// Open the database, initialize the queue and build a cycle.
async fn build_cycle(settings: &Settings) -> Result<ChangeDetectionCycle> {
    let db = Database::open(&settings.database)?;

    let queue = SqliteJobQueue::new(db.clone(), settings.poller.queue_name.as_str());
    queue.initialize().await?;

    let resolver = GithubResolver::new(settings.github_api_url.as_str())?
        .with_fallback_token(settings.github_token.clone());

    let deps = CycleDeps {
        links: Arc::new(SqliteStore::new(db)),
        upstream: Arc::new(resolver),
        queue: Arc::new(queue),
    };
    Ok(ChangeDetectionCycle::from_config(deps, &settings.poller)?)
}
