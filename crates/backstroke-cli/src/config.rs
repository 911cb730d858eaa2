//! Settings resolution for the CLI.
//!
//! Precedence, lowest first: built-in defaults, the TOML config file,
//! then command-line flags and their environment variables.

use crate::cli::Cli;
use crate::error::Result;
use backstroke_poller::PollerConfig;
use std::path::PathBuf;

/// Everything a command needs to wire up the poller.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Poller configuration after overrides
    pub poller: PollerConfig,

    /// SQLite database path
    pub database: PathBuf,

    /// Fallback GitHub token
    pub github_token: Option<String>,

    /// GitHub API base URL
    pub github_api_url: String,
}

impl Settings {
    /// Resolve settings from parsed arguments.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut poller = match &cli.config {
            Some(path) => PollerConfig::from_file(path)?,
            None => PollerConfig::default(),
        };

        if let Some(duration) = &cli.sync_duration {
            poller.staleness_threshold = duration.clone();
        }
        if let Some(queue_name) = &cli.queue_name {
            poller.queue_name = queue_name.clone();
        }
        poller.validate()?;

        Ok(Self {
            poller,
            database: cli.database.clone(),
            github_token: cli.github_token.clone(),
            github_api_url: cli.github_api_url.clone(),
        })
    }
}
