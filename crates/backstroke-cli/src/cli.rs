//! CLI command definitions and argument parsing.

use backstroke_github::github::DEFAULT_API_URL;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Backstroke poller - keeps forks in sync with their upstream repositories.
#[derive(Debug, Parser)]
#[command(name = "backstroke-poller")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, env = "BACKSTROKE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database holding links, the job queue and status records
    #[arg(long, env = "BACKSTROKE_DATABASE", default_value = "backstroke.db", global = true)]
    pub database: PathBuf,

    /// How long after a check a link becomes eligible again (e.g. "10 minutes")
    #[arg(long, env = "WEBHOOK_SYNC_DURATION", global = true)]
    pub sync_duration: Option<String>,

    /// Name of the job queue
    #[arg(long, env = "REDIS_QUEUE_NAME", global = true)]
    pub queue_name: Option<String>,

    /// Token used for links whose owner has no access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub github_token: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub github_api_url: String,

    /// Enable debug logging (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll indefinitely until Ctrl+C (default)
    Run,

    /// Run a single change-detection cycle and exit
    Once,

    /// Print a stored job status
    Status(StatusArgs),

    /// Record a job outcome for a webhook/status id
    Report(ReportArgs),
}

/// Arguments for the status command.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Webhook/status id
    pub id: String,

    /// Include access tokens and other credentials in the output
    #[arg(long)]
    pub show_sensitive: bool,
}

/// Arguments for the report command.
#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Webhook/status id
    pub id: String,

    /// Status payload as JSON
    pub status: String,
}
