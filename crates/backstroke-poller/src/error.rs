//! Error types for poller operations

use backstroke_domain::{QueueError, RepositoryError};
use thiserror::Error;

/// Errors that abort a whole cycle or prevent the poller from starting
#[derive(Error, Debug)]
pub enum PollerError {
    /// Candidate query failed
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to read a config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse a config file
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Errors that stop the evaluation of a single candidate
///
/// Upstream fetch failures are not errors here: they are an expected outcome
/// (see [`crate::Evaluation::FetchFailed`]).
#[derive(Error, Debug)]
pub enum EvaluationError {
    /// Enqueueing the sync job failed; bookkeeping was skipped
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Bookkeeping update failed
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}
