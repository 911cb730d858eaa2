//! Error types for the CLI application.

use backstroke_domain::{FetchError, QueueError, StatusStoreError};
use backstroke_poller::PollerError;
use backstroke_store::StoreError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Poller configuration or cycle error
    #[error("Poller error: {0}")]
    Poller(#[from] PollerError),

    /// Database error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Job queue error
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Status store error
    #[error("Status store error: {0}")]
    Status(#[from] StatusStoreError),

    /// GitHub client setup error
    #[error("GitHub client error: {0}")]
    Github(#[from] FetchError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// One or more links could not be processed
    #[error("Cycle finished with {0} failed link(s)")]
    CycleFailed(usize),

    /// No status record for the id
    #[error("Status '{0}' not found")]
    StatusNotFound(String),
}
