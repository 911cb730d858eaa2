//! Error taxonomy shared by every collaborator

use crate::link::LinkId;
use thiserror::Error;

/// Upstream head lookup failed
///
/// Local to one candidate: the poller skips it without touching its
/// bookkeeping, so it stays eligible for the next tick.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout)
    #[error("Upstream request failed: {0}")]
    Request(String),

    /// The API answered with an unexpected status
    #[error("Upstream returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// The API answered with a body we could not understand
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    /// The link lacks the owner/repo needed to look anything up
    #[error("Link {0} has an incomplete upstream descriptor")]
    IncompleteLink(LinkId),
}

/// Durable queue operation failed
#[derive(Error, Debug)]
pub enum QueueError {
    /// `initialize` found the queue already present
    #[error("Queue already exists: {0}")]
    QueueExists(String),

    /// The queue was never initialized
    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    /// Queue names are limited to 1-160 characters of `[A-Za-z0-9_-]`
    #[error("Invalid queue name: {0}")]
    InvalidName(String),

    /// Job could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying store failure
    #[error("Queue backend error: {0}")]
    Backend(String),
}

/// Status record operation failed
#[derive(Error, Debug)]
pub enum StatusStoreError {
    /// Payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying store failure
    #[error("Status store backend error: {0}")]
    Backend(String),
}

/// Link/User persistence failed
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// No row matched
    #[error("Link not found: {0}")]
    NotFound(LinkId),

    /// Stored data could not be mapped onto the model
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Underlying store failure
    #[error("Repository backend error: {0}")]
    Backend(String),
}
