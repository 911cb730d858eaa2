//! Backstroke Domain Layer
//!
//! Core data model and collaborator interfaces for keeping forks in sync with
//! their upstream repositories. Infrastructure (SQLite, GitHub, the scheduler)
//! lives in other crates and depends on the types defined here.
//!
//! ## Key Concepts
//!
//! - **Link**: A persisted pairing of an upstream repository/branch with a fork
//! - **Candidate**: A link, joined with its owner, that is due for a sync check
//! - **SyncJob**: The queued unit of work that asks a worker to sync a fork
//! - **Status record**: A short-lived JSON payload describing a job's outcome
//!
//! ## Architecture
//!
//! - Plain data types with serde wire formats (camelCase, as consumed by workers)
//! - Trait definitions for every external interaction (`traits` module)
//! - No I/O in this crate

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod duration;
pub mod error;
pub mod job;
pub mod link;
pub mod status;
pub mod traits;

// Re-exports for convenience
pub use duration::{parse_duration, DurationParseError};
pub use error::{FetchError, QueueError, RepositoryError, StatusStoreError};
pub use job::{EnqueueReason, JobType, QueueMessage, SyncJob};
pub use link::{
    ForkDescriptor, ForkType, Link, LinkId, LinkSyncCandidate, UpstreamDescriptor, UpstreamType,
    User, UserId,
};
pub use status::{redact_sensitive, status_key, StatusRecord, DEFAULT_STATUS_TTL};
