//! Backstroke Storage Layer
//!
//! SQLite-backed implementations of the domain's persistence traits.
//!
//! # Architecture
//!
//! One SQLite database file is the shared store for everything the poller
//! touches:
//!
//! - [`SqliteStore`]: link and user rows ([`LinkRepository`])
//! - [`SqliteJobQueue`]: durable FIFO of sync jobs ([`JobQueue`])
//! - [`SqliteStatusStore`]: TTL-keyed job status records ([`StatusStore`])
//!
//! All three hold a clone of the same [`Database`] handle, so a `:memory:`
//! database is shared between them and a file database is shared with any
//! worker process that opens the same path.
//!
//! # Examples
//!
//! ```no_run
//! use backstroke_store::{Database, SqliteJobQueue, SqliteStatusStore, SqliteStore};
//!
//! let db = Database::open("backstroke.db").unwrap();
//! let links = SqliteStore::new(db.clone());
//! let queue = SqliteJobQueue::new(db.clone(), "webhookQueue");
//! let statuses = SqliteStatusStore::new(db);
//! ```
//!
//! [`LinkRepository`]: backstroke_domain::traits::LinkRepository
//! [`JobQueue`]: backstroke_domain::traits::JobQueue
//! [`StatusStore`]: backstroke_domain::traits::StatusStore

#![warn(missing_docs)]

mod links;
mod queue;
mod status;

pub use links::SqliteStore;
pub use queue::SqliteJobQueue;
pub use status::SqliteStatusStore;

use backstroke_domain::{QueueError, RepositoryError, StatusStoreError};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A thread panicked while holding the connection
    #[error("Connection lock poisoned")]
    Poisoned,
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidData(msg) => RepositoryError::InvalidData(msg),
            other => RepositoryError::Backend(other.to_string()),
        }
    }
}

impl From<StoreError> for QueueError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Serialization(e) => QueueError::Serialization(e),
            other => QueueError::Backend(other.to_string()),
        }
    }
}

impl From<StoreError> for StatusStoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Serialization(e) => StatusStoreError::Serialization(e),
            other => StatusStoreError::Backend(other.to_string()),
        }
    }
}

/// Shared handle to one SQLite database
///
/// Cloning is cheap; clones share the same connection.
///
/// # Thread Safety
///
/// The connection sits behind a mutex. Every statement runs synchronously
/// while the lock is held and no lock is ever held across an `.await`.
///
/// # Blocking
///
/// All calls block the calling thread, including the async trait methods
/// built on top of this handle. A call waits for the mutex and then for
/// SQLite itself, up to the 5 second busy timeout when another process
/// holds a write lock. Statements are short, so async callers run them
/// inline on the runtime; move long batches to `spawn_blocking`.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path` and apply the schema
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch(include_str!("schema.sql"))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a fresh in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:")
    }

    /// Run `f` with exclusive access to the connection
    ///
    /// Blocks until the lock is free and `f` returns.
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut conn)
    }
}

/// Convert a timestamp to stored milliseconds
pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Convert stored milliseconds back to a timestamp
pub(crate) fn from_millis(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::InvalidData(format!("Timestamp out of range: {}", millis)))
}
