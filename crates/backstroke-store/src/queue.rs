//! Durable FIFO job queue on top of SQLite

use crate::{to_millis, Database, StoreError};
use async_trait::async_trait;
use backstroke_domain::traits::JobQueue;
use backstroke_domain::{QueueError, QueueMessage, SyncJob};
use chrono::Utc;
use rusqlite::{params, ErrorCode, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

const MAX_QUEUE_NAME_LEN: usize = 160;

/// SQLite-backed implementation of [`JobQueue`]
///
/// Messages live in the `queue_messages` table until popped, so they survive
/// process restarts and are visible to any process sharing the database file.
///
/// # Delivery
///
/// `pop` deletes the message in the same statement that reads it. There is no
/// in-flight state and no redelivery; see [`JobQueue`] for the contract.
pub struct SqliteJobQueue {
    db: Database,
    name: String,
}

impl SqliteJobQueue {
    /// Queue name used when none is configured
    pub const DEFAULT_NAME: &'static str = "webhookQueue";

    /// Create a handle to the queue `name`
    ///
    /// The queue itself is created by [`JobQueue::initialize`].
    pub fn new(db: Database, name: impl Into<String>) -> Self {
        Self {
            db,
            name: name.into(),
        }
    }

    /// Number of messages waiting in the queue
    pub fn depth(&self) -> Result<u64, StoreError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM queue_messages WHERE queue = ?1",
                params![&self.name],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    fn validate_name(&self) -> Result<(), QueueError> {
        let valid = !self.name.is_empty()
            && self.name.len() <= MAX_QUEUE_NAME_LEN
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if valid {
            Ok(())
        } else {
            Err(QueueError::InvalidName(self.name.clone()))
        }
    }

    /// Create the queue row, reporting an existing queue as [`QueueError::QueueExists`]
    fn create(&self) -> Result<(), QueueError> {
        self.validate_name()?;

        let inserted = self.db.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO queues (name, created_at) VALUES (?1, ?2)",
                params![&self.name, to_millis(Utc::now())],
            ) {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })?;

        if inserted {
            Ok(())
        } else {
            Err(QueueError::QueueExists(self.name.clone()))
        }
    }

    fn queue_exists(conn: &rusqlite::Connection, name: &str) -> Result<bool, StoreError> {
        let exists = conn
            .query_row("SELECT 1 FROM queues WHERE name = ?1", params![name], |_| {
                Ok(true)
            })
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), QueueError> {
        match self.create() {
            Ok(()) => {
                debug!("Created queue {}", self.name);
                Ok(())
            }
            Err(QueueError::QueueExists(_)) => {
                debug!("Queue {} already exists", self.name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn push(&self, job: &SyncJob) -> Result<String, QueueError> {
        let body = serde_json::to_string(job)?;
        let id = Uuid::now_v7().simple().to_string();

        let found = self.db.with_conn(|conn| {
            if !Self::queue_exists(conn, &self.name)? {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO queue_messages (id, queue, body, sent_at) VALUES (?1, ?2, ?3, ?4)",
                params![&id, &self.name, &body, to_millis(Utc::now())],
            )?;
            Ok(true)
        })?;

        if !found {
            return Err(QueueError::QueueNotFound(self.name.clone()));
        }

        debug!("Pushed message {} onto {}", id, self.name);
        Ok(id)
    }

    async fn pop(&self) -> Result<Option<QueueMessage>, QueueError> {
        let popped = self.db.with_conn(|conn| {
            if !Self::queue_exists(conn, &self.name)? {
                return Ok(None);
            }
            let message = conn
                .query_row(
                    "DELETE FROM queue_messages
                     WHERE seq = (SELECT seq FROM queue_messages WHERE queue = ?1 ORDER BY seq LIMIT 1)
                     RETURNING id, body",
                    params![&self.name],
                    |row| {
                        Ok(QueueMessage {
                            id: row.get(0)?,
                            payload: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(Some(message))
        })?;

        match popped {
            None => Err(QueueError::QueueNotFound(self.name.clone())),
            Some(message) => Ok(message),
        }
    }
}
