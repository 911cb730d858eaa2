//! TTL-keyed job status records

use crate::{from_millis, to_millis, Database, StoreError};
use async_trait::async_trait;
use backstroke_domain::traits::StatusStore;
use backstroke_domain::{redact_sensitive, status_key, StatusRecord, StatusStoreError, DEFAULT_STATUS_TTL};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// SQLite-backed implementation of [`StatusStore`]
///
/// Expired rows are invisible to reads and removed lazily when read, or in
/// bulk by [`SqliteStatusStore::purge_expired`].
pub struct SqliteStatusStore {
    db: Database,
    default_ttl: Duration,
}

impl SqliteStatusStore {
    /// Create a status store with the default 24 hour TTL
    pub fn new(db: Database) -> Self {
        Self {
            db,
            default_ttl: DEFAULT_STATUS_TTL,
        }
    }

    /// Override the TTL used by [`StatusStore::set_default`]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Raw record for `id`, or `None` if absent or expired
    ///
    /// Never redacts. An expired row is deleted on the way out.
    pub fn get_record(&self, id: &str) -> Result<Option<StatusRecord>, StoreError> {
        let key = status_key(id);

        let row: Option<(String, i64)> = self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value, expires_at FROM status_records WHERE key = ?1",
                    params![&key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?)
        })?;

        let Some((value, expires_at)) = row else {
            return Ok(None);
        };
        let record = StatusRecord {
            key,
            value: serde_json::from_str(&value)?,
            expires_at: from_millis(expires_at)?,
        };

        let now = Utc::now();
        if record.is_expired(now) {
            self.db.with_conn(|conn| {
                conn.execute(
                    "DELETE FROM status_records WHERE key = ?1 AND expires_at <= ?2",
                    params![&record.key, to_millis(now)],
                )?;
                Ok(())
            })?;
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Delete every expired record, returning how many were removed
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        let removed = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM status_records WHERE expires_at <= ?1",
                params![to_millis(Utc::now())],
            )?)
        })?;

        if removed > 0 {
            debug!("Purged {} expired status records", removed);
        }
        Ok(removed)
    }
}

#[async_trait]
impl StatusStore for SqliteStatusStore {
    async fn set(
        &self,
        id: &str,
        status: &Value,
        ttl: Duration,
    ) -> Result<String, StatusStoreError> {
        let key = status_key(id);
        let value = serde_json::to_string(status)?;
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = to_millis(Utc::now()).saturating_add(ttl_millis);

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO status_records (key, value, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
                params![&key, &value, expires_at],
            )?;
            Ok(())
        })?;

        Ok(key)
    }

    async fn get(&self, id: &str, hide_sensitive: bool) -> Result<Option<Value>, StatusStoreError> {
        let Some(record) = self.get_record(id)? else {
            return Ok(None);
        };

        let mut value = record.value;
        if hide_sensitive {
            redact_sensitive(&mut value);
        }
        Ok(Some(value))
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> SqliteStatusStore {
        SqliteStatusStore::new(Database::in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_set_returns_namespaced_key() {
        let key = store().set("abc", &json!({"a": 1}), Duration::from_secs(60)).await.unwrap();
        assert_eq!(key, "webhook:status:abc");
    }

    #[tokio::test]
    async fn test_missing_key_resolves_to_none() {
        assert_eq!(store().get("nope", true).await.unwrap(), None);
        assert_eq!(store().get("nope", false).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value_and_ttl() {
        let s = store();
        s.set("k", &json!({"a": 1}), Duration::from_millis(1)).await.unwrap();
        s.set("k", &json!({"a": 2}), Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(s.get("k", true).await.unwrap(), Some(json!({"a": 2})));
    }

    #[tokio::test]
    async fn test_sensitive_fields_hidden_by_default() {
        let s = store();
        let status = json!({"status": "OK", "user": {"username": "octocat", "accessToken": "gho_x"}});
        s.set_default("k", &status).await.unwrap();

        let redacted = s.get_redacted("k").await.unwrap().unwrap();
        assert!(redacted["user"].get("accessToken").is_none());

        let raw = s.get("k", false).await.unwrap().unwrap();
        assert_eq!(raw["user"]["accessToken"], "gho_x");
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let s = store();
        s.set("old", &json!(1), Duration::ZERO).await.unwrap();
        s.set("new", &json!(2), Duration::from_secs(60)).await.unwrap();

        assert_eq!(s.purge_expired().unwrap(), 1);
        assert!(s.get_record("new").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_record_is_deleted_on_read() {
        let s = store();
        s.set("gone", &json!(1), Duration::ZERO).await.unwrap();

        assert_eq!(s.get_record("gone").unwrap(), None);
        // Already removed by the read
        assert_eq!(s.purge_expired().unwrap(), 0);
    }

    #[test]
    fn test_default_ttl_override() {
        let s = store().with_default_ttl(Duration::from_secs(5));
        assert_eq!(StatusStore::default_ttl(&s), Duration::from_secs(5));
        assert_eq!(StatusStore::default_ttl(&store()), DEFAULT_STATUS_TTL);
    }
}
