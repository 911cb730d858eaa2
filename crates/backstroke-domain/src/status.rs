//! Status module - short-lived job outcome records

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

/// Default lifetime of a status record (24 hours)
pub const DEFAULT_STATUS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Keys stripped from status payloads before they are shown to callers
pub const SENSITIVE_KEYS: &[&str] = &[
    "accessToken",
    "access_token",
    "githubToken",
    "token",
    "password",
    "secret",
];

/// Storage key for a webhook/status id: `webhook:status:<id>`
pub fn status_key(id: &str) -> String {
    format!("webhook:status:{}", id)
}

/// A stored status payload and its expiry
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRecord {
    /// Full storage key (see [`status_key`])
    pub key: String,

    /// Status payload
    pub value: Value,

    /// When the record stops being visible
    pub expires_at: DateTime<Utc>,
}

impl StatusRecord {
    /// Whether the record has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Remove every [`SENSITIVE_KEYS`] entry from `value`, at any depth
///
/// Job statuses embed the owner snapshot, credentials included, so the
/// redaction has to walk nested objects and arrays.
pub fn redact_sensitive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !SENSITIVE_KEYS.contains(&key.as_str()));
            for nested in map.values_mut() {
                redact_sensitive(nested);
            }
        }
        Value::Array(items) => {
            for item in items {
                redact_sensitive(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_key_format() {
        assert_eq!(status_key("abc123"), "webhook:status:abc123");
    }

    #[test]
    fn test_redact_nested_credentials() {
        let mut status = json!({
            "status": "OK",
            "user": {"username": "octocat", "accessToken": "gho_secret"},
            "attempts": [{"token": "t", "ok": true}],
        });

        redact_sensitive(&mut status);

        assert_eq!(status["status"], "OK");
        assert_eq!(status["user"]["username"], "octocat");
        assert!(status["user"].get("accessToken").is_none());
        assert!(status["attempts"][0].get("token").is_none());
        assert_eq!(status["attempts"][0]["ok"], true);
    }

    #[test]
    fn test_redact_leaves_scalars_alone() {
        let mut value = json!("accessToken");
        redact_sensitive(&mut value);
        assert_eq!(value, json!("accessToken"));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let record = StatusRecord {
            key: status_key("x"),
            value: json!({}),
            expires_at: now,
        };
        assert!(record.is_expired(now));
        assert!(!record.is_expired(now - chrono::Duration::seconds(1)));
    }
}
