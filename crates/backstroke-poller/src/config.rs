//! Configuration for the change-detection poller
//!
//! Defines the tick interval, the staleness window that makes a link eligible,
//! and the queue/status settings shared with workers.

use crate::PollerError;
use backstroke_domain::parse_duration;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// What to do when a tick fires while the previous cycle is still running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Start another cycle anyway
    ///
    /// Two cycles can then evaluate the same link and enqueue it twice.
    #[default]
    Allow,

    /// Skip the tick (single-flight)
    Skip,
}

/// Configuration for the poller
///
/// # Examples
///
/// ```
/// use backstroke_poller::PollerConfig;
/// use std::time::Duration;
///
/// let config = PollerConfig::default();
/// assert_eq!(config.poll_interval(), Duration::from_secs(30));
/// assert_eq!(config.staleness().unwrap(), Duration::from_secs(600));
/// assert_eq!(config.queue_name, "webhookQueue");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Seconds between ticks
    /// Default: 30
    pub poll_interval_secs: u64,

    /// How long after its last check a link becomes eligible again
    /// Default: "10 minutes"
    pub staleness_threshold: String,

    /// Name of the job queue
    /// Default: "webhookQueue"
    pub queue_name: String,

    /// Lifetime of status records written with `set_default`, in seconds
    /// Default: 86400 (24 hours)
    pub status_ttl_secs: u64,

    /// Tick overlap behavior
    /// Default: allow
    pub overlap_policy: OverlapPolicy,

    /// Deadline for evaluating a single candidate, in seconds
    /// Default: none (wait indefinitely)
    pub candidate_timeout_secs: Option<u64>,

    /// Keep the last known SHA when the upstream head comes back absent
    /// Default: false (the stored SHA is overwritten with nothing)
    pub preserve_sha_on_missing_upstream: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            staleness_threshold: "10 minutes".to_string(),
            queue_name: "webhookQueue".to_string(),
            status_ttl_secs: 24 * 60 * 60,
            overlap_policy: OverlapPolicy::Allow,
            candidate_timeout_secs: None,
            preserve_sha_on_missing_upstream: false,
        }
    }
}

impl PollerConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PollerError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, PollerError> {
        let config: PollerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value that can be wrong
    pub fn validate(&self) -> Result<(), PollerError> {
        if self.poll_interval_secs == 0 {
            return Err(PollerError::Config(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.queue_name.is_empty() {
            return Err(PollerError::Config("queue_name must not be empty".to_string()));
        }
        if self.candidate_timeout_secs == Some(0) {
            return Err(PollerError::Config(
                "candidate_timeout_secs must be greater than zero".to_string(),
            ));
        }
        self.staleness()?;
        Ok(())
    }

    /// Tick interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Parsed staleness threshold
    ///
    /// Rejects windows that reach back past the earliest representable
    /// timestamp.
    pub fn staleness(&self) -> Result<Duration, PollerError> {
        let staleness = parse_duration(&self.staleness_threshold).map_err(|e| {
            PollerError::Config(format!(
                "invalid staleness_threshold '{}': {}",
                self.staleness_threshold, e
            ))
        })?;
        chrono::Duration::from_std(staleness)
            .ok()
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .ok_or_else(|| {
                PollerError::Config(format!(
                    "staleness_threshold '{}' is out of range",
                    self.staleness_threshold
                ))
            })?;
        Ok(staleness)
    }

    /// Status record TTL as Duration
    pub fn status_ttl(&self) -> Duration {
        Duration::from_secs(self.status_ttl_secs)
    }

    /// Per-candidate deadline as Duration
    pub fn candidate_timeout(&self) -> Option<Duration> {
        self.candidate_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PollerConfig::default();
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.staleness_threshold, "10 minutes");
        assert_eq!(config.queue_name, "webhookQueue");
        assert_eq!(config.status_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.overlap_policy, OverlapPolicy::Allow);
        assert_eq!(config.candidate_timeout(), None);
        assert!(!config.preserve_sha_on_missing_upstream);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = PollerConfig::from_toml(
            r#"
            poll_interval_secs = 60
            staleness_threshold = "1 hour"
            overlap_policy = "skip"
            candidate_timeout_secs = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.staleness().unwrap(), Duration::from_secs(3600));
        assert_eq!(config.overlap_policy, OverlapPolicy::Skip);
        assert_eq!(config.candidate_timeout(), Some(Duration::from_secs(20)));
        // Unset fields keep their defaults
        assert_eq!(config.queue_name, "webhookQueue");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            PollerConfig::from_toml("poll_interval_secs = 0"),
            Err(PollerError::Config(_))
        ));
        assert!(matches!(
            PollerConfig::from_toml(r#"staleness_threshold = "soon""#),
            Err(PollerError::Config(_))
        ));
        assert!(matches!(
            PollerConfig::from_toml(r#"staleness_threshold = "50000000 weeks""#),
            Err(PollerError::Config(_))
        ));
        assert!(matches!(
            PollerConfig::from_toml(r#"queue_name = """#),
            Err(PollerError::Config(_))
        ));
        assert!(matches!(
            PollerConfig::from_toml("candidate_timeout_secs = 0"),
            Err(PollerError::Config(_))
        ));
        assert!(matches!(
            PollerConfig::from_toml(r#"overlap_policy = "sometimes""#),
            Err(PollerError::TomlParse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poller.toml");
        std::fs::write(&path, "queue_name = \"jobs\"\n").unwrap();

        let config = PollerConfig::from_file(&path).unwrap();
        assert_eq!(config.queue_name, "jobs");

        assert!(matches!(
            PollerConfig::from_file(dir.path().join("missing.toml")),
            Err(PollerError::FileRead(_))
        ));
    }
}
