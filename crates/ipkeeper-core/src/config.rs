//! Configuration types for ipkeeper
//!
//! This module defines the configuration structures consumed by the
//! update service. Loading them (environment, files) is left to the binary.

use crate::activity::DEFAULT_LOG_CAPACITY;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// The DNS record kept in sync
    pub record: RecordTarget,

    /// Timing of the self-healing loop
    #[serde(default)]
    pub retry: RetryConfig,

    /// Number of activity log entries retained for the status snapshot
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl ServiceConfig {
    /// Create a configuration for `record` with default timings
    pub fn new(record: RecordTarget) -> Self {
        Self {
            record,
            retry: RetryConfig::default(),
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }

    /// Set the retry timings
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.record.validate()?;
        self.retry.validate()?;

        if self.log_capacity == 0 {
            return Err(crate::Error::config("Log capacity must be > 0"));
        }

        Ok(())
    }
}

/// The DNS record an update targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTarget {
    /// Provider zone identifier
    pub zone_id: String,
    /// Provider record identifier
    pub record_id: String,
    /// Fully qualified record name (e.g., "home.example.com")
    pub name: String,
}

impl RecordTarget {
    pub fn new(
        zone_id: impl Into<String>,
        record_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            zone_id: zone_id.into(),
            record_id: record_id.into(),
            name: name.into(),
        }
    }

    /// Validate identifiers and the record name
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zone_id.trim().is_empty() {
            return Err(crate::Error::config("Zone ID cannot be empty"));
        }
        if self.record_id.trim().is_empty() {
            return Err(crate::Error::config("Record ID cannot be empty"));
        }
        validate_domain_name(&self.name)
    }
}

/// Retry timings in seconds, converted into a [`RetryPolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay after a success or a skipped update
    #[serde(default = "default_success_interval_secs")]
    pub success_interval_secs: u64,

    /// Delay after a tolerated API error
    #[serde(default = "default_api_retry_delay_secs")]
    pub api_retry_delay_secs: u64,

    /// API errors tolerated in a row before the service stops
    #[serde(default = "default_max_api_errors")]
    pub max_api_errors: u32,

    /// Delay after repeated connectivity errors
    #[serde(default = "default_network_backoff_secs")]
    pub network_backoff_secs: u64,
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.success_interval_secs == 0 {
            return Err(crate::Error::config("Success interval must be > 0"));
        }
        if self.api_retry_delay_secs == 0 {
            return Err(crate::Error::config("API retry delay must be > 0"));
        }
        if self.network_backoff_secs == 0 {
            return Err(crate::Error::config("Network backoff must be > 0"));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            success_interval_secs: default_success_interval_secs(),
            api_retry_delay_secs: default_api_retry_delay_secs(),
            max_api_errors: default_max_api_errors(),
            network_backoff_secs: default_network_backoff_secs(),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::new()
            .with_success_interval(Duration::from_secs(config.success_interval_secs))
            .with_api_retry_delay(Duration::from_secs(config.api_retry_delay_secs))
            .with_max_api_errors(config.max_api_errors)
            .with_network_backoff(Duration::from_secs(config.network_backoff_secs))
    }
}

fn default_success_interval_secs() -> u64 {
    RetryPolicy::DEFAULT_SUCCESS_INTERVAL.as_secs()
}

fn default_api_retry_delay_secs() -> u64 {
    RetryPolicy::DEFAULT_API_RETRY_DELAY.as_secs()
}

fn default_max_api_errors() -> u32 {
    RetryPolicy::DEFAULT_MAX_API_ERRORS
}

fn default_network_backoff_secs() -> u64 {
    RetryPolicy::DEFAULT_NETWORK_BACKOFF.as_secs()
}

fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

/// Validate a record name against RFC 1035 length and label rules
pub fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    if domain.is_empty() {
        return Err(crate::Error::config("Record name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "Record name too long: {} chars (max 253)",
            domain.len()
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Record name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Record label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "Record label contains invalid characters: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Record label cannot start or end with a hyphen: '{}'",
                label
            )));
        }
    }

    Ok(())
}
