//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub attestation: AttestationPollConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Page assembly settings for the reconciliation engine
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    /// Records requested per class sub-query and returned per unified page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// Polling settings for attestation confirmation checks
#[derive(Debug, Clone, Deserialize)]
pub struct AttestationPollConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval between wall-clock confirmation re-derivations
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Recovery action settings
#[derive(Debug, Clone, Deserialize)]
pub struct RecoveryConfig {
    /// Outer validity window for retrying a failed destination message,
    /// counted from the transfer's creation time
    #[serde(default = "default_retry_window_days")]
    pub retry_window_days: i64,
}

/// Local overlay persistence settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON overlay file; in-memory only when unset
    #[serde(default)]
    pub persistence_path: Option<String>,
}

fn default_page_size() -> usize {
    10
}

fn default_poll_interval_ms() -> u64 {
    10_000
}

fn default_retry_window_days() -> i64 {
    7
}

fn default_true() -> bool {
    true
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Default for AttestationPollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            retry_window_days: default_retry_window_days(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pagination: PaginationConfig::default(),
            attestation: AttestationPollConfig::default(),
            recovery: RecoveryConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file with environment variable overrides
    ///
    /// Environment variables use the `TRACKER_` prefix with `__` as the
    /// section separator, e.g. `TRACKER_PAGINATION__PAGE_SIZE=25`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("pagination.page_size", default_page_size() as i64)?
            .set_default("attestation.enabled", true)?
            .set_default(
                "attestation.poll_interval_ms",
                default_poll_interval_ms() as i64,
            )?
            .set_default("recovery.retry_window_days", default_retry_window_days())?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix TRACKER_)
            .add_source(
                config::Environment::with_prefix("TRACKER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.pagination.page_size == 0 {
            anyhow::bail!("pagination.page_size must be greater than zero");
        }
        if self.attestation.poll_interval_ms < 100 {
            anyhow::bail!("attestation.poll_interval_ms must be at least 100ms");
        }
        if self.recovery.retry_window_days <= 0 {
            anyhow::bail!("recovery.retry_window_days must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pagination.page_size, 10);
        assert!(config.attestation.enabled);
        assert_eq!(config.recovery.retry_window_days, 7);
        assert!(config.store.persistence_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config = Config::default();
        config.pagination.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load("does-not-exist.toml").unwrap();
        assert_eq!(config.pagination.page_size, 10);
    }
}
