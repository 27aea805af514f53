//! Ingestion configuration
//!
//! Settings for the processing consumers and the content downloader, read
//! from `INGEST_*` environment variables on top of the defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::env_parsed;

/// Processing consumer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Whether the processing consumers are started at all
    pub enabled: bool,
    /// Number of concurrent processing consumers
    pub consumers: usize,
    /// How long a consumer waits on the queue before re-checking for shutdown
    pub poll_interval_secs: u64,
    /// How long a claimed message stays invisible before it is redelivered
    pub visibility_timeout_secs: u64,
    pub download: DownloadConfig,
}

/// Content downloader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum download attempts per fetch
    pub max_retries: u32,
    /// Base backoff between attempts in milliseconds, doubling per attempt
    pub retry_backoff_ms: u64,
    /// Maximum accepted content size in bytes
    pub max_bytes: u64,
    /// Directory where downloaded content is staged
    pub cache_dir: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            consumers: 4,
            poll_interval_secs: 1,
            visibility_timeout_secs: 300,
            download: DownloadConfig::default(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_retries: 3,
            retry_backoff_ms: 1000,
            max_bytes: 256 * 1024 * 1024,
            cache_dir: default_cache_dir(),
        }
    }
}

impl IngestConfig {
    /// Load consumer settings from `INGEST_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            enabled: env_parsed("INGEST_ENABLED", defaults.enabled),
            consumers: env_parsed("INGEST_CONSUMERS", defaults.consumers),
            poll_interval_secs: env_parsed("INGEST_POLL_INTERVAL_SECS", defaults.poll_interval_secs),
            visibility_timeout_secs: env_parsed(
                "INGEST_VISIBILITY_TIMEOUT_SECS",
                defaults.visibility_timeout_secs,
            ),
            download: DownloadConfig::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.enabled {
            if self.consumers == 0 {
                anyhow::bail!("INGEST_CONSUMERS must be at least 1");
            }
            if self.poll_interval_secs == 0 {
                anyhow::bail!("INGEST_POLL_INTERVAL_SECS must be at least 1");
            }
            if self.visibility_timeout_secs == 0 {
                anyhow::bail!("INGEST_VISIBILITY_TIMEOUT_SECS must be at least 1");
            }
        }
        self.download.validate()?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }
}

impl DownloadConfig {
    /// Load downloader settings from `INGEST_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            timeout_secs: env_parsed("INGEST_DOWNLOAD_TIMEOUT_SECS", defaults.timeout_secs),
            max_retries: env_parsed("INGEST_DOWNLOAD_MAX_RETRIES", defaults.max_retries),
            retry_backoff_ms: env_parsed(
                "INGEST_DOWNLOAD_RETRY_BACKOFF_MS",
                defaults.retry_backoff_ms,
            ),
            max_bytes: env_parsed("INGEST_MAX_DOWNLOAD_BYTES", defaults.max_bytes),
            cache_dir: std::env::var("INGEST_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate downloader configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("INGEST_DOWNLOAD_TIMEOUT_SECS must be at least 1");
        }
        if self.max_retries == 0 {
            anyhow::bail!("INGEST_DOWNLOAD_MAX_RETRIES must be at least 1");
        }
        if self.max_bytes == 0 {
            anyhow::bail!("INGEST_MAX_DOWNLOAD_BYTES must be at least 1");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("harvest-ingest-cache")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_config_default_is_valid() {
        let config = IngestConfig::default();
        assert!(config.enabled);
        assert_eq!(config.consumers, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_consumers_rejected_only_when_enabled() {
        let mut config = IngestConfig {
            consumers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        // Irrelevant when consumers are not started
        config.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_download_config_validation() {
        let config = DownloadConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DownloadConfig {
            max_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_helpers() {
        let config = IngestConfig {
            poll_interval_secs: 2,
            visibility_timeout_secs: 600,
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.visibility_timeout(), Duration::from_secs(600));

        let download = DownloadConfig {
            timeout_secs: 30,
            retry_backoff_ms: 250,
            ..Default::default()
        };
        assert_eq!(download.timeout(), Duration::from_secs(30));
        assert_eq!(download.retry_backoff(), Duration::from_millis(250));
    }
}
