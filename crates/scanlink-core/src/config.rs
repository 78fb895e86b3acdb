//! Client configuration.
//!
//! Defaults match the deployed behavior (10 s probe interval, 5 s probe
//! timeout, capacity 100, batches of 10 with a 1 s inter-batch delay);
//! the knobs exist for tuning and for deterministic fast tests.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// Tunable parameters for a [`ScanClient`](crate::client::ScanClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Orchestrator base address. `None` means Standalone deployment
    /// unless a persisted override exists.
    pub base_url: Option<Url>,

    /// Milliseconds between health probes.
    pub probe_interval_ms: u64,

    /// Client-side bound on a single health probe, in milliseconds.
    pub probe_timeout_ms: u64,

    /// Client-side bound on scan and batch requests, in milliseconds.
    pub request_timeout_ms: u64,

    /// Offline queue capacity.
    pub queue_capacity: usize,

    /// Maximum transactions per batch flush.
    pub batch_size: usize,

    /// Delay before draining the next batch after a successful one,
    /// in milliseconds.
    pub reflush_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            probe_interval_ms: 10_000,
            probe_timeout_ms: 5_000,
            request_timeout_ms: 10_000,
            queue_capacity: 100,
            batch_size: 10,
            reflush_delay_ms: 1_000,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)
                .map_err(|err| crate::error::ScanlinkError::Persistence(err.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|err| crate::error::ScanlinkError::Persistence(err.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Probe interval as a [`Duration`].
    #[must_use]
    pub const fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    /// Probe timeout as a [`Duration`].
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Inter-batch re-flush delay as a [`Duration`].
    #[must_use]
    pub const fn reflush_delay(&self) -> Duration {
        Duration::from_millis(self.reflush_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployed_behavior() {
        let config = ClientConfig::default();
        assert!(config.base_url.is_none());
        assert_eq!(config.probe_interval_ms, 10_000);
        assert_eq!(config.probe_timeout_ms, 5_000);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.reflush_delay_ms, 1_000);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.queue_capacity, 100);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = ClientConfig::default();
        config.base_url = Some(Url::parse("http://orchestrator.local:3000").unwrap());
        config.probe_interval_ms = 2_500;
        config.save(&path).unwrap();

        let reloaded = ClientConfig::load_or_default(&path).unwrap();
        assert_eq!(
            reloaded.base_url.as_ref().map(Url::as_str),
            Some("http://orchestrator.local:3000/")
        );
        assert_eq!(reloaded.probe_interval_ms, 2_500);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "queue_capacity = 25\n").unwrap();

        let config = ClientConfig::load_or_default(&path).unwrap();
        assert_eq!(config.queue_capacity, 25);
        assert_eq!(config.batch_size, 10);
    }
}
