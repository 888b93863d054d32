//! Engine configuration.
//!
//! All knobs default to the values the invitation shipped with; a JSON file
//! can override any subset.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_IMAGES;
use crate::dispatch::DEFAULT_FORM_RELAY_URL;
use crate::error::{VerbenaError, VerbenaResult};

/// Image loader knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Concurrency bound for batch preloading
    pub max_concurrent_loads: usize,
    /// Additional attempts before a name is recorded as permanently failed
    pub retry_attempts: u32,
    /// How many catalog entries to warm at startup
    pub preload_count: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_loads: 3,
            retry_attempts: 2,
            preload_count: 8,
        }
    }
}

/// Background rotation knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotatorConfig {
    /// Seconds between periodic rotation triggers
    pub rotate_period_secs: u64,
    /// Backoff before retrying a failed rotation step
    pub retry_delay_secs: u64,
    /// How many upcoming pool entries to prefetch after a successful apply
    pub prefetch_count: usize,
}

impl RotatorConfig {
    pub fn rotate_period(&self) -> Duration {
        Duration::from_secs(self.rotate_period_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for RotatorConfig {
    fn default() -> Self {
        Self {
            rotate_period_secs: 5,
            retry_delay_secs: 1,
            prefetch_count: 3,
        }
    }
}

/// Floating-element spawner knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Cap on simultaneously active elements, enforced by the visual layer
    pub max_active_images: usize,
    /// Element edge length in pixels
    pub element_size: u32,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            max_active_images: 15,
            element_size: 150,
        }
    }
}

/// External submission sinks. `None` disables a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinksConfig {
    /// Multipart form relay endpoint
    pub form_relay_url: Option<String>,
    /// Generic JSON webhook endpoint
    pub webhook_url: Option<String>,
}

impl Default for SinksConfig {
    fn default() -> Self {
        Self {
            form_relay_url: Some(DEFAULT_FORM_RELAY_URL.to_string()),
            webhook_url: None,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the catalog images
    pub photo_dir: PathBuf,
    /// Image names served by the rotation pool
    pub catalog: Vec<String>,
    pub loader: LoaderConfig,
    pub rotator: RotatorConfig,
    pub spawner: SpawnerConfig,
    pub sinks: SinksConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            photo_dir: PathBuf::from("photos"),
            catalog: DEFAULT_IMAGES.iter().map(|s| s.to_string()).collect(),
            loader: LoaderConfig::default(),
            rotator: RotatorConfig::default(),
            spawner: SpawnerConfig::default(),
            sinks: SinksConfig::default(),
        }
    }
}

impl Config {
    /// Read a configuration file, filling unset fields with defaults.
    pub fn load(path: &Path) -> VerbenaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| VerbenaError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shipped_values() {
        let config = Config::default();
        assert_eq!(config.loader.max_concurrent_loads, 3);
        assert_eq!(config.loader.retry_attempts, 2);
        assert_eq!(config.loader.preload_count, 8);
        assert_eq!(config.rotator.rotate_period(), Duration::from_secs(5));
        assert_eq!(config.rotator.retry_delay(), Duration::from_secs(1));
        assert_eq!(config.rotator.prefetch_count, 3);
        assert_eq!(config.spawner.max_active_images, 15);
        assert_eq!(config.catalog.len(), 26);
        assert!(config.sinks.form_relay_url.is_some());
        assert!(config.sinks.webhook_url.is_none());
    }

    #[test]
    fn test_partial_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"rotator": {"rotate_period_secs": 10}, "sinks": {"form_relay_url": null}}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.rotator.rotate_period_secs, 10);
        assert_eq!(config.rotator.prefetch_count, 3);
        assert!(config.sinks.form_relay_url.is_none());
        assert_eq!(config.loader.preload_count, 8);
    }

    #[test]
    fn test_malformed_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, crate::error::VerbenaError::Serialization(_)));
    }
}
