//! Persistent engine configuration.
//!
//! Stores timing and recovery settings in `~/.mobitest/config.json`. The path
//! can be overridden with the `MOBITEST_CONFIG` environment variable. Every
//! field has a default, so a partial file only overrides what it names.
//!
//! # Example
//!
//! ```no_run
//! use mobitest_core::config::EngineConfig;
//!
//! // Load (returns defaults if file doesn't exist)
//! let config = EngineConfig::load();
//! println!("default timeout: {:?}", config.default_timeout());
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::wait::WaitSpec;

const CONFIG_DIRNAME: &str = ".mobitest";
const CONFIG_FILENAME: &str = "config.json";
const CONFIG_ENV: &str = "MOBITEST_CONFIG";

/// Returns the mobitest home directory (`~/.mobitest/`), falling back to the
/// current directory when no home directory can be determined.
pub fn mobitest_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIRNAME)
}

/// Resolved location of the config file.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| mobitest_dir().join(CONFIG_FILENAME))
}

/// Vertical scroll gesture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Where the finger lands, as a fraction of viewport height.
    pub start_ratio: f64,
    /// Where the finger lifts, as a fraction of viewport height.
    pub end_ratio: f64,
    /// Duration of the drag.
    pub gesture_ms: u64,
    /// Pause after the gesture for scroll momentum and animations to finish.
    pub settle_ms: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            start_ratio: 0.7,
            end_ratio: 0.3,
            gesture_ms: 500,
            settle_ms: 500,
        }
    }
}

/// Timing and recovery settings for the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Budget for resolving elements the scenario requires.
    pub default_timeout_ms: u64,
    /// Sleep between polls.
    pub poll_interval_ms: u64,
    /// Budget for non-fatal visibility probes.
    pub probe_timeout_ms: u64,
    /// How many times a resolved element is re-checked before a click gives up.
    pub interactable_checks: u32,
    /// Pause between re-checks of an element that is not yet actionable.
    pub recheck_interval_ms: u64,
    /// Shared deadline for the checkout outcome race.
    pub checkout_timeout_ms: u64,
    pub scroll: ScrollConfig,
    /// Where diagnostic snapshots are written. `None` keeps them in memory only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_dir: Option<PathBuf>,
    /// How many snapshots the recorder keeps in memory.
    pub snapshot_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 10_000,
            poll_interval_ms: 250,
            probe_timeout_ms: 2_000,
            interactable_checks: 3,
            recheck_interval_ms: 500,
            checkout_timeout_ms: 10_000,
            scroll: ScrollConfig::default(),
            snapshot_dir: None,
            snapshot_history: 16,
        }
    }
}

impl EngineConfig {
    /// Load config from [`config_path`].
    ///
    /// Returns [`Default`] if the file does not exist, cannot be parsed, or
    /// fails validation.
    pub fn load() -> Self {
        let path = config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to [`config_path`].
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }

    /// Rejects settings the engine cannot honour.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (name, timeout) in [
            ("default_timeout_ms", self.default_timeout_ms),
            ("probe_timeout_ms", self.probe_timeout_ms),
            ("checkout_timeout_ms", self.checkout_timeout_ms),
        ] {
            if self.poll_interval_ms >= timeout {
                return Err(EngineError::Config(format!(
                    "poll_interval_ms ({}) must be below {} ({})",
                    self.poll_interval_ms, name, timeout
                )));
            }
        }
        if self.poll_interval_ms == 0 {
            return Err(EngineError::Config("poll_interval_ms must be positive".to_string()));
        }
        if self.interactable_checks == 0 {
            return Err(EngineError::Config(
                "interactable_checks must be at least 1".to_string(),
            ));
        }
        let in_range = |r: f64| r > 0.0 && r < 1.0;
        if !in_range(self.scroll.start_ratio) || !in_range(self.scroll.end_ratio) {
            return Err(EngineError::Config(
                "scroll ratios must lie strictly between 0 and 1".to_string(),
            ));
        }
        if self.scroll.start_ratio == self.scroll.end_ratio {
            return Err(EngineError::Config(
                "scroll start and end ratios must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn recheck_interval(&self) -> Duration {
        Duration::from_millis(self.recheck_interval_ms)
    }

    /// The shared wait window for the checkout outcome race.
    pub fn checkout_wait(&self) -> Result<WaitSpec, EngineError> {
        WaitSpec::new(
            Duration::from_millis(self.checkout_timeout_ms),
            self.poll_interval(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_timeout(), Duration::from_secs(10));
        assert!(config.snapshot_dir.is_none());
    }

    #[test]
    fn roundtrip_serialization() {
        let config = EngineConfig {
            snapshot_dir: Some(PathBuf::from("/tmp/snapshots")),
            ..EngineConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let loaded: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let loaded: EngineConfig =
            serde_json::from_str(r#"{"default_timeout_ms": 3000, "scroll": {"settle_ms": 100}}"#)
                .unwrap();
        assert_eq!(loaded.default_timeout_ms, 3000);
        assert_eq!(loaded.scroll.settle_ms, 100);
        assert_eq!(loaded.scroll.start_ratio, 0.7);
        assert_eq!(loaded.poll_interval_ms, 250);
    }

    #[test]
    fn validate_rejects_poll_not_below_timeout() {
        let config = EngineConfig {
            poll_interval_ms: 2_000,
            ..EngineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("probe_timeout_ms"));
    }

    #[test]
    fn validate_rejects_bad_ratios() {
        let mut config = EngineConfig::default();
        config.scroll.end_ratio = 1.5;
        assert!(config.validate().is_err());

        config.scroll.end_ratio = 0.7;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_checks() {
        let config = EngineConfig {
            interactable_checks: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = EngineConfig {
            probe_timeout_ms: 750,
            ..EngineConfig::default()
        };
        config.save_to(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.probe_timeout_ms, 750);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = EngineConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn load_from_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EngineConfig::load_from(&dir.path().join("absent.json")).is_err());
    }
}
