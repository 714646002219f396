use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Fastest allowed sample rate of the elapsed-time reporter
pub const MIN_TICK_INTERVAL_MS: u64 = 50;
/// Lowest playback rate accepted by the engine
pub const MIN_PLAYBACK_RATE: f32 = 0.05;
/// Highest playback rate accepted by the engine
pub const MAX_PLAYBACK_RATE: f32 = 4.0;

/// Engine configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval between `seconds_elapsed` samples while playing
    pub tick_interval_ms: u64,
    /// Upper bound on resource resolution before the load fails
    pub load_timeout_ms: u64,
    /// Default for loads that do not specify it (used by `audioctl`)
    pub play_when_ready: bool,
    /// Rate used when playback starts
    pub default_rate: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            load_timeout_ms: 15_000,
            play_when_ready: true,
            default_rate: 1.0,
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            return Err(ConfigError::InvalidValue {
                field: "tick_interval_ms".to_string(),
                reason: format!("must be at least {} ms", MIN_TICK_INTERVAL_MS),
            });
        }
        if self.load_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "load_timeout_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if !is_valid_rate(self.default_rate) {
            return Err(ConfigError::InvalidValue {
                field: "default_rate".to_string(),
                reason: format!(
                    "must be between {} and {}",
                    MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE
                ),
            });
        }
        Ok(())
    }
}

/// Whether `rate` can drive the playback clock
pub fn is_valid_rate(rate: f32) -> bool {
    rate.is_finite() && (MIN_PLAYBACK_RATE..=MAX_PLAYBACK_RATE).contains(&rate)
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    config: EngineConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load the configuration from `~/.config/audio-manager/config.toml`
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Ok(Self::with_path(config_path))
    }

    /// Load the configuration from an explicit file, falling back to defaults
    pub fn with_path(config_path: PathBuf) -> Self {
        let config = match Self::load_config(&config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Ignoring configuration at {}: {}",
                    config_path.display(),
                    e
                );
                EngineConfig::default()
            }
        };

        Self {
            config,
            config_path,
        }
    }

    pub fn get_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Apply `updater`, validate the result and persist it.
    ///
    /// An invalid result leaves the current configuration untouched.
    pub fn update_config<F>(&mut self, updater: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut EngineConfig),
    {
        let mut candidate = self.config.clone();
        updater(&mut candidate);
        candidate.validate()?;
        self.config = candidate;
        self.save_config()
    }

    pub fn set_tick_interval_ms(&mut self, interval_ms: u64) -> Result<(), ConfigError> {
        self.update_config(|config| config.tick_interval_ms = interval_ms)
    }

    pub fn set_load_timeout_ms(&mut self, timeout_ms: u64) -> Result<(), ConfigError> {
        self.update_config(|config| config.load_timeout_ms = timeout_ms)
    }

    pub fn set_play_when_ready(&mut self, enabled: bool) -> Result<(), ConfigError> {
        self.update_config(|config| config.play_when_ready = enabled)
    }

    pub fn set_default_rate(&mut self, rate: f32) -> Result<(), ConfigError> {
        self.update_config(|config| config.default_rate = rate)
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.config = EngineConfig::default();
        self.save_config()
    }

    fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::home_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join(".config")
            .join("audio-manager");

        Ok(config_dir.join("config.toml"))
    }

    fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
        if !path.exists() {
            return Ok(EngineConfig::default());
        }

        let config_content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&config_content)?;
        config.validate()?;

        Ok(config)
    }

    fn save_config(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let config_content = toml::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, config_content)?;

        Ok(())
    }
}
