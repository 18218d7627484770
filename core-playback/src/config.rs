//! # Playback Configuration
//!
//! Tunables for the playback controller.

use core_runtime::config::{
    RaagyaConfig, DEFAULT_LOAD_TIMEOUT, DEFAULT_PROGRESS_INTERVAL, DEFAULT_VOLUME_PERCENT,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Volume applied before the user touches the slider (0-100).
    ///
    /// Default: 80.
    #[serde(default = "default_volume")]
    pub default_volume: u8,

    /// How often the playing position is sampled from the output.
    ///
    /// Default: 1 second.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: Duration,

    /// Maximum time a load may stay unresolved before it is failed.
    ///
    /// `None` disables the watchdog. Default: 15 seconds.
    #[serde(default = "default_load_timeout")]
    pub load_timeout: Option<Duration>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            progress_interval: default_progress_interval(),
            load_timeout: default_load_timeout(),
        }
    }
}

impl PlaybackConfig {
    pub fn from_runtime(config: &RaagyaConfig) -> Self {
        Self {
            default_volume: config.default_volume,
            progress_interval: config.progress_interval,
            load_timeout: config.load_timeout,
        }
    }

    pub fn with_default_volume(mut self, percent: u8) -> Self {
        self.default_volume = percent;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_load_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_volume > 100 {
            return Err("default_volume must be between 0 and 100".to_string());
        }

        if self.progress_interval.is_zero() {
            return Err("progress_interval must be > 0".to_string());
        }

        if matches!(self.load_timeout, Some(timeout) if timeout.is_zero()) {
            return Err("load_timeout must be > 0 when set".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_volume() -> u8 {
    DEFAULT_VOLUME_PERCENT
}

fn default_progress_interval() -> Duration {
    DEFAULT_PROGRESS_INTERVAL
}

fn default_load_timeout() -> Option<Duration> {
    Some(DEFAULT_LOAD_TIMEOUT)
}
