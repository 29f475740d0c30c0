use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::interpolation::error::ConfigError;

/// Configuration for the [`TrackStateInterpolator`](super::TrackStateInterpolator).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InterpolatorConfig {
    /// When false, ticks are copied straight to the output.
    pub enabled: bool,
    /// Slot of the timestamp vector that carries the tick's tracks and
    /// homography. Clipped to the last slot on short vectors.
    pub live_index: usize,
    /// Multiplier turning timestamp differences into seconds.
    pub timestamp_to_seconds: f64,
    /// Frames a packet may wait for its gap to close before a forced flush.
    pub gap_buffer_max_length: u32,
}

impl Default for InterpolatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            live_index: 0,
            timestamp_to_seconds: 1.0e-6,
            gap_buffer_max_length: 60,
        }
    }
}

impl InterpolatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.timestamp_to_seconds.is_finite() || self.timestamp_to_seconds <= 0.0 {
            return Err(ConfigError::InvalidTimestampScale(self.timestamp_to_seconds));
        }
        if self.gap_buffer_max_length == 0 {
            return Err(ConfigError::ZeroGapBuffer);
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: InterpolatorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// The live slot for a timestamp vector of length `len` (> 0).
    pub(crate) fn clipped_live_index(&self, len: usize) -> usize {
        self.live_index.min(len.saturating_sub(1))
    }
}
