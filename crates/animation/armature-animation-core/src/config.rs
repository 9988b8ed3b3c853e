//! Driver configuration.

use serde::{Deserialize, Serialize};

use crate::error::ArmatureError;

/// Timing and sizing knobs for an [`ArmatureAnimation`](crate::ArmatureAnimation).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds covered by one authored frame.
    pub frame_interval: f32,

    /// Deltas above this many seconds are treated as hitches and do not advance time.
    pub max_delta_seconds: f32,

    /// Initial capacity hint for the per-tick event queue.
    pub event_queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_interval: 1.0 / 60.0,
            max_delta_seconds: 1.0,
            event_queue_capacity: 64,
        }
    }
}

impl Config {
    /// Reject intervals and limits that would make frame math meaningless.
    pub fn validate(&self) -> Result<(), ArmatureError> {
        if !self.frame_interval.is_finite() || self.frame_interval <= 0.0 {
            return Err(ArmatureError::InvalidConfig {
                reason: format!("frame_interval must be > 0, got {}", self.frame_interval),
            });
        }
        if self.max_delta_seconds.is_nan() || self.max_delta_seconds <= 0.0 {
            return Err(ArmatureError::InvalidConfig {
                reason: format!(
                    "max_delta_seconds must be > 0, got {}",
                    self.max_delta_seconds
                ),
            });
        }
        Ok(())
    }
}
