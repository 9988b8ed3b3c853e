//! Error types for the armature animation driver

use serde::{Deserialize, Serialize};

/// Every way a driver call can be rejected.
///
/// A rejected call never changes playback state; the driver stays where it was.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ArmatureError {
    /// No AnimationData bound to the driver
    #[error("No animation data bound")]
    NoAnimationData,

    /// Movement name not present in the bound data
    #[error("Movement not found: {name}")]
    MovementNotFound { name: String },

    /// Movement index past the end of the bound data
    #[error("Movement index {index} is out of range (count: {count})")]
    MovementIndexOutOfRange { index: usize, count: usize },

    /// Movement list given to the sequencer was empty
    #[error("Movement list is empty")]
    EmptyMovementList,

    /// Frame jump requested before any movement was played
    #[error("No movement has been played")]
    NoActiveMovement,

    /// Frame jump outside the loaded movement
    #[error("Frame {frame} is out of range [0, {frame_count})")]
    FrameOutOfRange { frame: u32, frame_count: u32 },

    /// Two movements share a name
    #[error("Duplicate movement: {name}")]
    DuplicateMovement { name: String },

    /// Movement data violates its invariants
    #[error("Invalid movement '{name}': {reason}")]
    InvalidMovement { name: String, reason: String },

    /// Config values out of range
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// Serialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },
}

impl ArmatureError {
    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::NoAnimationData
            | Self::MovementNotFound { .. }
            | Self::MovementIndexOutOfRange { .. } => "lookup",
            Self::EmptyMovementList => "sequencing",
            Self::NoActiveMovement | Self::FrameOutOfRange { .. } => "playback",
            Self::DuplicateMovement { .. } | Self::InvalidMovement { .. } => "data",
            Self::InvalidConfig { .. } => "config",
            Self::SerializationError { .. } => "serialization",
        }
    }
}

impl From<serde_json::Error> for ArmatureError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}
