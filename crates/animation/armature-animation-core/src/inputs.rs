//! Input contracts for play-style calls.
//!
//! Movements carry authored defaults for their blend length and loop flag;
//! callers either defer to them or force a value.

use serde::{Deserialize, Serialize};

/// Loop behaviour requested by a play call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopMode {
    /// Use the movement's authored loop flag.
    #[default]
    MovementDefault,
    /// Play once, then stop on the last frame.
    Once,
    /// Wrap to frame 0 at the end.
    Loop,
}

impl LoopMode {
    #[inline]
    pub fn resolve(self, movement_default: bool) -> bool {
        match self {
            LoopMode::MovementDefault => movement_default,
            LoopMode::Once => false,
            LoopMode::Loop => true,
        }
    }
}

/// `< 0` defers to the movement, `0` plays once, `> 0` loops.
impl From<i32> for LoopMode {
    fn from(raw: i32) -> Self {
        match raw {
            r if r < 0 => LoopMode::MovementDefault,
            0 => LoopMode::Once,
            _ => LoopMode::Loop,
        }
    }
}

/// Number of frames used to blend from the previous movement into a new one.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendDuration {
    /// Use the movement's authored `duration_to`.
    #[default]
    MovementDefault,
    /// Blend over exactly this many frames; `0` cuts instantly.
    Frames(u32),
}

impl BlendDuration {
    #[inline]
    pub fn resolve(self, movement_default: u32) -> u32 {
        match self {
            BlendDuration::MovementDefault => movement_default,
            BlendDuration::Frames(frames) => frames,
        }
    }
}

/// `< 0` defers to the movement, otherwise a frame count.
impl From<i32> for BlendDuration {
    fn from(raw: i32) -> Self {
        u32::try_from(raw)
            .map(BlendDuration::Frames)
            .unwrap_or(BlendDuration::MovementDefault)
    }
}

/// Observable playback status.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
    /// Playing, but still consuming the blend budget of the last play call.
    Blending,
}
