//! Armature Animation Core (engine-agnostic)
//!
//! Frame-based skeletal movement playback for a single armature: movement data
//! shared behind `Arc`, a per-armature driver ([`ArmatureAnimation`]) that
//! advances by wall-clock deltas, cross-fades between movements, sequences
//! movement lists, and reports lifecycle and frame events to listeners.
//!
//! Rendering and scene-graph integration are left to the host; each
//! [`ArmatureAnimation::update`] returns the bone poses computed for the tick.

pub mod animation;
pub mod armature;
pub mod config;
pub mod data;
pub mod error;
pub mod event;
pub mod ids;
pub mod inputs;
pub mod outputs;
pub mod sampling;
mod sequencer;
pub mod tween;

// Re-exports for consumers (adapters)
pub use animation::ArmatureAnimation;
pub use armature::{Armature, Bone};
pub use config::Config;
pub use data::{AnimationData, BonePose, FrameData, MovementBoneData, MovementData};
pub use error::ArmatureError;
pub use event::{
    FrameEvent, FrameEventSelector, MovementEvent, MovementEventSelector, MovementEventType,
};
pub use ids::{ArmatureId, BoneId, IdAllocator};
pub use inputs::{BlendDuration, LoopMode, PlaybackState};
pub use outputs::{Outputs, PoseChange};
pub use sampling::sample_bone;
pub use tween::{KeyframeTween, KeyframeTweenFactory, Tween, TweenFactory};

pub type Result<T> = core::result::Result<T, ArmatureError>;
