//! Tween bindings: one per animated bone of the active movement.
//!
//! The pose math lives behind the [`Tween`] trait so hosts can plug in their own
//! curves; [`KeyframeTween`] is the default. A [`TweenBinding`] wraps a tween
//! with what the driver needs around it: the bone handle, the bone's keys, the
//! pose to blend away from, and frame-event detection.

use std::sync::Arc;

use crate::armature::{Armature, Bone};
use crate::data::{BonePose, MovementBoneData, MovementData};
use crate::ids::BoneId;
use crate::sampling::sample_bone;

/// Computes a bone's pose for a frame position of the active movement.
pub trait Tween {
    fn sample(&mut self, keys: &MovementBoneData, frame: f32) -> BonePose;
}

/// Creates the tween for each bone whenever a movement starts.
pub trait TweenFactory {
    fn create(&self, bone: &Bone, keys: &MovementBoneData) -> Box<dyn Tween>;
}

/// Linear interpolation between authored keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyframeTween;

impl Tween for KeyframeTween {
    fn sample(&mut self, keys: &MovementBoneData, frame: f32) -> BonePose {
        sample_bone(keys, frame)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct KeyframeTweenFactory;

impl TweenFactory for KeyframeTweenFactory {
    fn create(&self, _bone: &Bone, _keys: &MovementBoneData) -> Box<dyn Tween> {
        Box::new(KeyframeTween)
    }
}

/// A frame event found while the play head swept over a range of frames.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CrossedEvent {
    pub bone: BoneId,
    pub name: String,
    pub origin_frame: u32,
}

pub(crate) struct TweenBinding {
    bone: BoneId,
    movement: Arc<MovementData>,
    bone_index: usize,
    tween: Box<dyn Tween>,
    /// Pose held by the bone when the movement started; blend source.
    from: BonePose,
    pose: BonePose,
}

impl TweenBinding {
    /// Bind every armature bone that has keys in `movement`. Bones missing from
    /// `previous` blend from the identity pose.
    pub fn bind_all(
        armature: &Armature,
        movement: &Arc<MovementData>,
        factory: &dyn TweenFactory,
        previous: &[TweenBinding],
    ) -> Vec<TweenBinding> {
        armature
            .bones()
            .iter()
            .filter_map(|bone| {
                let bone_index = movement
                    .bones
                    .iter()
                    .position(|keys| keys.name == bone.name && !keys.frames.is_empty())?;
                let keys = &movement.bones[bone_index];
                let from = previous
                    .iter()
                    .find(|b| b.bone == bone.id)
                    .map(|b| b.pose)
                    .unwrap_or(BonePose::IDENTITY);
                Some(TweenBinding {
                    bone: bone.id,
                    movement: Arc::clone(movement),
                    bone_index,
                    tween: factory.create(bone, keys),
                    from,
                    pose: from,
                })
            })
            .collect()
    }

    pub fn bone(&self) -> BoneId {
        self.bone
    }

    fn keys(&self) -> &MovementBoneData {
        &self.movement.bones[self.bone_index]
    }

    /// Sample the movement at `frame` and blend from the start pose by `weight`.
    pub fn update(&mut self, frame: f32, weight: f32) -> BonePose {
        let target = self.tween.sample(&self.movement.bones[self.bone_index], frame);
        self.pose = if weight >= 1.0 {
            target
        } else {
            self.from.lerp(&target, weight.max(0.0))
        };
        self.pose
    }

    /// Frame events keyed in `(after, upto]`; `after = None` includes frame 0.
    pub fn crossed_events(&self, after: Option<u32>, upto: u32, out: &mut Vec<CrossedEvent>) {
        for key in &self.keys().frames {
            if key.index > upto {
                break;
            }
            if after.is_some_and(|a| key.index <= a) {
                continue;
            }
            if let Some(name) = &key.event {
                out.push(CrossedEvent {
                    bone: self.bone,
                    name: name.clone(),
                    origin_frame: key.index,
                });
            }
        }
    }
}

/// Collect crossed events of every binding, ordered by the frame they were keyed at.
pub(crate) fn crossed_events(
    bindings: &[TweenBinding],
    after: Option<u32>,
    upto: u32,
) -> Vec<CrossedEvent> {
    let mut out = Vec::new();
    for binding in bindings {
        binding.crossed_events(after, upto, &mut out);
    }
    // Stable: bones keyed on the same frame keep armature order.
    out.sort_by_key(|e| e.origin_frame);
    out
}
