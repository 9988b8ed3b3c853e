//! Output contract of [`ArmatureAnimation::update`](crate::ArmatureAnimation::update).
//!
//! Outputs carry the pose of every animated bone for this tick. Events are not
//! part of the outputs; they are dispatched to the registered listeners.

use serde::{Deserialize, Serialize};

use crate::data::BonePose;
use crate::ids::{ArmatureId, BoneId};

/// Pose computed for one bone this tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseChange {
    pub armature: ArmatureId,
    pub bone: BoneId,
    pub pose: BonePose,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default)]
    pub poses: Vec<PoseChange>,
}

impl Outputs {
    #[inline]
    pub fn clear(&mut self) {
        self.poses.clear();
    }

    #[inline]
    pub fn push_pose(&mut self, change: PoseChange) {
        self.poses.push(change);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn pose(&self, bone: BoneId) -> Option<&BonePose> {
        self.poses.iter().find(|c| c.bone == bone).map(|c| &c.pose)
    }
}
