//! Movement data model.
//!
//! An [`AnimationData`] holds every movement available to one armature. It is
//! read-only once built and shared through `Arc` between the armature and any
//! number of drivers.

use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::ArmatureError;

fn one() -> f32 {
    1.0
}

/// Local transform of one bone relative to its setup pose.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BonePose {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    /// Radians.
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "one", rename = "scaleX")]
    pub scale_x: f32,
    #[serde(default = "one", rename = "scaleY")]
    pub scale_y: f32,
}

impl BonePose {
    pub const IDENTITY: BonePose = BonePose {
        x: 0.0,
        y: 0.0,
        rotation: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
    };

    pub fn new(x: f32, y: f32, rotation: f32) -> Self {
        Self {
            x,
            y,
            rotation,
            ..Self::IDENTITY
        }
    }

    /// Component-wise linear blend; `t = 0` yields `self`, `t = 1` yields `other`.
    pub fn lerp(&self, other: &BonePose, t: f32) -> BonePose {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        BonePose {
            x: mix(self.x, other.x),
            y: mix(self.y, other.y),
            rotation: mix(self.rotation, other.rotation),
            scale_x: mix(self.scale_x, other.scale_x),
            scale_y: mix(self.scale_y, other.scale_y),
        }
    }
}

impl Default for BonePose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One authored key of a bone within a movement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameData {
    /// Frame index within the movement, `0..frame_count`.
    pub index: u32,
    #[serde(default)]
    pub pose: BonePose,
    /// Frame event fired when playback reaches `index`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl FrameData {
    pub fn new(index: u32, pose: BonePose) -> Self {
        Self {
            index,
            pose,
            event: None,
        }
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }
}

/// Keys of one bone within a movement, ordered by frame index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementBoneData {
    /// Name of the armature bone these keys drive.
    pub name: String,
    #[serde(default)]
    pub frames: Vec<FrameData>,
}

impl MovementBoneData {
    pub fn new(name: impl Into<String>, frames: Vec<FrameData>) -> Self {
        Self {
            name: name.into(),
            frames,
        }
    }
}

/// Immutable description of one named movement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementData {
    pub name: String,
    /// Total number of frames.
    #[serde(rename = "duration")]
    pub frame_count: u32,
    /// Playback multiplier applied on top of the driver's speed scale.
    #[serde(default = "one")]
    pub scale: f32,
    /// Default blend length in frames when this movement is played.
    #[serde(default, rename = "durationTo")]
    pub duration_to: u32,
    /// Default loop flag.
    #[serde(default, rename = "loop")]
    pub looping: bool,
    #[serde(default)]
    pub bones: Vec<MovementBoneData>,
}

impl MovementData {
    pub fn new(name: impl Into<String>, frame_count: u32) -> Self {
        Self {
            name: name.into(),
            frame_count,
            scale: 1.0,
            duration_to: 0,
            looping: false,
            bones: Vec::new(),
        }
    }

    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_duration_to(mut self, frames: u32) -> Self {
        self.duration_to = frames;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_bone(mut self, bone: MovementBoneData) -> Self {
        self.bones.push(bone);
        self
    }

    /// Keys for the named bone, if the movement animates it.
    pub fn bone(&self, name: &str) -> Option<&MovementBoneData> {
        self.bones.iter().find(|b| b.name == name)
    }

    /// Validate frame count, frame ordering, frame bounds and scale.
    pub fn validate(&self) -> Result<(), ArmatureError> {
        let invalid = |reason: String| ArmatureError::InvalidMovement {
            name: self.name.clone(),
            reason,
        };
        if !self.scale.is_finite() || self.scale < 0.0 {
            return Err(invalid(format!("scale must be >= 0, got {}", self.scale)));
        }
        if self.frame_count == 0 {
            return Err(invalid("frame count must be > 0".to_string()));
        }
        for bone in &self.bones {
            let mut last: Option<u32> = None;
            for frame in &bone.frames {
                if frame.index >= self.frame_count {
                    return Err(invalid(format!(
                        "bone '{}' keys frame {} past frame count {}",
                        bone.name, frame.index, self.frame_count
                    )));
                }
                if last.is_some_and(|l| frame.index <= l) {
                    return Err(invalid(format!(
                        "bone '{}' frames must be strictly increasing",
                        bone.name
                    )));
                }
                last = Some(frame.index);
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawAnimationData {
    name: String,
    #[serde(default)]
    movements: Vec<MovementData>,
}

/// Every movement available to one armature, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawAnimationData")]
pub struct AnimationData {
    name: String,
    movements: Vec<Arc<MovementData>>,
    index: HashMap<String, usize>,
}

impl TryFrom<RawAnimationData> for AnimationData {
    type Error = ArmatureError;

    fn try_from(raw: RawAnimationData) -> Result<Self, Self::Error> {
        let mut data = AnimationData::new(raw.name);
        for movement in raw.movements {
            if data.index.contains_key(&movement.name) {
                return Err(ArmatureError::DuplicateMovement {
                    name: movement.name,
                });
            }
            data.add_movement(movement)?;
        }
        Ok(data)
    }
}

impl AnimationData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            movements: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Parse and validate a JSON document of the form `{ "name", "movements": [...] }`.
    pub fn from_json(json: &str) -> Result<Self, ArmatureError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a movement. A movement with the same name is replaced in place and
    /// keeps its index.
    pub fn add_movement(&mut self, movement: MovementData) -> Result<(), ArmatureError> {
        movement.validate()?;
        match self.index.get(&movement.name) {
            Some(&slot) => {
                log::debug!("replacing movement '{}'", movement.name);
                self.movements[slot] = Arc::new(movement);
            }
            None => {
                self.index.insert(movement.name.clone(), self.movements.len());
                self.movements.push(Arc::new(movement));
            }
        }
        Ok(())
    }

    pub fn with_movement(mut self, movement: MovementData) -> Result<Self, ArmatureError> {
        self.add_movement(movement)?;
        Ok(self)
    }

    pub fn movement(&self, name: &str) -> Option<&Arc<MovementData>> {
        self.index.get(name).map(|&i| &self.movements[i])
    }

    pub fn movement_at(&self, index: usize) -> Option<&Arc<MovementData>> {
        self.movements.get(index)
    }

    pub fn movement_names(&self) -> impl Iterator<Item = &str> {
        self.movements.iter().map(|m| m.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.movements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }
}
