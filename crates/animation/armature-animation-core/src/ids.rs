//! Identifiers and a simple allocator for armatures and bones.

use serde::{Deserialize, Serialize};

/// Opaque handle of an armature; passed through to movement events.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ArmatureId(pub u32);

/// Opaque handle of a bone; passed through to frame events and pose outputs.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BoneId(pub u32);

/// Monotonic allocator for ArmatureId and BoneId.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_armature: u32,
    next_bone: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_armature(&mut self) -> ArmatureId {
        let id = ArmatureId(self.next_armature);
        self.next_armature = self.next_armature.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_bone(&mut self) -> BoneId {
        let id = BoneId(self.next_bone);
        self.next_bone = self.next_bone.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
