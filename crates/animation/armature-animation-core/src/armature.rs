//! Armature and bone identity.
//!
//! The driver never interprets bones beyond their handle and name: names match
//! bones against [`MovementBoneData`](crate::data::MovementBoneData), handles
//! travel into events and pose outputs.

use serde::{Deserialize, Serialize};

use crate::ids::{ArmatureId, BoneId, IdAllocator};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bone {
    pub id: BoneId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Armature {
    id: ArmatureId,
    name: String,
    bones: Vec<Bone>,
}

impl Armature {
    pub fn new(id: ArmatureId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bones: Vec::new(),
        }
    }

    /// Add a bone, or return the existing handle if the name is already taken.
    pub fn add_bone(&mut self, ids: &mut IdAllocator, name: impl Into<String>) -> BoneId {
        let name = name.into();
        if let Some(existing) = self.bone(&name) {
            return existing.id;
        }
        let id = ids.alloc_bone();
        self.bones.push(Bone { id, name });
        id
    }

    pub fn id(&self) -> ArmatureId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, name: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name == name)
    }

    pub fn bone_by_id(&self, id: BoneId) -> Option<&Bone> {
        self.bones.iter().find(|b| b.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bone_names_are_unique() {
        let mut ids = IdAllocator::new();
        let mut armature = Armature::new(ids.alloc_armature(), "hero");
        let body = armature.add_bone(&mut ids, "body");
        let arm = armature.add_bone(&mut ids, "arm");
        assert_ne!(body, arm);
        assert_eq!(armature.add_bone(&mut ids, "body"), body);
        assert_eq!(armature.bones().len(), 2);
        assert_eq!(armature.bone_by_id(arm).unwrap().name, "arm");
    }
}
