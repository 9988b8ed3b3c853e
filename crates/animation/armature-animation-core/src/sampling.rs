//! Keyframe sampling for bone tracks.
//!
//! Model:
//! - Each MovementBoneData has keys ordered by frame index.
//! - Between two keys the pose is blended linearly by the fractional frame.
//! - Before the first key and after the last key the nearest key is held.

use crate::data::{BonePose, FrameData, MovementBoneData};

/// Find the segment [i, i+1] that contains `frame`, and return (i, i+1, local_t),
/// where local_t is normalized to [0, 1] between the two key indices.
/// Edge cases:
/// - If frame <= first.index, returns (0, 0, 0).
/// - If frame >= last.index, returns (last, last, 0).
fn find_segment(frames: &[FrameData], frame: f32) -> (usize, usize, f32) {
    let n = frames.len();
    if n == 0 {
        return (0, 0, 0.0);
    }
    if n == 1 || frame <= frames[0].index as f32 {
        return (0, 0, 0.0);
    }
    if frame >= frames[n - 1].index as f32 {
        return (n - 1, n - 1, 0.0);
    }
    // First key strictly after `frame`; the segment starts one before it.
    let right = frames.partition_point(|k| k.index as f32 <= frame);
    let left = right - 1;
    let f0 = frames[left].index as f32;
    let f1 = frames[right].index as f32;
    let denom = (f1 - f0).max(f32::EPSILON);
    (left, right, ((frame - f0) / denom).clamp(0.0, 1.0))
}

/// Sample a bone's pose at a fractional frame position.
pub fn sample_bone(bone: &MovementBoneData, frame: f32) -> BonePose {
    let frames = &bone.frames;
    match frames.len() {
        0 => BonePose::IDENTITY,
        1 => frames[0].pose,
        _ => {
            let (i0, i1, t) = find_segment(frames, frame);
            if i0 == i1 {
                frames[i0].pose
            } else {
                frames[i0].pose.lerp(&frames[i1].pose, t)
            }
        }
    }
}
