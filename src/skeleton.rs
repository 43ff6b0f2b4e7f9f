//! Deform skeleton built from a parsed motion document.
//!
//! Bones live in an arena in pre-order (a parent always precedes its
//! children), so pose evaluation is a single forward pass. Each bone stores
//! its rest matrix in armature space (origin at the head, Y axis pointing at
//! the tail) plus the current pose rotation/location on top of it.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};

use crate::bvh::MotionDocument;
use crate::error::{AnymError, Result};
use crate::math::RotationOrder;
use crate::rig::ControlRig;

/// Tail extent given to the root bone and to joints without any child.
pub const ROOT_TAIL_EXTENT: f32 = 0.03;

/// One deform bone.
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Armature-space head position.
    pub head: Vec3,
    /// Armature-space tail position.
    pub tail: Vec3,
    /// Armature-space rest matrix: translation at the head, Y axis aligned
    /// head to tail (shortest arc, zero roll).
    pub rest: Mat4,
    /// Euler order annotation carried over from the source joint.
    pub rotation_order: RotationOrder,
    /// Pose rotation on top of the rest orientation.
    pub pose_rotation: Quat,
    /// Pose translation on top of the rest position (root only in practice).
    pub pose_location: Vec3,
}

impl Bone {
    pub fn length(&self) -> f32 {
        self.head.distance(self.tail)
    }
}

/// A skeleton plus its evaluated pose state and optional control rig.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub name: String,
    pub bones: Vec<Bone>,
    by_name: HashMap<String, usize>,
    pub root: usize,
    /// Object-level world transform, identity by default.
    pub world: Mat4,
    pub control_rig: Option<ControlRig>,
}

impl Skeleton {
    /// Builds the bone arena from a parsed document.
    ///
    /// The root bone sits at the origin with a short fixed tail; every other
    /// bone's head is its parent's head plus the joint offset, and its tail
    /// points at its first child (an end-site child only overrides the tail
    /// and produces no bone of its own).
    pub fn from_document(doc: &MotionDocument, name: &str) -> Result<Skeleton> {
        if doc.joints[doc.root].is_end_site {
            return Err(AnymError::Format("root joint is an End Site".to_string()));
        }

        let mut bones = Vec::new();
        let mut by_name = HashMap::new();
        build_bone(doc, doc.root, None, &mut bones, &mut by_name);

        log::debug!("built skeleton '{}' with {} bones", name, bones.len());

        Ok(Skeleton {
            name: name.to_string(),
            bones,
            by_name,
            root: 0,
            world: Mat4::IDENTITY,
            control_rig: None,
        })
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn bone(&self, name: &str) -> Option<&Bone> {
        self.index_of(name).map(|i| &self.bones[i])
    }

    pub fn bone_mut(&mut self, name: &str) -> Option<&mut Bone> {
        self.index_of(name).map(|i| &mut self.bones[i])
    }

    /// Resets the pose state without touching rest data.
    pub fn clear_pose(&mut self) {
        for bone in &mut self.bones {
            bone.pose_rotation = Quat::IDENTITY;
            bone.pose_location = Vec3::ZERO;
        }
    }

    /// Evaluates armature-space pose matrices for every bone.
    ///
    /// A bone's pose matrix is its parent's pose matrix times the rest-local
    /// offset times the pose basis; the root applies its basis directly on
    /// its rest matrix. Relies on the pre-order bone layout.
    pub fn pose_matrices(&self) -> Vec<Mat4> {
        let mut matrices = vec![Mat4::IDENTITY; self.bones.len()];
        for (i, bone) in self.bones.iter().enumerate() {
            let basis = Mat4::from_rotation_translation(bone.pose_rotation, bone.pose_location);
            matrices[i] = match bone.parent {
                None => bone.rest * basis,
                Some(p) => {
                    matrices[p] * (self.bones[p].rest.inverse() * bone.rest) * basis
                }
            };
        }
        matrices
    }
}

fn build_bone(
    doc: &MotionDocument,
    joint_idx: usize,
    parent: Option<usize>,
    bones: &mut Vec<Bone>,
    by_name: &mut HashMap<String, usize>,
) {
    let joint = &doc.joints[joint_idx];
    let idx = bones.len();

    let (head, tail) = match parent {
        None => (Vec3::ZERO, Vec3::new(0.0, 0.0, ROOT_TAIL_EXTENT)),
        Some(p) => {
            let head = bones[p].head + joint.offset;
            let tail = match joint.children.first() {
                Some(&child) => head + doc.joints[child].offset,
                None => head + Vec3::new(0.0, 0.0, ROOT_TAIL_EXTENT),
            };
            (head, tail)
        }
    };

    bones.push(Bone {
        name: joint.name.clone(),
        parent,
        children: Vec::new(),
        head,
        tail,
        rest: Mat4::IDENTITY,
        rotation_order: joint.rotation_order,
        pose_rotation: Quat::IDENTITY,
        pose_location: Vec3::ZERO,
    });
    by_name.insert(joint.name.clone(), idx);
    if let Some(p) = parent {
        bones[p].children.push(idx);
    }

    for &child in &doc.joints[joint_idx].children {
        if doc.joints[child].is_end_site {
            bones[idx].tail = bones[idx].head + doc.joints[child].offset;
        } else {
            build_bone(doc, child, Some(idx), bones, by_name);
        }
    }

    // Tail is final only after end-site children have been seen
    bones[idx].rest = rest_matrix(bones[idx].head, bones[idx].tail);
}

/// Rest matrix with the Y axis rotated onto the head-to-tail direction.
fn rest_matrix(head: Vec3, tail: Vec3) -> Mat4 {
    let dir = tail - head;
    let rotation = if dir.length_squared() > f32::EPSILON {
        Quat::from_rotation_arc(Vec3::Y, dir.normalize())
    } else {
        Quat::IDENTITY
    };
    Mat4::from_rotation_translation(rotation, head)
}
