//! Distributes a document's frame values into per-joint motion records and
//! applies them onto a skeleton.

use glam::{Mat3, Quat, Vec3};

use crate::bvh::{Channel, MotionDocument};
use crate::error::{AnymError, Result};
use crate::math::quat_from_ordered_euler;
use crate::skeleton::Skeleton;

/// Axis convention for root position channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportConvention {
    /// Position channels map straight onto x/y/z (skinned character rig).
    MeshRig,
    /// Procedurally built skeleton: Xposition lands on z, Yposition on x,
    /// Zposition on y.
    Procedural,
}

/// One joint's slice of the frame, rotations still in degrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct JointMotion {
    pub position: Vec3,
    pub rot_x: f32,
    pub rot_y: f32,
    pub rot_z: f32,
}

impl JointMotion {
    pub fn has_rotation(&self) -> bool {
        self.rot_x != 0.0 || self.rot_y != 0.0 || self.rot_z != 0.0
    }
}

/// Walks the channel sequence over the frame values, producing one record per
/// joint (indexed like the document arena). Distribution stops when the
/// values run out; surplus values are ignored.
pub fn distribute(
    doc: &MotionDocument,
    convention: ImportConvention,
    scale: f32,
) -> Vec<JointMotion> {
    let mut motion = vec![JointMotion::default(); doc.joints.len()];

    for (&(joint, channel), &value) in doc.channel_sequence.iter().zip(doc.frame_values.iter()) {
        let record = &mut motion[joint];
        match channel {
            Channel::Xposition => match convention {
                ImportConvention::MeshRig => record.position.x = value * scale,
                ImportConvention::Procedural => record.position.z = value * scale,
            },
            Channel::Yposition => match convention {
                ImportConvention::MeshRig => record.position.y = value * scale,
                ImportConvention::Procedural => record.position.x = value * scale,
            },
            Channel::Zposition => match convention {
                ImportConvention::MeshRig => record.position.z = value * scale,
                ImportConvention::Procedural => record.position.y = value * scale,
            },
            Channel::Xrotation => record.rot_x = value,
            Channel::Yrotation => record.rot_y = value,
            Channel::Zrotation => record.rot_z = value,
        }
    }

    motion
}

/// Applies distributed motion onto a skeleton's pose state.
///
/// End sites and joints without a matching bone are skipped. Only the root
/// takes a pose location. A rotation triple builds a matrix with the joint's
/// order reversed (see [`crate::math::RotationOrder::reversed`]), conjugated
/// into the bone frame through the rest rotation and stored as a quaternion;
/// an all-zero triple leaves the bone untouched.
pub fn apply(skeleton: &mut Skeleton, doc: &MotionDocument, motion: &[JointMotion]) -> Result<()> {
    if motion.len() != doc.joints.len() {
        return Err(AnymError::Validation(format!(
            "motion table covers {} joints, document has {}",
            motion.len(),
            doc.joints.len()
        )));
    }

    for (joint_idx, (joint, record)) in doc.joints.iter().zip(motion).enumerate() {
        if joint.is_end_site {
            continue;
        }
        let Some(bone_idx) = skeleton.index_of(&joint.name) else {
            continue;
        };

        skeleton.bones[bone_idx].rotation_order = joint.rotation_order;

        if joint_idx == doc.root {
            skeleton.bones[bone_idx].pose_location = record.position;
        }

        if record.has_rotation() {
            let rest = Mat3::from_mat4(skeleton.bones[bone_idx].rest);
            let bvh_rotation = Mat3::from_quat(quat_from_ordered_euler(
                joint.rotation_order.reversed(),
                record.rot_x.to_radians(),
                record.rot_y.to_radians(),
                record.rot_z.to_radians(),
            ));
            let local = rest.inverse() * bvh_rotation * rest;
            skeleton.bones[bone_idx].pose_rotation = Quat::from_mat3(&local).normalize();
        }
    }

    Ok(())
}
