//! Export path: extracts channel-space rotation triples and the root world
//! position back out of a posed skeleton, the inverse of [`crate::pose`].

use glam::{Mat3, Mat4, Quat};

use crate::error::{AnymError, Result};
use crate::math::{wrap_degrees, xyz_euler_from_quat};
use crate::skeleton::Skeleton;

/// One extracted frame in the remote service's channel representation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPose {
    /// `[z, y, x]` degree triples in `[0, 360)`, one per bone in pre-order
    /// from the root.
    pub rotations: Vec<[f32; 3]>,
    /// Root world position remapped `(x, z, -y)`.
    pub root_position: [f32; 3],
}

/// Extracts the current pose of `skeleton`, starting at `root_name`.
///
/// Per bone the rest-local pose delta is isolated
/// (`L_rest⁻¹ · L_pose`, rotation part only), conjugated back into document
/// space through the rest matrix and decomposed as an XYZ Euler. The root
/// triple additionally absorbs the skeleton's object-level world rotation.
pub fn extract(skeleton: &Skeleton, root_name: &str) -> Result<ExtractedPose> {
    let root = skeleton
        .index_of(root_name)
        .ok_or_else(|| AnymError::BoneNotFound(root_name.to_string()))?;

    let pose_matrices = skeleton.pose_matrices();
    let order = preorder(skeleton, root);

    let world_rotation = Quat::from_mat3(&Mat3::from_mat4(skeleton.world));
    let (ox, oy, oz) = xyz_euler_from_quat(world_rotation);

    let mut rotations = Vec::with_capacity(order.len());
    for &i in &order {
        let bone = &skeleton.bones[i];

        let (local_pose, local_rest) = match bone.parent {
            Some(p) => (
                pose_matrices[p].inverse() * pose_matrices[i],
                skeleton.bones[p].rest.inverse() * bone.rest,
            ),
            None => (pose_matrices[i], bone.rest),
        };

        let delta = local_rest.inverse() * local_pose;
        let local_rotation = Mat4::from_mat3(Mat3::from_mat4(delta));
        let document_rotation = bone.rest * local_rotation * bone.rest.inverse();

        let q = Quat::from_mat3(&Mat3::from_mat4(document_rotation)).normalize();
        let (mut x, mut y, mut z) = xyz_euler_from_quat(q);
        if i == root {
            x += ox;
            y += oy;
            z += oz;
        }

        rotations.push([
            wrap_degrees(z.to_degrees()),
            wrap_degrees(y.to_degrees()),
            wrap_degrees(x.to_degrees()),
        ]);
    }

    let world_root = skeleton.world * pose_matrices[root];
    let translation = world_root.w_axis.truncate();
    Ok(ExtractedPose {
        rotations,
        root_position: [translation.x, translation.z, -translation.y],
    })
}

fn preorder(skeleton: &Skeleton, root: usize) -> Vec<usize> {
    fn visit(skeleton: &Skeleton, i: usize, out: &mut Vec<usize>) {
        out.push(i);
        for &child in &skeleton.bones[i].children {
            visit(skeleton, child, out);
        }
    }
    let mut out = Vec::with_capacity(skeleton.bones.len());
    visit(skeleton, root, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::{MotionDocument, ParseOptions, MOTION_HEADER};
    use crate::pose::{apply, distribute, ImportConvention};
    use rand::{Rng, SeedableRng};

    fn parse_header_frame(values: &str) -> MotionDocument {
        let text = format!("{MOTION_HEADER}Frames: 1\nFrame Time: 0.050000\n{values}\n");
        MotionDocument::parse(&text, &ParseOptions::default()).unwrap()
    }

    /// Distance of a wrapped `[0, 360)` angle from zero.
    fn dist_from_zero(angle: f32) -> f32 {
        angle.min(360.0 - angle)
    }

    fn posed_skeleton(values: &str) -> (MotionDocument, Skeleton) {
        let doc = parse_header_frame(values);
        let mut skeleton = Skeleton::from_document(&doc, "test").unwrap();
        let motion = distribute(&doc, ImportConvention::Procedural, 1.0);
        apply(&mut skeleton, &doc, &motion).unwrap();
        (doc, skeleton)
    }

    #[test]
    fn test_identity_pose_extracts_zero() {
        let (_, skeleton) = posed_skeleton(&vec!["0.0"; 69].join(" "));
        let extracted = extract(&skeleton, "Hips").unwrap();

        assert_eq!(extracted.rotations.len(), 22);
        for triple in &extracted.rotations {
            for &angle in triple {
                assert!(
                    dist_from_zero(angle) < 1e-3,
                    "expected zero rotation, got {angle}"
                );
            }
        }
        for &coord in &extracted.root_position {
            assert!(coord.abs() < 1e-6);
        }
    }

    #[test]
    fn test_world_rotation_lands_on_root_triple() {
        let (_, mut skeleton) = posed_skeleton(&vec!["0.0"; 69].join(" "));
        skeleton.world = Mat4::from_rotation_z(30f32.to_radians());
        let extracted = extract(&skeleton, "Hips").unwrap();

        let root = &extracted.rotations[0];
        assert!((root[0] - 30.0).abs() < 1e-3, "z should carry 30, got {}", root[0]);
        assert!(dist_from_zero(root[1]) < 1e-3 && dist_from_zero(root[2]) < 1e-3);

        // Every other bone stays at zero
        for triple in &extracted.rotations[1..] {
            for &angle in triple {
                assert!(dist_from_zero(angle) < 1e-3);
            }
        }
    }

    #[test]
    fn test_root_position_remap_cancels_rest_rotation() {
        let mut values = vec!["1.0", "2.0", "3.0"];
        values.extend(std::iter::repeat("0.0").take(66));
        let (_, skeleton) = posed_skeleton(&values.join(" "));
        let extracted = extract(&skeleton, "Hips").unwrap();

        // Procedural import stores the location as (2, 3, 1); the root rest
        // frame (Y onto Z) and the (x, z, -y) export remap map it back out
        // unchanged.
        let expected = [2.0, 3.0, 1.0];
        for (got, want) in extracted.root_position.iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "{got} vs {want}");
        }
    }

    #[test]
    fn test_unknown_root_is_an_error() {
        let (_, skeleton) = posed_skeleton(&vec!["0.0"; 69].join(" "));
        let err = extract(&skeleton, "Pelvis").unwrap_err();
        assert!(matches!(err, AnymError::BoneNotFound(_)), "got {err:?}");
    }

    #[test]
    fn test_extract_apply_round_trip() {
        // Random moderate joint angles, zero root translation
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut values = vec!["0.0".to_string(); 3];
        for _ in 0..66 {
            values.push(format!("{:.4}", rng.random_range(-60.0..60.0f32)));
        }
        let (_doc, skeleton) = posed_skeleton(&values.join(" "));
        let extracted = extract(&skeleton, "Hips").unwrap();

        // Pre-order matches the document's channel order, and every joint
        // rotates ZYX, so the triples feed straight back in as frame values.
        let mut round: Vec<String> = vec!["0.0".to_string(); 3];
        for triple in &extracted.rotations {
            for angle in triple {
                round.push(format!("{:.6}", angle));
            }
        }
        let round_doc = parse_header_frame(&round.join(" "));
        let mut round_skeleton = Skeleton::from_document(&round_doc, "round").unwrap();
        let motion = distribute(&round_doc, ImportConvention::Procedural, 1.0);
        apply(&mut round_skeleton, &round_doc, &motion).unwrap();

        let original = skeleton.pose_matrices();
        let reapplied = round_skeleton.pose_matrices();
        for ((a, b), bone) in original.iter().zip(&reapplied).zip(&skeleton.bones) {
            assert!(
                a.abs_diff_eq(*b, 2e-3),
                "pose matrix of '{}' drifted through the round trip:\n{a}\nvs\n{b}",
                bone.name
            );
        }
    }
}
