//! FK/IK control rig generation on top of the deform skeleton.
//!
//! The rig is pure data: control bones with head/tail placements and a list
//! of constraint bindings from deform bones to controls. Blend weights are
//! explicit [`Influence`] values resolved against per-control FK/IK switch
//! values; the host recomputes them whenever a switch moves.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec3;

use crate::bvh::HEADER_JOINT_COUNT;
use crate::error::{AnymError, Result};
use crate::skeleton::Skeleton;

/// Switch value a fresh IK end-effector control starts with (full IK).
pub const DEFAULT_SWITCH_VALUE: f32 = 1.0;

/// Limb IK solves over the two bones above the constrained one.
pub const IK_CHAIN_LENGTH: u8 = 2;

/// Distance of a pole control from its chain's middle joint.
const POLE_OFFSET_DISTANCE: f32 = 0.3;

/// What a control bone is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRole {
    /// Whole-character root control.
    Master,
    /// Switchable forward-kinematics limb control.
    Fk,
    /// IK end-effector target.
    Ik,
    /// IK pole-vector target.
    Pole,
    /// Always-on control (hips, torso, shoulders, head).
    Fixed,
}

/// Visual category of a control's widget; geometry is a host concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeCategory {
    Circle,
    Sphere,
    Box,
    Polygon,
}

/// One control bone.
#[derive(Debug, Clone)]
pub struct ControlBone {
    pub name: String,
    pub head: Vec3,
    pub tail: Vec3,
    /// Index of the parent control within the rig.
    pub parent: Option<usize>,
    pub role: ControlRole,
    /// Deform bone this control is placed on and drives, if any.
    pub deform: Option<String>,
    /// FK/IK switch value, present on IK end-effector controls only.
    pub switch: Option<f32>,
}

impl ControlBone {
    pub fn shape_category(&self) -> ShapeCategory {
        match self.role {
            ControlRole::Pole => ShapeCategory::Sphere,
            ControlRole::Ik => ShapeCategory::Box,
            ControlRole::Master => ShapeCategory::Polygon,
            ControlRole::Fk | ControlRole::Fixed => {
                if self.name.contains("Hips")
                    || self.name.contains("Shoulder")
                    || self.name.contains("Spine")
                {
                    ShapeCategory::Polygon
                } else {
                    ShapeCategory::Circle
                }
            }
        }
    }
}

/// Constraint flavor of a binding.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    CopyRotation,
    CopyLocation,
    IkChain {
        chain_length: u8,
        /// Pole-vector control name.
        pole: String,
        pole_angle: f32,
    },
}

/// Blend weight of a binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Influence {
    Fixed(f32),
    /// `1 - switch` of the named control; drives FK bindings.
    OneMinusSwitch(String),
    /// `switch` of the named control; drives IK bindings.
    Switch(String),
}

/// One constraint from a deform bone to a control.
#[derive(Debug, Clone)]
pub struct ConstraintBinding {
    pub deform: String,
    pub control: String,
    pub kind: ConstraintKind,
    pub influence: Influence,
}

/// The generated control layer.
#[derive(Debug, Clone)]
pub struct ControlRig {
    pub name: String,
    pub bones: Vec<ControlBone>,
    pub bindings: Vec<ConstraintBinding>,
}

/// Torso controls: (control, deform, parent, world offset).
const TORSO_CONTROLS: &[(&str, &str, &str, [f32; 3])] = &[
    ("Spine_fk_ctrl", "Spine", "Hips_ctrl", [0.0, 0.0, 0.0]),
    ("Spine1_fk_ctrl", "Spine1", "Spine_fk_ctrl", [0.0, 0.0, 0.0]),
    ("Spine2_fk_ctrl", "Spine2", "Spine1_fk_ctrl", [0.0, 0.0, 0.0]),
    ("Neck_fk_ctrl", "Neck", "Spine2_fk_ctrl", [0.0, 0.05, 0.0]),
    ("Head_fk_ctrl", "Head", "Neck_fk_ctrl", [0.0, 0.2, 0.05]),
    (
        "L_Shoulder_fk_ctrl",
        "LeftShoulder",
        "Spine2_fk_ctrl",
        [0.05, 0.05, 0.0],
    ),
    (
        "R_Shoulder_fk_ctrl",
        "RightShoulder",
        "Spine2_fk_ctrl",
        [-0.05, 0.05, 0.0],
    ),
];

/// Deform bones whose controls bind with constant full influence, in wiring
/// order.
const FIXED_BINDINGS: &[(&str, &str)] = &[
    ("Spine", "Spine_fk_ctrl"),
    ("Spine1", "Spine1_fk_ctrl"),
    ("Spine2", "Spine2_fk_ctrl"),
    ("LeftShoulder", "L_Shoulder_fk_ctrl"),
    ("RightShoulder", "R_Shoulder_fk_ctrl"),
    ("Neck", "Neck_fk_ctrl"),
    ("Head", "Head_fk_ctrl"),
];

struct LimbSpec {
    /// FK chain as (control, deform); the first three entries get switched
    /// FK bindings, a fourth (toe) stays unbound.
    fk: &'static [(&'static str, &'static str)],
    /// Parent of the first FK control.
    fk_parent: &'static str,
    ik_ctrl: &'static str,
    /// Deform bone the IK chain terminates on.
    ik_deform: &'static str,
    /// Y offset of the IK control's tail from its head.
    ik_lift: f32,
    pole_ctrl: &'static str,
    /// Middle joint the pole control is anchored to.
    pole_deform: &'static str,
    /// Chain joints (start, middle, end) spanning the pole placement.
    pole_chain: [&'static str; 3],
    /// Y extent of the pole control; sign matches the pre-placement drop.
    pole_drop: f32,
    /// Offset toward the middle joint (elbows) or away from it (knees).
    pole_toward_mid: bool,
    pole_angle: f32,
}

const LIMBS: &[LimbSpec] = &[
    LimbSpec {
        fk: &[
            ("L_Arm_fk_ctrl", "LeftArm"),
            ("L_Forearm_fk_ctrl", "LeftForearm"),
            ("L_Hand_fk_ctrl", "LeftHand"),
        ],
        fk_parent: "L_Shoulder_fk_ctrl",
        ik_ctrl: "L_Hand_ik_ctrl",
        ik_deform: "LeftHand",
        ik_lift: -0.5,
        pole_ctrl: "L_Elbow_pole_ctrl",
        pole_deform: "LeftForearm",
        pole_chain: ["LeftArm", "LeftForearm", "LeftHand"],
        pole_drop: 0.5,
        pole_toward_mid: true,
        pole_angle: -PI,
    },
    LimbSpec {
        fk: &[
            ("R_Arm_fk_ctrl", "RightArm"),
            ("R_Forearm_fk_ctrl", "RightForearm"),
            ("R_Hand_fk_ctrl", "RightHand"),
        ],
        fk_parent: "R_Shoulder_fk_ctrl",
        ik_ctrl: "R_Hand_ik_ctrl",
        ik_deform: "RightHand",
        ik_lift: -0.5,
        pole_ctrl: "R_Elbow_pole_ctrl",
        pole_deform: "RightForearm",
        pole_chain: ["RightArm", "RightForearm", "RightHand"],
        pole_drop: 0.5,
        pole_toward_mid: true,
        pole_angle: 0.0,
    },
    LimbSpec {
        fk: &[
            ("L_Hip_fk_ctrl", "LeftHip"),
            ("L_Knee_fk_ctrl", "LeftKnee"),
            ("L_Foot_fk_ctrl", "LeftFoot"),
            ("L_Toe_fk_ctrl", "LeftToe"),
        ],
        fk_parent: "Hips_ctrl",
        ik_ctrl: "L_Foot_ik_ctrl",
        ik_deform: "LeftFoot",
        ik_lift: 0.5,
        pole_ctrl: "L_Knee_pole_ctrl",
        pole_deform: "LeftKnee",
        pole_chain: ["LeftHip", "LeftKnee", "LeftToe"],
        pole_drop: -0.5,
        pole_toward_mid: false,
        pole_angle: -FRAC_PI_2,
    },
    LimbSpec {
        fk: &[
            ("R_Hip_fk_ctrl", "RightHip"),
            ("R_Knee_fk_ctrl", "RightKnee"),
            ("R_Foot_fk_ctrl", "RightFoot"),
            ("R_Toe_fk_ctrl", "RightToe"),
        ],
        fk_parent: "Hips_ctrl",
        ik_ctrl: "R_Foot_ik_ctrl",
        ik_deform: "RightFoot",
        ik_lift: 0.5,
        pole_ctrl: "R_Knee_pole_ctrl",
        pole_deform: "RightKnee",
        pole_chain: ["RightHip", "RightKnee", "RightToe"],
        pole_drop: -0.5,
        pole_toward_mid: false,
        pole_angle: -FRAC_PI_2,
    },
];

impl ControlRig {
    /// Generates the control layer for a skeleton following the 22-bone
    /// naming convention.
    pub fn generate(skeleton: &Skeleton) -> Result<ControlRig> {
        if skeleton.bones.len() != HEADER_JOINT_COUNT {
            return Err(AnymError::Validation(format!(
                "control rig generation needs the {}-bone skeleton, got {}",
                HEADER_JOINT_COUNT,
                skeleton.bones.len()
            )));
        }

        let mut bones: Vec<ControlBone> = Vec::new();

        push_control(
            &mut bones,
            "master_ctrl",
            Vec3::ZERO,
            Vec3::new(0.0, 0.5, 0.0),
            None,
            None,
            ControlRole::Master,
        )?;

        let (hips_head, hips_tail) = deform_span(skeleton, "Hips")?;
        push_control(
            &mut bones,
            "Hips_ctrl",
            hips_head,
            hips_tail,
            Some("master_ctrl"),
            Some("Hips"),
            ControlRole::Fixed,
        )?;

        for &(ctrl, deform, parent, offset) in TORSO_CONTROLS {
            let (head, tail) = deform_span(skeleton, deform)?;
            let offset = Vec3::from_array(offset);
            push_control(
                &mut bones,
                ctrl,
                head + offset,
                tail + offset,
                Some(parent),
                Some(deform),
                ControlRole::Fixed,
            )?;
        }

        for limb in LIMBS {
            let mut parent = limb.fk_parent;
            for &(ctrl, deform) in limb.fk {
                let (head, tail) = deform_span(skeleton, deform)?;
                push_control(
                    &mut bones,
                    ctrl,
                    head,
                    tail,
                    Some(parent),
                    Some(deform),
                    ControlRole::Fk,
                )?;
                parent = ctrl;
            }

            let (_, end_tail) = deform_span(skeleton, limb.ik_deform)?;
            push_control(
                &mut bones,
                limb.ik_ctrl,
                end_tail,
                end_tail + Vec3::new(0.0, limb.ik_lift, 0.0),
                Some("master_ctrl"),
                Some(limb.ik_deform),
                ControlRole::Ik,
            )?;
            if let Some(ik) = bones.last_mut() {
                ik.switch = Some(DEFAULT_SWITCH_VALUE);
            }

            let pole_head = pole_position(skeleton, limb)?;
            push_control(
                &mut bones,
                limb.pole_ctrl,
                pole_head,
                pole_head + Vec3::new(0.0, -limb.pole_drop, 0.0),
                Some("master_ctrl"),
                Some(limb.pole_deform),
                ControlRole::Pole,
            )?;
        }

        let mut bindings = Vec::new();
        bindings.push(ConstraintBinding {
            deform: "Hips".to_string(),
            control: "Hips_ctrl".to_string(),
            kind: ConstraintKind::CopyRotation,
            influence: Influence::Fixed(1.0),
        });
        bindings.push(ConstraintBinding {
            deform: "Hips".to_string(),
            control: "Hips_ctrl".to_string(),
            kind: ConstraintKind::CopyLocation,
            influence: Influence::Fixed(1.0),
        });
        for &(deform, ctrl) in FIXED_BINDINGS {
            bindings.push(ConstraintBinding {
                deform: deform.to_string(),
                control: ctrl.to_string(),
                kind: ConstraintKind::CopyRotation,
                influence: Influence::Fixed(1.0),
            });
        }

        for limb in LIMBS {
            // FK copies fade out as the switch moves toward IK
            for &(ctrl, deform) in &limb.fk[..3] {
                bindings.push(ConstraintBinding {
                    deform: deform.to_string(),
                    control: ctrl.to_string(),
                    kind: ConstraintKind::CopyRotation,
                    influence: Influence::OneMinusSwitch(limb.ik_ctrl.to_string()),
                });
            }
            bindings.push(ConstraintBinding {
                deform: limb.ik_deform.to_string(),
                control: limb.ik_ctrl.to_string(),
                kind: ConstraintKind::IkChain {
                    chain_length: IK_CHAIN_LENGTH,
                    pole: limb.pole_ctrl.to_string(),
                    pole_angle: limb.pole_angle,
                },
                influence: Influence::Switch(limb.ik_ctrl.to_string()),
            });
            bindings.push(ConstraintBinding {
                deform: limb.ik_deform.to_string(),
                control: limb.ik_ctrl.to_string(),
                kind: ConstraintKind::CopyRotation,
                influence: Influence::Switch(limb.ik_ctrl.to_string()),
            });
        }

        log::info!(
            "generated control rig: {} controls, {} bindings",
            bones.len(),
            bindings.len()
        );

        Ok(ControlRig {
            name: format!("{}_control", skeleton.name),
            bones,
            bindings,
        })
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn control(&self, name: &str) -> Option<&ControlBone> {
        self.index_of(name).map(|i| &self.bones[i])
    }

    /// Switch value of a control, defaulting to full IK when unset.
    pub fn switch_value(&self, control: &str) -> f32 {
        self.control(control)
            .and_then(|b| b.switch)
            .unwrap_or(DEFAULT_SWITCH_VALUE)
    }

    pub fn set_switch(&mut self, control: &str, value: f32) -> Result<()> {
        let idx = self
            .index_of(control)
            .ok_or_else(|| AnymError::BoneNotFound(control.to_string()))?;
        self.bones[idx].switch = Some(value.clamp(0.0, 1.0));
        Ok(())
    }

    /// Resolves an influence against the current switch values.
    pub fn influence_weight(&self, influence: &Influence) -> f32 {
        match influence {
            Influence::Fixed(weight) => *weight,
            Influence::OneMinusSwitch(control) => 1.0 - self.switch_value(control),
            Influence::Switch(control) => self.switch_value(control),
        }
    }
}

/// Generates the rig and stores it on the skeleton, replacing any previous
/// one so repeated attachment never duplicates controls or bindings.
pub fn attach(skeleton: &mut Skeleton) -> Result<()> {
    if let Some(old) = skeleton.control_rig.take() {
        log::info!("replacing existing control rig '{}'", old.name);
    }
    let rig = ControlRig::generate(skeleton)?;
    skeleton.control_rig = Some(rig);
    Ok(())
}

fn deform_span(skeleton: &Skeleton, name: &str) -> Result<(Vec3, Vec3)> {
    skeleton
        .bone(name)
        .map(|b| (b.head, b.tail))
        .ok_or_else(|| AnymError::BoneNotFound(name.to_string()))
}

/// Pole controls sit on the chain's middle joint, pushed along the
/// normalized midpoint-to-middle-joint direction (toward it for elbows, away
/// for knees).
fn pole_position(skeleton: &Skeleton, limb: &LimbSpec) -> Result<Vec3> {
    let (start, _) = deform_span(skeleton, limb.pole_chain[0])?;
    let (mid, _) = deform_span(skeleton, limb.pole_chain[1])?;
    let (end, _) = deform_span(skeleton, limb.pole_chain[2])?;
    let (anchor, _) = deform_span(skeleton, limb.pole_deform)?;

    let midpoint = start + (end - start) / 2.0;
    let mut direction = (mid - midpoint).normalize_or_zero();
    if !limb.pole_toward_mid {
        direction = -direction;
    }

    Ok(anchor + direction * POLE_OFFSET_DISTANCE)
}

fn push_control(
    bones: &mut Vec<ControlBone>,
    name: &str,
    head: Vec3,
    tail: Vec3,
    parent: Option<&str>,
    deform: Option<&str>,
    role: ControlRole,
) -> Result<()> {
    let parent = match parent {
        Some(p) => Some(bones.iter().position(|b| b.name == p).ok_or_else(|| {
            AnymError::Validation(format!("control parent '{p}' is not declared"))
        })?),
        None => None,
    };
    bones.push(ControlBone {
        name: name.to_string(),
        head,
        tail,
        parent,
        role,
        deform: deform.map(str::to_string),
        switch: None,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::{MotionDocument, ParseOptions, MOTION_HEADER};

    fn header_skeleton() -> Skeleton {
        let text = format!(
            "{MOTION_HEADER}Frames: 1\nFrame Time: 0.050000\n{}\n",
            vec!["0.0"; 69].join(" ")
        );
        let doc = MotionDocument::parse(&text, &ParseOptions::default()).unwrap();
        Skeleton::from_document(&doc, "anym").unwrap()
    }

    #[test]
    fn test_control_and_binding_counts() {
        let skeleton = header_skeleton();
        let rig = ControlRig::generate(&skeleton).unwrap();
        // master + hips + 7 torso + 2 arms of 5 + 2 legs of 6
        assert_eq!(rig.bones.len(), 31);
        // hips (rot + loc) + 7 torso + 4 limbs of (3 fk + ik + end rot)
        assert_eq!(rig.bindings.len(), 29);
        assert_eq!(rig.name, "anym_control");
    }

    #[test]
    fn test_wrong_bone_count_is_rejected() {
        let text = "HIERARCHY\nROOT A\n{\n\tOFFSET 0 0 0\n\tCHANNELS 3 Zrotation Yrotation Xrotation\n\tEnd Site\n\t{\n\t\tOFFSET 0 1 0\n\t}\n}\nMOTION\nFrames: 1\nFrame Time: 0.05\n0 0 0\n";
        let doc = MotionDocument::parse(text, &ParseOptions::default()).unwrap();
        let skeleton = Skeleton::from_document(&doc, "tiny").unwrap();
        let err = ControlRig::generate(&skeleton).unwrap_err();
        assert!(matches!(err, AnymError::Validation(_)), "got {err:?}");
    }

    #[test]
    fn test_master_control_at_origin() {
        let rig = ControlRig::generate(&header_skeleton()).unwrap();
        let master = rig.control("master_ctrl").unwrap();
        assert_eq!(master.head, Vec3::ZERO);
        assert_eq!(master.tail, Vec3::new(0.0, 0.5, 0.0));
        assert!(master.parent.is_none());
        assert_eq!(master.role, ControlRole::Master);
    }

    #[test]
    fn test_ik_controls_carry_switch_defaults() {
        let rig = ControlRig::generate(&header_skeleton()).unwrap();
        for name in [
            "L_Hand_ik_ctrl",
            "R_Hand_ik_ctrl",
            "L_Foot_ik_ctrl",
            "R_Foot_ik_ctrl",
        ] {
            let ctrl = rig.control(name).unwrap();
            assert_eq!(ctrl.switch, Some(DEFAULT_SWITCH_VALUE), "{name}");
            assert_eq!(ctrl.role, ControlRole::Ik);
        }
        // Nothing else carries a switch
        let with_switch = rig.bones.iter().filter(|b| b.switch.is_some()).count();
        assert_eq!(with_switch, 4);
    }

    #[test]
    fn test_fk_bindings_precede_the_ik_binding() {
        let rig = ControlRig::generate(&header_skeleton()).unwrap();
        let fk_pos = rig
            .bindings
            .iter()
            .position(|b| b.deform == "LeftArm")
            .unwrap();
        let ik_pos = rig
            .bindings
            .iter()
            .position(|b| matches!(b.kind, ConstraintKind::IkChain { .. }) && b.deform == "LeftHand")
            .unwrap();
        assert!(fk_pos < ik_pos);
    }

    #[test]
    fn test_pole_angles_per_limb() {
        let rig = ControlRig::generate(&header_skeleton()).unwrap();
        let mut angles = std::collections::HashMap::new();
        for binding in &rig.bindings {
            if let ConstraintKind::IkChain {
                chain_length,
                pole_angle,
                ..
            } = &binding.kind
            {
                assert_eq!(*chain_length, IK_CHAIN_LENGTH);
                angles.insert(binding.deform.clone(), *pole_angle);
            }
        }
        assert_eq!(angles["LeftHand"], -PI);
        assert_eq!(angles["RightHand"], 0.0);
        assert_eq!(angles["LeftFoot"], -FRAC_PI_2);
        assert_eq!(angles["RightFoot"], -FRAC_PI_2);
    }

    #[test]
    fn test_pole_control_placement() {
        let skeleton = header_skeleton();
        let rig = ControlRig::generate(&skeleton).unwrap();

        let arm = skeleton.bone("LeftArm").unwrap().head;
        let forearm = skeleton.bone("LeftForearm").unwrap().head;
        let hand = skeleton.bone("LeftHand").unwrap().head;
        let midpoint = arm + (hand - arm) / 2.0;
        let expected = forearm + (forearm - midpoint).normalize() * 0.3;

        let pole = rig.control("L_Elbow_pole_ctrl").unwrap();
        assert!(
            (pole.head - expected).length() < 1e-5,
            "{:?} vs {:?}",
            pole.head,
            expected
        );
        assert!(((pole.head - forearm).length() - 0.3).abs() < 1e-5);
        assert_eq!(pole.role, ControlRole::Pole);
    }

    #[test]
    fn test_influence_weights_follow_the_switch() {
        let mut rig = ControlRig::generate(&header_skeleton()).unwrap();
        let fk = Influence::OneMinusSwitch("L_Hand_ik_ctrl".to_string());
        let ik = Influence::Switch("L_Hand_ik_ctrl".to_string());

        assert_eq!(rig.influence_weight(&fk), 0.0);
        assert_eq!(rig.influence_weight(&ik), 1.0);

        rig.set_switch("L_Hand_ik_ctrl", 0.25).unwrap();
        assert!((rig.influence_weight(&fk) - 0.75).abs() < 1e-6);
        assert!((rig.influence_weight(&ik) - 0.25).abs() < 1e-6);

        // Values outside [0, 1] clamp
        rig.set_switch("L_Hand_ik_ctrl", 7.0).unwrap();
        assert_eq!(rig.influence_weight(&ik), 1.0);
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut skeleton = header_skeleton();
        attach(&mut skeleton).unwrap();
        let first = skeleton.control_rig.as_ref().unwrap();
        let (bones, bindings) = (first.bones.len(), first.bindings.len());

        attach(&mut skeleton).unwrap();
        let second = skeleton.control_rig.as_ref().unwrap();
        assert_eq!(second.bones.len(), bones);
        assert_eq!(second.bindings.len(), bindings);
    }

    #[test]
    fn test_shape_categories() {
        let rig = ControlRig::generate(&header_skeleton()).unwrap();
        let category = |name: &str| rig.control(name).unwrap().shape_category();

        assert_eq!(category("master_ctrl"), ShapeCategory::Polygon);
        assert_eq!(category("Hips_ctrl"), ShapeCategory::Polygon);
        assert_eq!(category("L_Shoulder_fk_ctrl"), ShapeCategory::Polygon);
        assert_eq!(category("L_Elbow_pole_ctrl"), ShapeCategory::Sphere);
        assert_eq!(category("R_Foot_ik_ctrl"), ShapeCategory::Box);
        assert_eq!(category("L_Arm_fk_ctrl"), ShapeCategory::Circle);
        assert_eq!(category("Head_fk_ctrl"), ShapeCategory::Circle);
    }
}
