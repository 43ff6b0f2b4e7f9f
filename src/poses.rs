//! Built-in single-frame poses and the one-call import flow.

use crate::bvh::{MotionDocument, ParseOptions, MOTION_HEADER};
use crate::error::Result;
use crate::pose::{apply, distribute, ImportConvention};
use crate::rig;
use crate::skeleton::Skeleton;

/// Frame declaration appended between [`MOTION_HEADER`] and the value line.
pub const FRAME_DECLARATION: &str = "Frames: 1\nFrame Time: 0.050000\n";

const TPOSE: &str = "0.0 0.0 0.91 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0";

const STANDING: &str = "0.0 0.0 0.915556 -2.686633 -2.507240 -3.725996 8.863924 -0.977226 1.382313 0.000000 0.113183 10.036398 2.418233 -4.287297 -4.288259 0.000000 0.000000 -0.000001 0.968358 5.593504 0.122170 0.435359 -0.016123 8.599061 -5.051244 -1.822243 -5.085787 0.000000 0.000000 -0.000001 0.807181 4.508004 -1.114769 -3.923263 -1.782650 11.946513 -2.286621 0.419885 -1.593431 5.200063 -3.178905 -5.355329 -1.712830 1.747785 16.304016 -1.668256 9.644320 4.197483 -3.659436 71.470565 5.343645 -32.365001 -8.193753 17.004270 -8.932759 7.274603 17.997885 4.799549 -14.141005 0.980003 14.342044 -67.479631 0.540239 24.710453 10.176975 12.695284 5.134529 -5.652613 22.329369\n";

const WALKING: &str = "0.0 0.0 0.869634 -5.156413 -1.214391 -5.410411 -1.709857 2.046793 -20.518447 -0.194409 2.821928 9.639633 22.674375 2.022817 7.065949 0.319114 -0.242817 -0.046777 -0.485952 -0.883780 21.276853 12.540215 -1.923606 17.813456 -12.848437 -5.769769 -8.659176 -0.403757 0.317752 -0.080174 4.731687 0.752432 14.091849 -1.918952 0.502233 1.095741 1.762074 0.605030 1.362915 -1.460636 4.213001 -19.982780 -0.953491 -5.442693 5.160420 5.932315 5.130612 1.747537 18.007731 72.350556 25.328865 -31.373172 -5.726233 -2.154197 2.176981 19.996316 -18.105757 1.457258 -5.002118 -1.150550 23.709883 -64.830696 -12.471515 41.735666 7.170822 -5.860969 -0.917491 -16.211826 -11.683631\n";

const RUNNING: &str = "0.0 0.0 0.944308 12.812485 -3.764145 -3.449099 6.162934 -2.591651 21.884037 -16.779459 5.769927 1.611377 12.924832 2.332486 2.128104 0.000000 0.000000 -0.000001 2.281804 7.332328 -16.747847 -10.971671 -0.227808 8.013506 -23.763674 -7.757531 -2.377268 0.000000 0.000000 -0.000001 -10.430504 6.608937 6.446684 -10.014379 -4.599386 6.985147 -10.106457 -0.428153 2.249650 8.424983 -2.053782 -10.427315 2.427841 1.754064 0.686918 -6.744412 -1.306699 4.014442 -37.160491 65.066568 -17.400981 -107.616498 0.533386 23.300145 -20.239555 -7.541115 -2.493251 -8.147590 2.082604 4.206349 -35.837155 -62.851323 58.385568 113.784891 1.138298 20.943669 23.422029 -4.067571 -27.872150\n";

const CROUCHED: &str = "0.0 0.0 0.792000 -7.587353 -3.244431 -5.244226 10.449458 -2.692427 1.237742 8.725213 8.053955 59.866197 28.034230 4.273684 -27.513477 -0.000001 -0.000000 0.000000 -12.310561 4.514536 -49.888928 -24.246104 5.546499 49.671887 -30.678573 9.327886 5.286487 0.000001 0.000000 0.000000 -8.409343 1.527181 46.302820 -4.850420 0.085146 10.987337 -3.818213 -0.937031 2.779952 15.485148 4.624125 9.982532 6.171311 -0.166689 -33.296183 -22.539460 -6.687543 -7.196572 -42.859961 27.952473 -40.464302 -95.768290 -24.000663 9.008869 -17.402181 -4.216924 19.540276 20.828827 7.671515 -3.644733 22.885188 -70.705963 -26.571569 73.503613 7.590814 9.765324 12.214401 -0.851391 0.037118\n";

const FIGHTING: &str = "0.0 0.0 0.929197 1.998556 0.365758 -2.714235 11.078149 -15.233524 -13.417147 15.345969 0.333671 13.138032 12.556353 10.035754 18.094387 0.000000 0.000000 -0.000001 -7.943415 11.946518 7.718570 -9.117149 -5.011846 5.266846 -16.635733 -4.257653 0.560239 0.000000 0.000000 -0.000001 0.645713 -0.742055 11.902913 3.841259 2.161500 -1.203929 0.955819 0.166722 -0.892026 12.257349 -0.606808 2.459871 15.515777 3.088477 13.207125 -10.436967 -19.768036 -9.090913 -52.863180 56.077539 -40.028783 -112.513607 -29.267658 25.987605 -6.362055 -16.723496 -3.005818 13.895320 20.171606 -7.156372 83.480282 -55.718614 -57.387083 110.505613 0.414810 22.901932 13.447608 21.708462 -25.038953\n";

/// The six built-in poses shipped with the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinPose {
    TPose,
    Standing,
    Walking,
    Running,
    Crouched,
    Fighting,
}

impl BuiltinPose {
    pub const ALL: [BuiltinPose; 6] = [
        BuiltinPose::TPose,
        BuiltinPose::Standing,
        BuiltinPose::Walking,
        BuiltinPose::Running,
        BuiltinPose::Crouched,
        BuiltinPose::Fighting,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BuiltinPose::TPose => "T-Pose",
            BuiltinPose::Standing => "Standing",
            BuiltinPose::Walking => "Walking",
            BuiltinPose::Running => "Running",
            BuiltinPose::Crouched => "Crouched",
            BuiltinPose::Fighting => "Fighting",
        }
    }

    /// The frame value line of this pose.
    pub fn motion_values(self) -> &'static str {
        match self {
            BuiltinPose::TPose => TPOSE,
            BuiltinPose::Standing => STANDING,
            BuiltinPose::Walking => WALKING,
            BuiltinPose::Running => RUNNING,
            BuiltinPose::Crouched => CROUCHED,
            BuiltinPose::Fighting => FIGHTING,
        }
    }
}

/// Knobs for [`import_pose`].
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub scale: f32,
    pub convention: ImportConvention,
    /// Generate and attach the FK/IK control rig after posing.
    pub with_control_rig: bool,
    pub strict_frame_values: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            scale: 1.0,
            convention: ImportConvention::Procedural,
            with_control_rig: true,
            strict_frame_values: false,
        }
    }
}

/// Builds a posed skeleton from a motion value line: concatenates the fixed
/// header with the frame declaration and values, parses, builds the skeleton,
/// distributes and applies the frame, and optionally attaches the control
/// rig.
pub fn import_pose(motion_values: &str, name: &str, options: &ImportOptions) -> Result<Skeleton> {
    let text = format!("{MOTION_HEADER}{FRAME_DECLARATION}{motion_values}");
    let parse_options = ParseOptions {
        scale: options.scale,
        strict_frame_values: options.strict_frame_values,
    };
    let doc = MotionDocument::parse(&text, &parse_options)?;

    let mut skeleton = Skeleton::from_document(&doc, name)?;
    let motion = distribute(&doc, options.convention, options.scale);
    apply(&mut skeleton, &doc, &motion)?;

    if options.with_control_rig {
        rig::attach(&mut skeleton)?;
    }

    log::info!("imported pose '{}' ({} bones)", name, skeleton.bones.len());
    Ok(skeleton)
}

/// [`import_pose`] for one of the shipped poses.
pub fn import_builtin(pose: BuiltinPose, options: &ImportOptions) -> Result<Skeleton> {
    import_pose(pose.motion_values(), pose.label(), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn test_every_builtin_pose_imports() {
        for pose in BuiltinPose::ALL {
            let skeleton = import_builtin(pose, &ImportOptions::default()).unwrap();
            assert_eq!(skeleton.bones.len(), 22, "{}", pose.label());
            assert!(skeleton.control_rig.is_some(), "{}", pose.label());
        }
    }

    #[test]
    fn test_builtin_value_lines_are_complete() {
        for pose in BuiltinPose::ALL {
            assert_eq!(
                pose.motion_values().split_whitespace().count(),
                69,
                "{} should carry 3 root position + 22 * 3 rotation values",
                pose.label()
            );
        }
    }

    #[test]
    fn test_t_pose_only_lifts_the_root() {
        let options = ImportOptions {
            with_control_rig: false,
            ..ImportOptions::default()
        };
        let skeleton = import_builtin(BuiltinPose::TPose, &options).unwrap();

        // Zposition 0.91 lands on y under the procedural convention
        let root = &skeleton.bones[skeleton.root];
        assert!((root.pose_location - Vec3::new(0.0, 0.91, 0.0)).length() < 1e-6);
        for bone in &skeleton.bones {
            assert!(
                bone.pose_rotation.abs_diff_eq(Quat::IDENTITY, 1e-6),
                "T-pose should not rotate '{}'",
                bone.name
            );
        }
        assert!(skeleton.control_rig.is_none());
    }

    #[test]
    fn test_scale_factor_shrinks_the_skeleton() {
        let options = ImportOptions {
            scale: 0.5,
            with_control_rig: false,
            ..ImportOptions::default()
        };
        let skeleton = import_builtin(BuiltinPose::Standing, &options).unwrap();
        let hip = skeleton.bone("LeftHip").unwrap();
        assert!((hip.head.x - 0.080781 * 0.5).abs() < 1e-6);

        // Root position channels pick up the same factor
        let root = &skeleton.bones[skeleton.root];
        assert!((root.pose_location.y - 0.915556 * 0.5).abs() < 1e-6);
    }
}
