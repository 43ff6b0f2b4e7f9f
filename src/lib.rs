//! Anym Rig - Pose Import & Retargeting Core
//!
//! Single-frame motion document parsing, skeleton construction, pose
//! application/extraction, FK/IK control rig generation and the payload layer
//! for the Anym animation-generation service.
//!
//! Typical flow: import a built-in pose with [`poses::import_builtin`], pose
//! or keyframe it host-side, build a request with [`api::build_request`] and
//! send it through [`api::Client`]; fetch the finished animation back and
//! re-import it with [`poses::import_pose`].

pub mod api;
pub mod bvh;
pub mod error;
pub mod math;
pub mod pose;
pub mod poses;
pub mod retarget;
pub mod rig;
pub mod skeleton;

pub use api::{build_request, AnimationRequest, Client, PoseSource, RequestSettings, StaticPose};
pub use bvh::{MotionDocument, ParseOptions};
pub use error::{AnymError, Result};
pub use glam::Vec3;
pub use math::RotationOrder;
pub use pose::ImportConvention;
pub use poses::{import_builtin, import_pose, BuiltinPose, ImportOptions};
pub use retarget::{extract, ExtractedPose};
pub use rig::ControlRig;
pub use skeleton::{Bone, Skeleton};

/// Tolerance used by geometric comparisons in tests.
pub const EPSILON: f32 = 1e-4;
