//! Rotation-order math shared by the parser, the pose applier and the export
//! path.
//!
//! The motion format names a per-joint Euler order (e.g. `ZYX`) but always
//! stores the three angle components as x/y/z; the named order only decides
//! application order, with the first-named axis applied innermost. glam's
//! `EulerRot` composes outermost-first, so the conversion helpers here own the
//! order reversal instead of scattering it through the callers.

use glam::{EulerRot, Quat};

/// One of the six valid Euler axis permutations.
///
/// Joints without rotation channels default to [`RotationOrder::Xyz`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOrder {
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

/// A single rotation axis, used to spell out composition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl RotationOrder {
    /// Order assumed for joints that declare no rotation channels.
    pub const DEFAULT: RotationOrder = RotationOrder::Xyz;

    /// Resolves the axis indices collected from a joint's rotation channels
    /// (0 = X, 1 = Y, 2 = Z, in declaration order). A joint with no rotation
    /// channels resolves to the default; anything that is not one of the six
    /// permutations is rejected.
    pub fn from_axis_indices(axes: [Option<u8>; 3]) -> Option<RotationOrder> {
        match axes {
            [None, None, None] => Some(RotationOrder::DEFAULT),
            [Some(0), Some(1), Some(2)] => Some(RotationOrder::Xyz),
            [Some(0), Some(2), Some(1)] => Some(RotationOrder::Xzy),
            [Some(1), Some(0), Some(2)] => Some(RotationOrder::Yxz),
            [Some(1), Some(2), Some(0)] => Some(RotationOrder::Yzx),
            [Some(2), Some(0), Some(1)] => Some(RotationOrder::Zxy),
            [Some(2), Some(1), Some(0)] => Some(RotationOrder::Zyx),
            _ => None,
        }
    }

    /// The axes in named order, first entry applied innermost.
    pub fn axes(self) -> [Axis; 3] {
        match self {
            RotationOrder::Xyz => [Axis::X, Axis::Y, Axis::Z],
            RotationOrder::Xzy => [Axis::X, Axis::Z, Axis::Y],
            RotationOrder::Yxz => [Axis::Y, Axis::X, Axis::Z],
            RotationOrder::Yzx => [Axis::Y, Axis::Z, Axis::X],
            RotationOrder::Zxy => [Axis::Z, Axis::X, Axis::Y],
            RotationOrder::Zyx => [Axis::Z, Axis::Y, Axis::X],
        }
    }

    /// The mirrored permutation. The pose applier feeds a joint's declared
    /// order through this before composing, so a `ZYX` joint ends up
    /// composing `Rz * Ry * Rx`.
    pub fn reversed(self) -> RotationOrder {
        match self {
            RotationOrder::Xyz => RotationOrder::Zyx,
            RotationOrder::Xzy => RotationOrder::Yzx,
            RotationOrder::Yxz => RotationOrder::Zxy,
            RotationOrder::Yzx => RotationOrder::Xzy,
            RotationOrder::Zxy => RotationOrder::Yxz,
            RotationOrder::Zyx => RotationOrder::Xyz,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RotationOrder::Xyz => "XYZ",
            RotationOrder::Xzy => "XZY",
            RotationOrder::Yxz => "YXZ",
            RotationOrder::Yzx => "YZX",
            RotationOrder::Zxy => "ZXY",
            RotationOrder::Zyx => "ZYX",
        }
    }
}

fn axis_quat(axis: Axis, angles: (f32, f32, f32)) -> Quat {
    match axis {
        Axis::X => Quat::from_rotation_x(angles.0),
        Axis::Y => Quat::from_rotation_y(angles.1),
        Axis::Z => Quat::from_rotation_z(angles.2),
    }
}

/// Composes a quaternion from x/y/z angle components (radians) with the named
/// order, first-named axis innermost.
pub fn quat_from_ordered_euler(order: RotationOrder, x: f32, y: f32, z: f32) -> Quat {
    let [a, b, c] = order.axes();
    let angles = (x, y, z);
    axis_quat(c, angles) * axis_quat(b, angles) * axis_quat(a, angles)
}

/// Decomposes a rotation into x/y/z angle components (radians) under the
/// `XYZ` order (X innermost), the convention the export path emits.
pub fn xyz_euler_from_quat(q: Quat) -> (f32, f32, f32) {
    // X innermost factors the quaternion as Qz * Qy * Qx, glam's intrinsic ZYX.
    let (z, y, x) = q.to_euler(EulerRot::ZYX);
    (x, y, z)
}

/// Wraps an angle in degrees into `[0, 360)`.
pub fn wrap_degrees(deg: f32) -> f32 {
    deg.rem_euclid(360.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_order_lookup_covers_all_permutations() {
        let cases = [
            ([Some(0), Some(1), Some(2)], RotationOrder::Xyz),
            ([Some(0), Some(2), Some(1)], RotationOrder::Xzy),
            ([Some(1), Some(0), Some(2)], RotationOrder::Yxz),
            ([Some(1), Some(2), Some(0)], RotationOrder::Yzx),
            ([Some(2), Some(0), Some(1)], RotationOrder::Zxy),
            ([Some(2), Some(1), Some(0)], RotationOrder::Zyx),
        ];
        for (axes, expected) in cases {
            assert_eq!(
                RotationOrder::from_axis_indices(axes),
                Some(expected),
                "axes {:?} should resolve to {:?}",
                axes,
                expected
            );
        }
    }

    #[test]
    fn test_no_rotation_channels_defaults_to_xyz() {
        assert_eq!(
            RotationOrder::from_axis_indices([None, None, None]),
            Some(RotationOrder::Xyz)
        );
    }

    #[test]
    fn test_invalid_permutations_rejected() {
        // Repeated axis, partial declaration, out-of-range index
        assert_eq!(
            RotationOrder::from_axis_indices([Some(2), Some(2), Some(0)]),
            None
        );
        assert_eq!(
            RotationOrder::from_axis_indices([Some(0), None, Some(2)]),
            None
        );
        assert_eq!(
            RotationOrder::from_axis_indices([Some(3), Some(1), Some(0)]),
            None
        );
    }

    #[test]
    fn test_reversed_is_involutive() {
        for order in [
            RotationOrder::Xyz,
            RotationOrder::Xzy,
            RotationOrder::Yxz,
            RotationOrder::Yzx,
            RotationOrder::Zxy,
            RotationOrder::Zyx,
        ] {
            assert_eq!(order.reversed().reversed(), order);
        }
    }

    #[test]
    fn test_ordered_euler_composition() {
        // ZYX with Z innermost: q = Qx * Qy * Qz
        let (x, y, z) = (0.3_f32, -0.7, 1.1);
        let q = quat_from_ordered_euler(RotationOrder::Zyx, x, y, z);
        let expected =
            Quat::from_rotation_x(x) * Quat::from_rotation_y(y) * Quat::from_rotation_z(z);
        assert!(
            q.abs_diff_eq(expected, 1e-6),
            "ZYX composition mismatch: {:?} vs {:?}",
            q,
            expected
        );
    }

    #[test]
    fn test_xyz_euler_round_trip() {
        let (x, y, z) = (0.4_f32, 0.9, -1.2);
        let q = quat_from_ordered_euler(RotationOrder::Xyz, x, y, z);
        let (rx, ry, rz) = xyz_euler_from_quat(q);
        assert!((rx - x).abs() < 1e-5, "x: {} vs {}", rx, x);
        assert!((ry - y).abs() < 1e-5, "y: {} vs {}", ry, y);
        assert!((rz - z).abs() < 1e-5, "z: {} vs {}", rz, z);
    }

    #[test]
    fn test_single_axis_sanity() {
        // 90 degrees about X maps Y onto Z regardless of order
        let q = quat_from_ordered_euler(RotationOrder::Zyx, std::f32::consts::FRAC_PI_2, 0.0, 0.0);
        let rotated = q * Vec3::Y;
        assert!(
            (rotated.z - 1.0).abs() < 1e-5,
            "Y should rotate onto Z, got {:?}",
            rotated
        );
    }

    #[test]
    fn test_wrap_degrees() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert!((wrap_degrees(-90.0) - 270.0).abs() < 1e-6);
        assert!((wrap_degrees(725.0) - 5.0).abs() < 1e-4);
    }
}
