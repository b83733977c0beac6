//! Builders for 4x4 homogeneous transforms.
//!
//! All matrices use the column-vector convention: a point is transformed as
//! `p' = M * p`, translation lives in the last column and `A * B` applies `B`
//! first. This matches glam and WGSL, so matrices go to the GPU unmodified.

use glam::{Mat4, Vec3};

pub fn identity() -> Mat4 {
    Mat4::IDENTITY
}

pub fn translate(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(x, y, z))
}

pub fn scale(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::from_scale(Vec3::new(x, y, z))
}

/// Rotates about X, then about Y, then about Z. Angles in radians.
///
/// With column vectors that is `Rz * Ry * Rx`. The order is fixed; callers
/// rely on it.
pub fn rotate(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::from_rotation_z(z) * Mat4::from_rotation_y(y) * Mat4::from_rotation_x(x)
}

pub fn rotate_degrees(x: f32, y: f32, z: f32) -> Mat4 {
    rotate(x.to_radians(), y.to_radians(), z.to_radians())
}

pub fn transform_point(matrix: &Mat4, point: Vec3) -> Vec3 {
    matrix.transform_point3(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn zero_rotation_is_identity() {
        assert_eq!(rotate(0.0, 0.0, 0.0), identity());
    }

    #[test]
    fn translate_moves_origin() {
        let moved = transform_point(&translate(1.5, -2.0, 3.25), Vec3::ZERO);
        assert!(moved.abs_diff_eq(Vec3::new(1.5, -2.0, 3.25), EPSILON));
    }

    #[test]
    fn translation_lives_in_last_column() {
        let matrix = translate(4.0, 5.0, 6.0);
        assert_eq!(matrix.w_axis.truncate(), Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(matrix.row(3), glam::Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn scale_is_diagonal() {
        let matrix = scale(2.0, 3.0, 4.0);
        assert_eq!(
            matrix.to_cols_array(),
            [
                2.0, 0.0, 0.0, 0.0, //
                0.0, 3.0, 0.0, 0.0, //
                0.0, 0.0, 4.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ]
        );
    }

    #[test]
    fn rotate_about_x_turns_y_into_z() {
        let rotated = transform_point(&rotate(FRAC_PI_2, 0.0, 0.0), Vec3::Y);
        assert!(rotated.abs_diff_eq(Vec3::Z, EPSILON));
    }

    #[test]
    fn rotation_applies_x_first() {
        // X turns +X into itself, then Y turns it into -Z.
        let one_call = transform_point(&rotate(FRAC_PI_2, FRAC_PI_2, 0.0), Vec3::X);
        let about_x = transform_point(&rotate(FRAC_PI_2, 0.0, 0.0), Vec3::X);
        let then_y = transform_point(&rotate(0.0, FRAC_PI_2, 0.0), about_x);

        assert!(one_call.abs_diff_eq(then_y, EPSILON));
        assert!(one_call.abs_diff_eq(-Vec3::Z, EPSILON));
    }

    #[test]
    fn rotation_matches_one_axis_at_a_time() {
        let (x, y, z) = (0.3, -1.1, 0.7);
        let point = Vec3::new(0.2, -0.5, 1.3);

        let mut stepwise = point;
        for step in [rotate(x, 0.0, 0.0), rotate(0.0, y, 0.0), rotate(0.0, 0.0, z)] {
            stepwise = transform_point(&step, stepwise);
        }

        assert!(transform_point(&rotate(x, y, z), point).abs_diff_eq(stepwise, EPSILON));
    }

    #[test]
    fn degrees_match_radians() {
        assert!(rotate_degrees(90.0, 45.0, -30.0).abs_diff_eq(
            rotate(FRAC_PI_2, 45f32.to_radians(), -30f32.to_radians()),
            EPSILON
        ));
    }
}
