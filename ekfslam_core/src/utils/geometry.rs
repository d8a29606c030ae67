// ekfslam_core/src/utils/geometry.rs

use nalgebra::{Matrix2, Rotation2, Vector2};
use num_traits::{Float, FloatConst};

/// Wraps an angle into the half-open interval `(-π, π]`.
///
/// `-π` maps to `π`, so two headings that describe the same direction always
/// compare equal after wrapping.
pub fn wrap_to_pi<T: Float + FloatConst>(angle: T) -> T {
    let pi = T::PI();
    let two_pi = pi + pi;
    let mut r = (pi - angle) % two_pi;
    if r < T::zero() {
        r = r + two_pi;
    }
    pi - r
}

/// Counter-clockwise 2D rotation by `theta` radians.
pub fn rotation_matrix_2d(theta: f64) -> Matrix2<f64> {
    Rotation2::new(theta).into_inner()
}

/// The 90 degree rotation `R(π/2)`, i.e. `[x, y] -> [-y, x]`.
///
/// Shows up in every derivative of a rotation: `d/dθ R(θ) = R(θ)·R(π/2)`.
pub fn perpendicular() -> Matrix2<f64> {
    Matrix2::new(0.0, -1.0, 1.0, 0.0)
}

/// Unit vector pointing along `angle`.
pub fn unit_heading(angle: f64) -> Vector2<f64> {
    Vector2::new(angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn wrap_keeps_values_inside_interval() {
        assert_abs_diff_eq!(wrap_to_pi(0.0), 0.0);
        assert_abs_diff_eq!(wrap_to_pi(1.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_to_pi(-1.0), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn wrap_folds_multiples_of_two_pi() {
        assert_abs_diff_eq!(wrap_to_pi(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_to_pi(-3.0 * PI / 2.0), PI / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_to_pi(0.5 + 8.0 * PI), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn wrap_boundary_is_positive_pi() {
        assert_abs_diff_eq!(wrap_to_pi(PI), PI);
        assert_abs_diff_eq!(wrap_to_pi(-PI), PI);
    }

    #[test]
    fn rotation_is_orthonormal() {
        let r = rotation_matrix_2d(0.7);
        assert_abs_diff_eq!(r * r.transpose(), Matrix2::identity(), epsilon = 1e-12);
        assert_abs_diff_eq!(r.determinant(), 1.0, epsilon = 1e-12);

        let v = r * Vector2::x();
        assert_abs_diff_eq!(v, unit_heading(0.7), epsilon = 1e-12);
    }

    #[test]
    fn perpendicular_matches_quarter_turn() {
        assert_abs_diff_eq!(perpendicular(), rotation_matrix_2d(PI / 2.0), epsilon = 1e-12);
    }
}
