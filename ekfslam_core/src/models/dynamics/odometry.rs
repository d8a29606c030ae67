// ekfslam_core/src/models/dynamics/odometry.rs

use nalgebra::{Matrix3, Vector2};

use crate::models::dynamics::MotionModel;
use crate::types::{Odometry, Pose};
use crate::utils::geometry::{rotation_matrix_2d, wrap_to_pi};

/// Rigid-body composition of a pose with a body-frame odometry increment.
///
/// With odometry `[u, v, φ]` (forward, lateral, heading increment):
///
/// ```text
/// x' = x + u·cos ψ − v·sin ψ
/// y' = y + u·sin ψ + v·cos ψ
/// ψ' = wrap(ψ + φ)
/// ```
///
/// The displacement is rotated by the heading at the *previous* pose, and the
/// resulting heading is always wrapped back into `(-π, π]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OdometryModel;

impl MotionModel for OdometryModel {
    fn predict_pose(&self, pose: &Pose, odometry: &Odometry) -> Pose {
        let psi = pose[2];
        let displacement = rotation_matrix_2d(psi) * Vector2::new(odometry[0], odometry[1]);

        Pose::new(
            pose[0] + displacement.x,
            pose[1] + displacement.y,
            wrap_to_pi(psi + odometry[2]),
        )
    }

    fn jacobian_pose(&self, pose: &Pose, odometry: &Odometry) -> Matrix3<f64> {
        let (sin, cos) = pose[2].sin_cos();
        let (u, v) = (odometry[0], odometry[1]);

        #[rustfmt::skip]
        let fx = Matrix3::new(
            1.0, 0.0, -u * sin - v * cos,
            0.0, 1.0,  u * cos - v * sin,
            0.0, 0.0,  1.0,
        );
        fx
    }

    fn jacobian_control(&self, pose: &Pose, _odometry: &Odometry) -> Matrix3<f64> {
        let (sin, cos) = pose[2].sin_cos();

        #[rustfmt::skip]
        let fu = Matrix3::new(
            cos, -sin, 0.0,
            sin,  cos, 0.0,
            0.0,  0.0, 1.0,
        );
        fu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    /// Central differences of `f` with respect to the pose, heading wrapped.
    fn numeric_fx(pose: &Pose, u: &Odometry) -> Matrix3<f64> {
        let h = 1e-6;
        let mut jac = Matrix3::zeros();
        for c in 0..3 {
            let mut plus = *pose;
            let mut minus = *pose;
            plus[c] += h;
            minus[c] -= h;
            let mut d = OdometryModel.predict_pose(&plus, u) - OdometryModel.predict_pose(&minus, u);
            d[2] = wrap_to_pi(d[2]);
            jac.set_column(c, &(d / (2.0 * h)));
        }
        jac
    }

    fn numeric_fu(pose: &Pose, u: &Odometry) -> Matrix3<f64> {
        let h = 1e-6;
        let mut jac = Matrix3::zeros();
        for c in 0..3 {
            let mut plus = *u;
            let mut minus = *u;
            plus[c] += h;
            minus[c] -= h;
            let mut d = OdometryModel.predict_pose(pose, &plus) - OdometryModel.predict_pose(pose, &minus);
            d[2] = wrap_to_pi(d[2]);
            jac.set_column(c, &(d / (2.0 * h)));
        }
        jac
    }

    #[test]
    fn forward_motion_from_origin() {
        let pose = OdometryModel.predict_pose(&Pose::zeros(), &Odometry::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(pose, Pose::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn lateral_motion_is_rotated_with_heading() {
        // Facing +y, a step to the left (positive lateral) moves towards -x.
        let start = Pose::new(2.0, 3.0, PI / 2.0);
        let pose = OdometryModel.predict_pose(&start, &Odometry::new(0.0, 1.0, 0.0));
        assert_abs_diff_eq!(pose, Pose::new(1.0, 3.0, PI / 2.0), epsilon = 1e-12);
    }

    #[test]
    fn heading_is_wrapped_after_composition() {
        let start = Pose::new(0.0, 0.0, 3.0);
        let pose = OdometryModel.predict_pose(&start, &Odometry::new(0.0, 0.0, 0.5));
        assert_abs_diff_eq!(pose[2], 3.5 - 2.0 * PI, epsilon = 1e-12);
    }

    #[test]
    fn zero_odometry_is_identity() {
        let start = Pose::new(-1.0, 4.0, -2.5);
        let u = Odometry::zeros();
        assert_abs_diff_eq!(OdometryModel.predict_pose(&start, &u), start, epsilon = 1e-12);
        assert_abs_diff_eq!(OdometryModel.jacobian_pose(&start, &u), Matrix3::identity());
    }

    #[test]
    fn jacobians_match_finite_differences() {
        let pose = Pose::new(1.5, -0.3, 0.8);
        let u = Odometry::new(0.7, -0.2, 0.1);

        assert_abs_diff_eq!(OdometryModel.jacobian_pose(&pose, &u), numeric_fx(&pose, &u), epsilon = 1e-6);
        assert_abs_diff_eq!(OdometryModel.jacobian_control(&pose, &u), numeric_fu(&pose, &u), epsilon = 1e-6);
    }

    #[test]
    fn heading_row_of_fu_is_unit_vector() {
        let fu = OdometryModel.jacobian_control(&Pose::new(0.0, 0.0, 1.1), &Odometry::new(1.0, 0.5, 0.2));
        assert_eq!(fu.row(2).clone_owned(), nalgebra::RowVector3::new(0.0, 0.0, 1.0));
    }
}
