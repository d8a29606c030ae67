// ekfslam_core/src/models/measurement/range_bearing.rs

use nalgebra::{DMatrix, DVector, Matrix2, Matrix2x3, RowVector2, Vector2};
use tracing::warn;

use crate::models::measurement::{LandmarkInit, LandmarkMeasurement};
use crate::types::{landmark_count, landmark_offset, Pose, MEASUREMENT_DIM, POSE_DIM};
use crate::utils::geometry::{perpendicular, rotation_matrix_2d, unit_heading};

/// Below this range a landmark sits on the sensor origin and its bearing has
/// no meaningful derivative.
const MIN_LINEARIZABLE_RANGE: f64 = 1e-9;

/// A planar range-bearing sensor mounted at a fixed offset on the robot.
///
/// The sensor axes are aligned with the robot axes; `sensor_offset` is the
/// position of the sensor origin in the robot frame.
#[derive(Debug, Clone)]
pub struct RangeBearingModel {
    pub sensor_offset: Vector2<f64>,
    /// The 2x2 `[range, bearing]` noise covariance `R`.
    pub noise_covariance: Matrix2<f64>,
}

impl RangeBearingModel {
    pub fn new(sensor_offset: Vector2<f64>, noise_covariance: Matrix2<f64>) -> Self {
        Self {
            sensor_offset,
            noise_covariance,
        }
    }

    /// Predicted `[range, bearing]` of a single world point seen from `pose`.
    ///
    /// A point exactly on the sensor origin yields range 0 and bearing 0
    /// (`atan2(0, 0)` is defined as 0).
    pub fn predict_point(&self, pose: &Pose, landmark: &Vector2<f64>) -> Vector2<f64> {
        let delta = landmark - pose.xy();
        let z_cartesian = rotation_matrix_2d(-pose[2]) * delta - self.sensor_offset;
        Vector2::new(z_cartesian.norm(), z_cartesian.y.atan2(z_cartesian.x))
    }
}

impl LandmarkMeasurement for RangeBearingModel {
    fn noise_covariance(&self) -> &Matrix2<f64> {
        &self.noise_covariance
    }

    fn predict_measurements(&self, eta: &DVector<f64>) -> DVector<f64> {
        let pose = Pose::new(eta[0], eta[1], eta[2]);
        let n_landmarks = landmark_count(eta.len());

        let mut z_pred = DVector::zeros(MEASUREMENT_DIM * n_landmarks);
        for i in 0..n_landmarks {
            let landmark = eta.fixed_rows::<2>(landmark_offset(i)).into_owned();
            z_pred
                .fixed_rows_mut::<2>(MEASUREMENT_DIM * i)
                .copy_from(&self.predict_point(&pose, &landmark));
        }
        z_pred
    }

    fn measurement_jacobian(&self, eta: &DVector<f64>) -> DMatrix<f64> {
        let robot_position = Vector2::new(eta[0], eta[1]);
        let n_landmarks = landmark_count(eta.len());
        let offset_world = rotation_matrix_2d(eta[2]) * self.sensor_offset;
        let quarter_turn = perpendicular();

        let mut h_jac = DMatrix::zeros(MEASUREMENT_DIM * n_landmarks, eta.len());

        // d(z_cartesian)/d(pose) in world axes, before the polar conversion:
        // [ -I | -S·δ ] with S the quarter turn and δ = m - ρ.
        let mut d_cartesian_d_pose = Matrix2x3::zeros();
        d_cartesian_d_pose
            .fixed_view_mut::<2, 2>(0, 0)
            .copy_from(&(-Matrix2::identity()));

        for i in 0..n_landmarks {
            let col = landmark_offset(i);
            let row = MEASUREMENT_DIM * i;

            let delta = eta.fixed_rows::<2>(col) - robot_position;
            // Sensor-to-landmark vector in world axes; same norm as the sensor-frame one.
            let w = delta - offset_world;
            let range = w.norm();
            if range < MIN_LINEARIZABLE_RANGE {
                warn!(
                    landmark = i,
                    "landmark coincides with the sensor origin, leaving its Jacobian rows zero"
                );
                continue;
            }

            d_cartesian_d_pose.set_column(2, &(-(quarter_turn * delta)));

            let d_range: RowVector2<f64> = w.transpose() / range;
            let d_bearing: RowVector2<f64> = (quarter_turn * w).transpose() / (range * range);

            h_jac
                .fixed_view_mut::<1, 3>(row, 0)
                .copy_from(&(d_range * d_cartesian_d_pose));
            h_jac
                .fixed_view_mut::<1, 3>(row + 1, 0)
                .copy_from(&(d_bearing * d_cartesian_d_pose));
            h_jac.fixed_view_mut::<1, 2>(row, col).copy_from(&d_range);
            h_jac.fixed_view_mut::<1, 2>(row + 1, col).copy_from(&d_bearing);
        }

        debug_assert_eq!(h_jac.ncols(), POSE_DIM + 2 * n_landmarks);
        h_jac
    }

    fn initialize_landmark(&self, pose: &Pose, z: &Vector2<f64>) -> LandmarkInit {
        let (range, bearing) = (z[0], z[1]);
        let psi = pose[2];
        let world_bearing = bearing + psi;
        let rotation = rotation_matrix_2d(psi);

        let position = pose.xy() + unit_heading(world_bearing) * range + rotation * self.sensor_offset;

        // ∂ℓ/∂pose = [ I | r·(-sin, cos)(θ+ψ) + R(ψ + π/2)·s ]
        let d_heading = unit_heading(world_bearing + std::f64::consts::FRAC_PI_2) * range
            + rotation * perpendicular() * self.sensor_offset;
        let mut g_x = Matrix2x3::zeros();
        g_x.fixed_view_mut::<2, 2>(0, 0).copy_from(&Matrix2::identity());
        g_x.set_column(2, &d_heading);

        // ∂ℓ/∂[r, θ] = R(θ + ψ)·diag(1, r)
        let g_z = rotation_matrix_2d(world_bearing) * Matrix2::new(1.0, 0.0, 0.0, range);

        LandmarkInit {
            position,
            g_x,
            g_z,
        }
    }
}
