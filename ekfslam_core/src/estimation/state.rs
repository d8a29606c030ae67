// ekfslam_core/src/estimation/state.rs

use nalgebra::{DMatrix, DVector, Matrix2, Matrix3, Vector2};

use crate::types::{
    landmark_count, landmark_offset, Covariance, Pose, State, LANDMARK_DIM, POSE_DIM,
};
use crate::utils::geometry::wrap_to_pi;

/// The joint Gaussian belief over the robot pose and the landmark map.
///
/// Layout of `eta`: `[x, y, ψ, m0_x, m0_y, m1_x, m1_y, ...]`, landmark `i` at
/// offset `3 + 2i`. `covariance` uses the same ordering along both axes.
/// Landmarks are only ever appended, so an index stays valid for the lifetime
/// of the estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct SlamState {
    /// The mean `eta`, length `3 + 2L`.
    pub eta: State,
    /// The covariance `P`, shape `(3 + 2L) x (3 + 2L)`.
    pub covariance: Covariance,
}

impl SlamState {
    /// Creates an estimate with an empty map.
    pub fn new(pose: Pose, pose_covariance: Matrix3<f64>) -> Self {
        let mut eta = DVector::zeros(POSE_DIM);
        eta.copy_from(&pose);
        eta[2] = wrap_to_pi(eta[2]);

        let mut covariance = DMatrix::zeros(POSE_DIM, POSE_DIM);
        covariance.copy_from(&pose_covariance);

        Self { eta, covariance }
    }

    /// Wraps already-built buffers. Shapes are checked by the filter, not here.
    pub fn from_parts(eta: State, covariance: Covariance) -> Self {
        Self { eta, covariance }
    }

    /// Returns the dimension of the state vector.
    pub fn dim(&self) -> usize {
        self.eta.len()
    }

    pub fn num_landmarks(&self) -> usize {
        landmark_count(self.eta.len())
    }

    /// The robot pose `[x, y, ψ]`.
    pub fn pose(&self) -> Pose {
        self.eta.fixed_rows::<3>(0).into_owned()
    }

    /// The 3x3 robot-robot covariance block.
    pub fn pose_covariance(&self) -> Matrix3<f64> {
        self.covariance.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// World position of landmark `idx`, if it exists.
    pub fn landmark(&self, idx: usize) -> Option<Vector2<f64>> {
        if idx >= self.num_landmarks() {
            return None;
        }
        Some(self.eta.fixed_rows::<2>(landmark_offset(idx)).into_owned())
    }

    /// The 2x2 covariance block of landmark `idx`, if it exists.
    pub fn landmark_covariance(&self, idx: usize) -> Option<Matrix2<f64>> {
        if idx >= self.num_landmarks() {
            return None;
        }
        let base = landmark_offset(idx);
        Some(self.covariance.fixed_view::<2, 2>(base, base).into_owned())
    }

    /// Iterates over landmark positions in creation order.
    pub fn landmarks(&self) -> impl Iterator<Item = Vector2<f64>> + '_ {
        self.eta
            .as_slice()
            .get(POSE_DIM..)
            .unwrap_or(&[])
            .chunks_exact(LANDMARK_DIM)
            .map(|c| Vector2::new(c[0], c[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn two_landmark_state() -> SlamState {
        let eta = DVector::from_vec(vec![1.0, 2.0, 0.5, 10.0, 11.0, 20.0, 21.0]);
        let mut covariance = DMatrix::identity(7, 7);
        covariance[(5, 6)] = 0.3;
        covariance[(6, 5)] = 0.3;
        SlamState::from_parts(eta, covariance)
    }

    #[test]
    fn new_state_has_no_landmarks() {
        let state = SlamState::new(Pose::new(1.0, 2.0, 0.1), Matrix3::identity() * 0.5);
        assert_eq!(state.dim(), 3);
        assert_eq!(state.num_landmarks(), 0);
        assert_eq!(state.landmarks().count(), 0);
        assert!(state.landmark(0).is_none());
        assert_abs_diff_eq!(state.pose_covariance(), Matrix3::identity() * 0.5);
    }

    #[test]
    fn new_state_wraps_heading() {
        let state = SlamState::new(Pose::new(0.0, 0.0, 7.0), Matrix3::identity());
        assert_abs_diff_eq!(state.pose()[2], 7.0 - 2.0 * std::f64::consts::PI, epsilon = 1e-12);
    }

    #[test]
    fn landmark_accessors_follow_layout() {
        let state = two_landmark_state();
        assert_eq!(state.num_landmarks(), 2);
        assert_eq!(state.landmark(1), Some(Vector2::new(20.0, 21.0)));
        assert!(state.landmark(2).is_none());

        let cov = state.landmark_covariance(1).unwrap();
        assert_eq!(cov, Matrix2::new(1.0, 0.3, 0.3, 1.0));

        let all: Vec<_> = state.landmarks().collect();
        assert_eq!(all, vec![Vector2::new(10.0, 11.0), Vector2::new(20.0, 21.0)]);
    }
}
