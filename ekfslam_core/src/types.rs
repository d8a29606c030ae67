// ekfslam_core/src/types.rs

use nalgebra::{DMatrix, DVector, Vector3};

// --- Core Type Aliases ---
pub type State = DVector<f64>;
pub type Covariance = DMatrix<f64>;

/// Robot pose `[x, y, heading]` in the world frame.
pub type Pose = Vector3<f64>;

/// Body-frame odometry increment `[forward, lateral, heading_increment]`,
/// expressed at the previous pose.
pub type Odometry = Vector3<f64>;

// --- State Layout ---
/// Number of entries the robot pose occupies at the head of the state vector.
pub const POSE_DIM: usize = 3;
/// Number of entries each landmark occupies in the state vector.
pub const LANDMARK_DIM: usize = 2;
/// Number of entries in a single range-bearing measurement.
pub const MEASUREMENT_DIM: usize = 2;

/// Index of the first state entry belonging to landmark `i`.
#[inline]
pub fn landmark_offset(i: usize) -> usize {
    POSE_DIM + LANDMARK_DIM * i
}

/// Number of landmarks stored in a state vector of length `state_len`.
#[inline]
pub fn landmark_count(state_len: usize) -> usize {
    state_len.saturating_sub(POSE_DIM) / LANDMARK_DIM
}
