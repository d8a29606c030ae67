// ekfslam_core/src/models/dynamics/mod.rs

use nalgebra::Matrix3;
use std::fmt::Debug;

use crate::types::{Odometry, Pose};

/// A discrete motion model used by the estimator's prediction step.
///
/// The model composes the previous pose with a control increment `u` and
/// provides the Jacobians needed to push the covariance through that
/// composition. Both Jacobians must be evaluated at the same linearization
/// point as `predict_pose`, i.e. at the pre-motion pose.
pub trait MotionModel: Debug + Send + Sync {
    /// Computes `x_k+1 = f(x_k, u_k)`.
    fn predict_pose(&self, pose: &Pose, odometry: &Odometry) -> Pose;

    /// Jacobian `Fx = ∂f/∂x` (3x3).
    fn jacobian_pose(&self, pose: &Pose, odometry: &Odometry) -> Matrix3<f64>;

    /// Jacobian `Fu = ∂f/∂u` (3x3).
    fn jacobian_control(&self, pose: &Pose, odometry: &Odometry) -> Matrix3<f64>;
}

pub mod odometry;
