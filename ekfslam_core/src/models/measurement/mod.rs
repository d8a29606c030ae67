// ekfslam_core/src/models/measurement/mod.rs

use dyn_clone::DynClone;
use nalgebra::{DMatrix, DVector, Matrix2, Matrix2x3, Vector2};
use std::fmt::Debug;

use crate::types::Pose;

// --- MEASUREMENT MODEL TRAIT ---
// Represents the mathematical model of a landmark sensor. `z = h(eta) + w`
pub trait LandmarkMeasurement: DynClone + Debug + Send + Sync {
    /// Returns the per-landmark measurement noise covariance `R`.
    fn noise_covariance(&self) -> &Matrix2<f64>;

    /// Predicts the measurement of every landmark in `eta`, interleaved in
    /// landmark order: `[z_0, z_1, ...]` with each `z_i` two entries long.
    fn predict_measurements(&self, eta: &DVector<f64>) -> DVector<f64>;

    /// Calculates the measurement Jacobian `H = ∂h/∂eta`, shape `(2L) x (3 + 2L)`.
    fn measurement_jacobian(&self, eta: &DVector<f64>) -> DMatrix<f64>;

    /// Inverse model used to initialize a landmark from a single measurement.
    /// Returns the world position together with `Gx = ∂ℓ/∂pose` (2x3) and
    /// `Gz = ∂ℓ/∂z` (2x2).
    fn initialize_landmark(&self, pose: &Pose, z: &Vector2<f64>) -> LandmarkInit;
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn LandmarkMeasurement>`.
dyn_clone::clone_trait_object!(LandmarkMeasurement);

/// Output of `LandmarkMeasurement::initialize_landmark`.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkInit {
    pub position: Vector2<f64>,
    pub g_x: Matrix2x3<f64>,
    pub g_z: Matrix2<f64>,
}

pub mod range_bearing;
