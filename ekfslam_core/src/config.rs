// ekfslam_core/src/config.rs

use nalgebra::{Matrix2, Matrix3, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlamError};

// =========================================================================
// == Filter Configuration ==
// =========================================================================

/// Significance levels used by the data associator.
///
/// `individual` gates each (measurement, landmark) pair on its own,
/// `joint` gates the whole set of accepted pairs at once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatingThresholds {
    pub individual: f64,
    pub joint: f64,
}

impl Default for GatingThresholds {
    fn default() -> Self {
        Self {
            individual: 1e-3,
            joint: 1e-4,
        }
    }
}

/// Construction-time configuration of an `EkfSlam` filter.
///
/// Matrices are read column-major when deserialized (nalgebra's layout), which
/// for the symmetric Q and R is the same as row-major. Missing fields take
/// their `Default` value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlamConfig {
    /// Odometry noise covariance `Q` (3x3, body frame).
    pub process_noise: Matrix3<f64>,
    /// Range-bearing noise covariance `R` (2x2).
    pub measurement_noise: Matrix2<f64>,
    /// When false, measurement `j` is assumed to belong to landmark `j`.
    pub do_association: bool,
    pub gating: GatingThresholds,
    /// Sensor position in the robot frame.
    pub sensor_offset: Vector2<f64>,
    /// Run the symmetry / definiteness checks around every step.
    pub check_invariants: bool,
}

impl Default for SlamConfig {
    fn default() -> Self {
        Self {
            process_noise: Matrix3::from_diagonal(&nalgebra::Vector3::new(0.01, 0.01, 0.0025)),
            measurement_noise: Matrix2::from_diagonal(&Vector2::new(0.01, 3e-4)),
            do_association: true,
            gating: GatingThresholds::default(),
            sensor_offset: Vector2::zeros(),
            check_invariants: true,
        }
    }
}

impl SlamConfig {
    /// Rejects configurations the filter cannot run with.
    pub fn validate(&self) -> Result<()> {
        check_noise_matrix("process_noise", self.process_noise.as_slice(), 3)?;
        check_noise_matrix("measurement_noise", self.measurement_noise.as_slice(), 2)?;

        for (name, alpha) in [
            ("gating.individual", self.gating.individual),
            ("gating.joint", self.gating.joint),
        ] {
            if !(alpha > 0.0 && alpha < 1.0) {
                return Err(SlamError::InvalidConfig(format!(
                    "{name} must be a significance level in (0, 1), got {alpha}"
                )));
            }
        }

        if !self.sensor_offset.iter().all(|v| v.is_finite()) {
            return Err(SlamError::InvalidConfig(
                "sensor_offset must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Symmetric, finite and PSD (checked through the eigenvalues).
fn check_noise_matrix(name: &str, column_major: &[f64], n: usize) -> Result<()> {
    let m = nalgebra::DMatrix::from_column_slice(n, n, column_major);
    if !m.iter().all(|v| v.is_finite()) {
        return Err(SlamError::InvalidConfig(format!("{name} has non-finite entries")));
    }
    if (&m - m.transpose()).amax() > 1e-12 {
        return Err(SlamError::InvalidConfig(format!("{name} is not symmetric")));
    }
    let min_eigenvalue = m.symmetric_eigenvalues().min();
    if min_eigenvalue < 0.0 {
        return Err(SlamError::InvalidConfig(format!(
            "{name} is not positive semi-definite (min eigenvalue {min_eigenvalue})"
        )));
    }
    Ok(())
}
