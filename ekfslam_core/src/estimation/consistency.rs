// ekfslam_core/src/estimation/consistency.rs

//! Normalized estimation error (NEES) and normalized innovation (NIS) squared.
//!
//! These are diagnostics, not part of the filter loop. Degenerate inputs never
//! fail: a NEES component that cannot be evaluated is `None` and reads as
//! `NEES_FALLBACK` through `Nees::as_array`.

use nalgebra::{DMatrix, DVector, Matrix2, Matrix3, Vector2};
use tracing::trace;

use crate::types::Pose;
use crate::utils::geometry::wrap_to_pi;

/// Value reported for a component whose covariance is singular, zero or
/// yields a non-finite result.
pub const NEES_FALLBACK: f64 = 1.0;

/// NEES of a pose estimate, split by component. `None` marks a component
/// that fell back and is not a chi² sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nees {
    /// Full pose, chi² with 3 dof.
    pub all: Option<f64>,
    /// `[x, y]` only, chi² with 2 dof.
    pub position: Option<f64>,
    /// Heading only, chi² with 1 dof.
    pub heading: Option<f64>,
}

impl Nees {
    /// Degrees of freedom of `[all, position, heading]`.
    pub const DOF: [usize; 3] = [3, 2, 1];

    /// `[all, position, heading]`, with `NEES_FALLBACK` for components that
    /// could not be evaluated.
    pub fn as_array(&self) -> [f64; 3] {
        self.computed().map(|c| c.unwrap_or(NEES_FALLBACK))
    }

    /// `[all, position, heading]` as evaluated.
    pub fn computed(&self) -> [Option<f64>; 3] {
        [self.all, self.position, self.heading]
    }

    /// True when any component fell back.
    pub fn is_degenerate(&self) -> bool {
        self.computed().iter().any(Option::is_none)
    }
}

fn finite(value: Option<f64>, component: &'static str) -> Option<f64> {
    let value = value.filter(|v| v.is_finite());
    if value.is_none() {
        trace!(component, "degenerate covariance, reporting NEES fallback");
    }
    value
}

/// NEES of `pose_estimate` against `ground_truth` under `pose_covariance`.
///
/// The heading error is wrapped before use.
pub fn nees(pose_estimate: &Pose, pose_covariance: &Matrix3<f64>, ground_truth: &Pose) -> Nees {
    let mut error = pose_estimate - ground_truth;
    error[2] = wrap_to_pi(error[2]);

    let all = pose_covariance
        .cholesky()
        .map(|chol| error.dot(&chol.solve(&error)));

    let position_error = Vector2::new(error[0], error[1]);
    let position_covariance: Matrix2<f64> = pose_covariance.fixed_view::<2, 2>(0, 0).into_owned();
    let position = position_covariance
        .cholesky()
        .map(|chol| position_error.dot(&chol.solve(&position_error)));

    let heading_variance = pose_covariance[(2, 2)];
    let heading = (heading_variance > 0.0).then(|| error[2] * error[2] / heading_variance);

    Nees {
        all: finite(all, "all"),
        position: finite(position, "position"),
        heading: finite(heading, "heading"),
    }
}

/// `vᵀ·S⁻¹·v` for an innovation `v` that has already had its bearing entries
/// wrapped. Falls back to `NEES_FALLBACK` under the same rules as `nees`.
pub fn nis(innovation: &DVector<f64>, innovation_covariance: &DMatrix<f64>) -> f64 {
    if innovation.is_empty() || innovation_covariance.shape() != (innovation.len(), innovation.len()) {
        return NEES_FALLBACK;
    }
    let value = innovation_covariance
        .clone()
        .cholesky()
        .map(|chol| innovation.dot(&chol.solve(innovation)));
    finite(value, "nis").unwrap_or(NEES_FALLBACK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn identity_covariance_gives_squared_error() {
        let result = nees(&Pose::new(1.0, 2.0, 0.5), &Matrix3::identity(), &Pose::zeros());
        assert_abs_diff_eq!(result.all.unwrap(), 5.25, epsilon = 1e-12);
        assert_abs_diff_eq!(result.position.unwrap(), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.heading.unwrap(), 0.25, epsilon = 1e-12);
        assert!(!result.is_degenerate());
        assert_eq!(result.computed().map(Option::unwrap), result.as_array());
    }

    #[test]
    fn heading_error_is_wrapped() {
        let cov = Matrix3::from_diagonal(&nalgebra::Vector3::new(1.0, 1.0, 0.01));
        let result = nees(&Pose::new(0.0, 0.0, PI - 0.1), &cov, &Pose::new(0.0, 0.0, -PI + 0.1));
        assert_abs_diff_eq!(result.heading.unwrap(), 0.04 / 0.01, epsilon = 1e-9);
        assert_abs_diff_eq!(result.all.unwrap(), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn singular_covariance_falls_back() {
        let result = nees(&Pose::new(1.0, 0.0, 0.1), &Matrix3::zeros(), &Pose::zeros());
        assert_eq!(result.computed(), [None; 3]);
        assert_eq!(result.as_array(), [NEES_FALLBACK; 3]);

        // Position block usable, heading variance zero.
        let cov = Matrix3::from_diagonal(&nalgebra::Vector3::new(2.0, 2.0, 0.0));
        let result = nees(&Pose::new(2.0, 0.0, 0.1), &cov, &Pose::zeros());
        assert!(result.is_degenerate());
        assert_eq!(result.all, None);
        assert_abs_diff_eq!(result.position.unwrap(), 2.0, epsilon = 1e-12);
        assert_eq!(result.heading, None);
        assert_eq!(result.as_array()[2], NEES_FALLBACK);
    }

    #[test]
    fn nis_matches_hand_computation() {
        let v = DVector::from_vec(vec![0.2, -0.1]);
        let s = DMatrix::from_diagonal(&DVector::from_vec(vec![0.04, 0.01]));
        assert_abs_diff_eq!(nis(&v, &s), 1.0 + 1.0, epsilon = 1e-12);

        assert_eq!(nis(&v, &DMatrix::zeros(2, 2)), NEES_FALLBACK);
        assert_eq!(nis(&DVector::zeros(0), &DMatrix::zeros(0, 0)), NEES_FALLBACK);
    }
}
