// ekfslam_core/src/estimation/invariants.rs

//! Fatal checks on the shape and numerical health of a `SlamState`.

use nalgebra::DMatrix;

use crate::error::{Result, SlamError};
use crate::estimation::state::SlamState;
use crate::types::{LANDMARK_DIM, POSE_DIM};

// Same tolerances as numpy's `allclose`.
const SYMMETRY_RTOL: f64 = 1e-5;
const SYMMETRY_ATOL: f64 = 1e-8;

/// Eigenvalues down to `-PSD_TOLERANCE * max(1, max|P|)` still count as zero.
const PSD_TOLERANCE: f64 = 1e-10;

/// `eta` is `3 + 2L` long and `P` is square with the same dimension.
pub fn check_shape(context: &'static str, state: &SlamState) -> Result<()> {
    let n = state.eta.len();
    let (rows, cols) = state.covariance.shape();
    if rows != n || cols != n {
        return Err(SlamError::DimensionMismatch {
            context,
            eta_len: n,
            rows,
            cols,
        });
    }
    if n < POSE_DIM || (n - POSE_DIM) % LANDMARK_DIM != 0 {
        return Err(SlamError::MalformedState {
            context,
            eta_len: n,
        });
    }
    Ok(())
}

pub fn check_symmetric(context: &'static str, p: &DMatrix<f64>) -> Result<()> {
    let mut max_asymmetry: f64 = 0.0;
    let mut violated = false;
    for c in 0..p.ncols() {
        for r in (c + 1)..p.nrows() {
            let (a, b) = (p[(r, c)], p[(c, r)]);
            let diff = (a - b).abs();
            max_asymmetry = max_asymmetry.max(diff);
            if !(diff <= SYMMETRY_ATOL + SYMMETRY_RTOL * b.abs()) {
                violated = true;
            }
        }
    }
    if violated {
        return Err(SlamError::NotSymmetric {
            context,
            max_asymmetry,
        });
    }
    Ok(())
}

/// Smallest eigenvalue of the symmetric part of `p` (0 for an empty matrix).
pub fn min_eigenvalue(p: &DMatrix<f64>) -> f64 {
    if p.is_empty() {
        return 0.0;
    }
    let sym = (p + p.transpose()) * 0.5;
    sym.symmetric_eigenvalues().min()
}

pub fn check_positive_semi_definite(context: &'static str, p: &DMatrix<f64>) -> Result<()> {
    let min_eigenvalue = min_eigenvalue(p);
    let tolerance = PSD_TOLERANCE * p.amax().max(1.0);
    if !(min_eigenvalue >= -tolerance) {
        return Err(SlamError::NotPositiveSemiDefinite {
            context,
            min_eigenvalue,
        });
    }
    Ok(())
}

pub fn check_positive_definite(context: &'static str, p: &DMatrix<f64>) -> Result<()> {
    let min_eigenvalue = min_eigenvalue(p);
    if !(min_eigenvalue > 0.0) {
        return Err(SlamError::NotPositiveDefinite {
            context,
            min_eigenvalue,
        });
    }
    Ok(())
}

/// Shape, symmetry and PSD in one go; used on the inputs of every step.
pub fn check_state(context: &'static str, state: &SlamState) -> Result<()> {
    check_shape(context, state)?;
    check_symmetric(context, &state.covariance)?;
    check_positive_semi_definite(context, &state.covariance)
}

/// Replaces `p` by `(p + pᵀ) / 2`, removing rounding asymmetry.
pub fn symmetrize(p: &mut DMatrix<f64>) {
    let n = p.nrows();
    for c in 0..n {
        for r in (c + 1)..n {
            let mean = 0.5 * (p[(r, c)] + p[(c, r)]);
            p[(r, c)] = mean;
            p[(c, r)] = mean;
        }
    }
}
