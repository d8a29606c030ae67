// ekfslam_core/src/error.rs

use thiserror::Error;

/// Every failure the estimator can report.
///
/// All of these are fatal for the step that produced them: the state handed
/// to the failing call must be considered unusable, and it is up to the caller
/// to decide whether to halt the run or skip the step.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SlamError {
    // --- Shape / contract violations ---
    #[error("{context}: state vector of length {eta_len} does not match covariance of shape {rows}x{cols}")]
    DimensionMismatch {
        context: &'static str,
        eta_len: usize,
        rows: usize,
        cols: usize,
    },

    #[error("{context}: state vector length {eta_len} is not 3 + 2 * landmarks")]
    MalformedState {
        context: &'static str,
        eta_len: usize,
    },

    #[error("{context}: measurement vector has odd length {len}, expected [range, bearing] pairs")]
    MalformedMeasurements { context: &'static str, len: usize },

    #[error("association contract violated: {0}")]
    InvalidAssociation(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // --- Numerical invariant violations ---
    #[error("{context}: covariance is not symmetric (max asymmetry {max_asymmetry:e})")]
    NotSymmetric {
        context: &'static str,
        max_asymmetry: f64,
    },

    #[error("{context}: covariance is not positive semi-definite (min eigenvalue {min_eigenvalue:e})")]
    NotPositiveSemiDefinite {
        context: &'static str,
        min_eigenvalue: f64,
    },

    #[error("{context}: covariance is not positive definite (min eigenvalue {min_eigenvalue:e})")]
    NotPositiveDefinite {
        context: &'static str,
        min_eigenvalue: f64,
    },

    #[error("{context}: innovation covariance could not be Cholesky factorized")]
    SingularInnovation { context: &'static str },
}

pub type Result<T> = std::result::Result<T, SlamError>;
