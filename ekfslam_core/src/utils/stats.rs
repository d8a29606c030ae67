// ekfslam_core/src/utils/stats.rs

//! Chi-square quantiles for gating and consistency bands, on top of
//! `statrs::distribution::ChiSquared`.

use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Value `x` such that `P(X <= x) = p` for `X ~ chi²(dof)`.
///
/// Zero degrees of freedom and `p <= 0` give 0; `p >= 1` gives infinity.
pub fn chi2_quantile(p: f64, dof: usize) -> f64 {
    if dof == 0 || p.is_nan() || p <= 0.0 {
        return 0.0;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    ChiSquared::new(dof as f64).map_or(0.0, |dist| dist.inverse_cdf(p))
}

/// Two-sided `confidence` band `(lower, upper)` for a single chi²(dof) sample.
pub fn chi2_interval(dof: usize, confidence: f64) -> (f64, f64) {
    let tail = (1.0 - confidence) / 2.0;
    (chi2_quantile(tail, dof), chi2_quantile(1.0 - tail, dof))
}

/// Gate for a squared Mahalanobis distance at significance level `alpha`.
pub fn chi2_gate(alpha: f64, dof: usize) -> f64 {
    chi2_quantile(1.0 - alpha, dof)
}
