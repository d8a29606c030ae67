// ekfslam_core/src/association/nearest_neighbor.rs

use nalgebra::{DMatrix, DVector, Vector2};
use tracing::{trace, warn};

use crate::association::{Association, Associator};
use crate::config::GatingThresholds;
use crate::types::MEASUREMENT_DIM;
use crate::utils::geometry::wrap_to_pi;
use crate::utils::stats::chi2_gate;

/// A candidate pairing with its individual squared Mahalanobis distance.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    nis: f64,
    measurement: usize,
    landmark: usize,
}

/// Greedy nearest-neighbour association with individual and joint gating.
///
/// 1. Every (measurement, landmark) pair is scored by its squared Mahalanobis
///    distance under the landmark's 2x2 block of `S` (bearing residual wrapped)
///    and kept if it passes the chi²(2) gate at `gating.individual`.
/// 2. Pairs are accepted in ascending distance order, skipping any measurement
///    or landmark already taken. Ties fall back to measurement then landmark
///    index, so the result is deterministic.
/// 3. While the joint NIS of the accepted set fails the chi²(2k) gate at
///    `gating.joint`, the pair with the largest individual distance is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct GatedNearestNeighbor;

impl GatedNearestNeighbor {
    fn innovation(z: &DVector<f64>, z_pred: &DVector<f64>, j: usize, i: usize) -> Vector2<f64> {
        let zj = z.fixed_rows::<2>(MEASUREMENT_DIM * j);
        let zi = z_pred.fixed_rows::<2>(MEASUREMENT_DIM * i);
        Vector2::new(zj[0] - zi[0], wrap_to_pi(zj[1] - zi[1]))
    }

    /// Joint NIS of `accepted`, or `None` when its innovation covariance is
    /// not positive definite.
    fn joint_nis(
        accepted: &[Candidate],
        z: &DVector<f64>,
        z_pred: &DVector<f64>,
        s: &DMatrix<f64>,
    ) -> Option<f64> {
        let k = accepted.len();
        let mut v = DVector::zeros(MEASUREMENT_DIM * k);
        let mut s_joint = DMatrix::zeros(MEASUREMENT_DIM * k, MEASUREMENT_DIM * k);

        for (a, ca) in accepted.iter().enumerate() {
            v.fixed_rows_mut::<2>(MEASUREMENT_DIM * a)
                .copy_from(&Self::innovation(z, z_pred, ca.measurement, ca.landmark));
            for (b, cb) in accepted.iter().enumerate() {
                s_joint
                    .fixed_view_mut::<2, 2>(MEASUREMENT_DIM * a, MEASUREMENT_DIM * b)
                    .copy_from(&s.fixed_view::<2, 2>(
                        MEASUREMENT_DIM * ca.landmark,
                        MEASUREMENT_DIM * cb.landmark,
                    ));
            }
        }

        let chol = s_joint.cholesky()?;
        Some(v.dot(&chol.solve(&v)))
    }
}

impl Associator for GatedNearestNeighbor {
    fn associate(
        &self,
        z: &DVector<f64>,
        z_pred: &DVector<f64>,
        s: &DMatrix<f64>,
        gating: &GatingThresholds,
    ) -> Association {
        let n_measurements = z.len() / MEASUREMENT_DIM;
        let n_landmarks = z_pred.len() / MEASUREMENT_DIM;
        let individual_gate = chi2_gate(gating.individual, MEASUREMENT_DIM);

        // --- 1. Individual compatibility ---
        let mut candidates = Vec::new();
        for i in 0..n_landmarks {
            let s_ii = s
                .fixed_view::<2, 2>(MEASUREMENT_DIM * i, MEASUREMENT_DIM * i)
                .into_owned();
            let Some(chol) = s_ii.cholesky() else {
                trace!(landmark = i, "skipping landmark with singular innovation covariance");
                continue;
            };
            for j in 0..n_measurements {
                let v = Self::innovation(z, z_pred, j, i);
                let nis = v.dot(&chol.solve(&v));
                if nis < individual_gate {
                    candidates.push(Candidate {
                        nis,
                        measurement: j,
                        landmark: i,
                    });
                }
            }
        }

        candidates.sort_by(|a, b| {
            a.nis
                .total_cmp(&b.nis)
                .then(a.measurement.cmp(&b.measurement))
                .then(a.landmark.cmp(&b.landmark))
        });

        // --- 2. Greedy one-to-one assignment ---
        let mut measurement_taken = vec![false; n_measurements];
        let mut landmark_taken = vec![false; n_landmarks];
        let mut accepted: Vec<Candidate> = Vec::new();
        for c in candidates {
            if measurement_taken[c.measurement] || landmark_taken[c.landmark] {
                continue;
            }
            measurement_taken[c.measurement] = true;
            landmark_taken[c.landmark] = true;
            accepted.push(c);
        }

        // --- 3. Joint compatibility ---
        // `accepted` is sorted by individual distance, so the worst pair is last.
        while !accepted.is_empty() {
            let joint_gate = chi2_gate(gating.joint, MEASUREMENT_DIM * accepted.len());
            match Self::joint_nis(&accepted, z, z_pred, s) {
                Some(nis) if nis < joint_gate => break,
                joint => {
                    let dropped = accepted.pop();
                    warn!(?joint, joint_gate, ?dropped, "joint compatibility failed, dropping worst pair");
                }
            }
        }

        let mut association = vec![None; n_measurements];
        for c in &accepted {
            association[c.measurement] = Some(c.landmark);
        }
        association
    }
}
