// ekfslam_core/src/association/known.rs

use nalgebra::{DMatrix, DVector};

use crate::association::{Association, Associator};
use crate::config::GatingThresholds;
use crate::types::MEASUREMENT_DIM;

/// Association for sensors that already report landmark identities.
///
/// Measurement `j` belongs to landmark `j`; measurements beyond the current
/// map size are new landmarks. Used when `SlamConfig::do_association` is off.
#[derive(Debug, Clone, Copy, Default)]
pub struct KnownCorrespondence;

impl Associator for KnownCorrespondence {
    fn associate(
        &self,
        z: &DVector<f64>,
        z_pred: &DVector<f64>,
        _s: &DMatrix<f64>,
        _gating: &GatingThresholds,
    ) -> Association {
        let n_landmarks = z_pred.len() / MEASUREMENT_DIM;
        (0..z.len() / MEASUREMENT_DIM)
            .map(|j| (j < n_landmarks).then_some(j))
            .collect()
    }
}
