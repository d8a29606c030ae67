// ekfslam_core/src/association/mod.rs

use dyn_clone::DynClone;
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

use crate::config::GatingThresholds;
use crate::error::{Result, SlamError};

/// One entry per measurement: `Some(i)` pairs it with existing landmark `i`,
/// `None` marks it as a candidate for a new landmark.
pub type Association = Vec<Option<usize>>;

// --- The Associator Trait ("Contract") ---
/// The contract for any data-association strategy plugged into `EkfSlam`.
///
/// Implementations receive the raw measurements `z` and the predictions
/// `z_pred` of every known landmark (both interleaved `[range, bearing]`), and
/// the innovation covariance `s` of `z_pred`. They must return exactly one
/// entry per measurement, never claim a landmark twice, and be deterministic
/// for identical inputs. Leaving measurements unmatched is always allowed.
pub trait Associator: DynClone + Debug + Send + Sync {
    fn associate(
        &self,
        z: &DVector<f64>,
        z_pred: &DVector<f64>,
        s: &DMatrix<f64>,
        gating: &GatingThresholds,
    ) -> Association;
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn Associator>`.
dyn_clone::clone_trait_object!(Associator);

/// Checks an associator's output against the contract above.
pub fn validate_association(
    association: &Association,
    n_measurements: usize,
    n_landmarks: usize,
) -> Result<()> {
    if association.len() != n_measurements {
        return Err(SlamError::InvalidAssociation(format!(
            "expected {n_measurements} entries, got {}",
            association.len()
        )));
    }

    let mut claimed = vec![false; n_landmarks];
    for (j, entry) in association.iter().enumerate() {
        let Some(i) = *entry else { continue };
        if i >= n_landmarks {
            return Err(SlamError::InvalidAssociation(format!(
                "measurement {j} points at landmark {i}, but only {n_landmarks} exist"
            )));
        }
        if claimed[i] {
            return Err(SlamError::InvalidAssociation(format!(
                "landmark {i} is claimed by more than one measurement"
            )));
        }
        claimed[i] = true;
    }
    Ok(())
}

/// `(measurement, landmark)` pairs of every matched entry, in measurement order.
pub fn matched_pairs(association: &Association) -> Vec<(usize, usize)> {
    association
        .iter()
        .enumerate()
        .filter_map(|(j, entry)| entry.map(|i| (j, i)))
        .collect()
}

/// Indices of the measurements left unmatched.
pub fn unmatched(association: &Association) -> Vec<usize> {
    association
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.is_none())
        .map(|(j, _)| j)
        .collect()
}

// --- Implementations ---
mod known;
mod nearest_neighbor;

pub use known::KnownCorrespondence;
pub use nearest_neighbor::GatedNearestNeighbor;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_partial_matches() {
        let a = vec![Some(1), None, Some(0)];
        assert!(validate_association(&a, 3, 2).is_ok());
        assert_eq!(matched_pairs(&a), vec![(0, 1), (2, 0)]);
        assert_eq!(unmatched(&a), vec![1]);
    }

    #[test]
    fn rejects_duplicates() {
        let a = vec![Some(1), Some(1)];
        assert!(matches!(
            validate_association(&a, 2, 3),
            Err(SlamError::InvalidAssociation(_))
        ));
    }

    #[test]
    fn rejects_wrong_length_and_out_of_range() {
        assert!(validate_association(&vec![None], 2, 3).is_err());
        assert!(validate_association(&vec![Some(3)], 1, 3).is_err());
    }
}
