// ekfslam_core/src/estimation/augment.rs

use nalgebra::{DMatrix, DVector, Vector2};
use tracing::debug;

use crate::error::{Result, SlamError};
use crate::estimation::invariants;
use crate::estimation::state::SlamState;
use crate::models::measurement::LandmarkMeasurement;
use crate::types::{MEASUREMENT_DIM, POSE_DIM};

/// Appends one landmark per `[range, bearing]` pair in `z_new` to the state.
///
/// Landmark positions come from the sensor's inverse model at the current pose
/// estimate. The covariance grows as
///
/// ```text
/// P' = | P              P[:, 0:3]·Gxᵀ                       |
///      | Gx·P[0:3, :]   Gx·P_rr·Gxᵀ + blkdiag(Gz·R·Gzᵀ)     |
/// ```
///
/// where `Gx` stacks every new landmark's pose Jacobian. The old `P` is copied
/// unchanged into the top-left block and the lower-left block is the exact
/// transpose of the upper-right one.
pub fn add_landmarks(
    state: SlamState,
    z_new: &DVector<f64>,
    sensor: &dyn LandmarkMeasurement,
    check_invariants: bool,
) -> Result<SlamState> {
    const CONTEXT: &str = "add_landmarks";

    if z_new.len() % MEASUREMENT_DIM != 0 {
        return Err(SlamError::MalformedMeasurements {
            context: CONTEXT,
            len: z_new.len(),
        });
    }
    let n_new = z_new.len() / MEASUREMENT_DIM;
    if n_new == 0 {
        return Ok(state);
    }

    let n = state.dim();
    let m = z_new.len();
    let pose = state.pose();
    let r_matrix = sensor.noise_covariance();

    let mut landmarks = DVector::zeros(m);
    let mut g_x = DMatrix::zeros(m, POSE_DIM);
    let mut r_world = DMatrix::zeros(m, m);

    for j in 0..n_new {
        let row = MEASUREMENT_DIM * j;
        let z = Vector2::new(z_new[row], z_new[row + 1]);
        let init = sensor.initialize_landmark(&pose, &z);

        landmarks.fixed_rows_mut::<2>(row).copy_from(&init.position);
        g_x.fixed_view_mut::<2, 3>(row, 0).copy_from(&init.g_x);
        r_world
            .fixed_view_mut::<2, 2>(row, row)
            .copy_from(&(init.g_z * r_matrix * init.g_z.transpose()));
    }

    // --- Mean ---
    let mut eta = DVector::zeros(n + m);
    eta.rows_mut(0, n).copy_from(&state.eta);
    eta.rows_mut(n, m).copy_from(&landmarks);

    // --- Covariance ---
    let p = &state.covariance;
    let cross = p.columns(0, POSE_DIM) * g_x.transpose();
    let mut new_block = &g_x * p.view((0, 0), (POSE_DIM, POSE_DIM)) * g_x.transpose() + r_world;
    invariants::symmetrize(&mut new_block);

    let mut covariance = DMatrix::zeros(n + m, n + m);
    covariance.view_mut((0, 0), (n, n)).copy_from(p);
    covariance.view_mut((0, n), (n, m)).copy_from(&cross);
    covariance.view_mut((n, 0), (m, n)).copy_from(&cross.transpose());
    covariance.view_mut((n, n), (m, m)).copy_from(&new_block);

    if check_invariants {
        invariants::check_symmetric(CONTEXT, &covariance)?;
        invariants::check_positive_semi_definite(CONTEXT, &covariance)?;
    }

    debug!(
        added = n_new,
        total = (n + m - POSE_DIM) / 2,
        "appended landmarks to the map"
    );

    Ok(SlamState::from_parts(eta, covariance))
}
