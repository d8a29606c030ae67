// ekfslam_core/src/estimation/ekf_slam.rs

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::association::{
    matched_pairs, unmatched, validate_association, Association, Associator,
    GatedNearestNeighbor, KnownCorrespondence,
};
use crate::config::SlamConfig;
use crate::error::{Result, SlamError};
use crate::estimation::augment::add_landmarks;
use crate::estimation::invariants;
use crate::estimation::state::SlamState;
use crate::models::dynamics::odometry::OdometryModel;
use crate::models::dynamics::MotionModel;
use crate::models::measurement::range_bearing::RangeBearingModel;
use crate::models::measurement::LandmarkMeasurement;
use crate::types::{Odometry, Pose, MEASUREMENT_DIM, POSE_DIM};
use crate::utils::geometry::wrap_to_pi;

/// Normalized innovation squared of one update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Nis {
    /// `vᵀ·S⁻¹·v` over the matched measurements, chi² with `dof` degrees of freedom.
    Computed { value: f64, dof: usize },
    /// No correction happened (empty map, no measurements or no matches).
    NotApplicable,
}

impl Nis {
    /// Numeric value; `NotApplicable` reads as 1.0 and must not be treated as
    /// a chi² sample. Prefer `computed`.
    pub fn value(&self) -> f64 {
        match self {
            Nis::Computed { value, .. } => *value,
            Nis::NotApplicable => 1.0,
        }
    }

    /// `(value, dof)` when a correction happened.
    pub fn computed(&self) -> Option<(f64, usize)> {
        match self {
            Nis::Computed { value, dof } => Some((*value, *dof)),
            Nis::NotApplicable => None,
        }
    }
}

/// Result of `EkfSlam::update`.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub state: SlamState,
    pub nis: Nis,
    /// One entry per input measurement. `None` entries were appended as new
    /// landmarks, in measurement order.
    pub association: Association,
}

/// EKF-SLAM for a planar robot with odometry and a range-bearing sensor.
///
/// The filter itself is immutable: every step consumes a `SlamState` and
/// returns its successor, so one filter can drive any number of estimates.
#[derive(Debug)]
pub struct EkfSlam {
    config: SlamConfig,
    motion: Box<dyn MotionModel>,
    sensor: Box<dyn LandmarkMeasurement>,
    associator: Box<dyn Associator>,
}

impl EkfSlam {
    /// Builds a filter with the default associator: `GatedNearestNeighbor`
    /// when `do_association` is set, `KnownCorrespondence` otherwise.
    pub fn new(config: SlamConfig) -> Result<Self> {
        let associator: Box<dyn Associator> = if config.do_association {
            Box::new(GatedNearestNeighbor)
        } else {
            Box::new(KnownCorrespondence)
        };
        Self::with_associator(config, associator)
    }

    /// Builds a filter around a custom association strategy.
    pub fn with_associator(config: SlamConfig, associator: Box<dyn Associator>) -> Result<Self> {
        config.validate()?;
        let sensor = RangeBearingModel::new(config.sensor_offset, config.measurement_noise);
        Ok(Self {
            config,
            motion: Box::new(OdometryModel),
            sensor: Box::new(sensor),
            associator,
        })
    }

    pub fn config(&self) -> &SlamConfig {
        &self.config
    }

    pub fn motion_model(&self) -> &dyn MotionModel {
        self.motion.as_ref()
    }

    pub fn sensor(&self) -> &dyn LandmarkMeasurement {
        self.sensor.as_ref()
    }

    // =========================================================================
    // == Prediction ==
    // =========================================================================

    /// Propagates the estimate through one odometry increment.
    ///
    /// Only the robot rows and columns of `P` change:
    /// `P_rr ← Fx·P_rr·Fxᵀ + Fu·Q·Fuᵀ`, `P_rm ← Fx·P_rm`, `P_mr ← P_rmᵀ`.
    pub fn predict(&self, state: SlamState, odometry: &Odometry) -> Result<SlamState> {
        const CONTEXT: &str = "predict";
        self.check_input(CONTEXT, &state)?;

        let SlamState {
            mut eta,
            mut covariance,
        } = state;
        let n = eta.len();

        let pose = Pose::new(eta[0], eta[1], eta[2]);
        let f_x = self.motion.jacobian_pose(&pose, odometry);
        let f_u = self.motion.jacobian_control(&pose, odometry);

        // 1. Mean: only the pose moves.
        eta.fixed_rows_mut::<3>(0)
            .copy_from(&self.motion.predict_pose(&pose, odometry));

        // 2. Robot-robot block.
        let p_rr = covariance.fixed_view::<3, 3>(0, 0).into_owned();
        let mut p_rr = f_x * p_rr * f_x.transpose()
            + f_u * self.config.process_noise * f_u.transpose();
        p_rr = (p_rr + p_rr.transpose()) * 0.5;
        covariance.fixed_view_mut::<3, 3>(0, 0).copy_from(&p_rr);

        // 3. Robot-map cross blocks. The lower one is copied, not recomputed.
        let m = n - POSE_DIM;
        if m > 0 {
            let p_rm = f_x * covariance.view((0, POSE_DIM), (POSE_DIM, m));
            covariance.view_mut((0, POSE_DIM), (POSE_DIM, m)).copy_from(&p_rm);
            covariance
                .view_mut((POSE_DIM, 0), (m, POSE_DIM))
                .copy_from(&p_rm.transpose());
        }

        if self.config.check_invariants {
            invariants::check_symmetric(CONTEXT, &covariance)?;
            invariants::check_positive_definite(CONTEXT, &covariance)?;
        }

        Ok(SlamState::from_parts(eta, covariance))
    }

    // =========================================================================
    // == Correction ==
    // =========================================================================

    /// Fuses one scan of interleaved `[range, bearing]` measurements.
    ///
    /// Measurements the associator matches correct the estimate in Joseph
    /// form; the rest are appended as new landmarks afterwards.
    pub fn update(&self, state: SlamState, measurements: &DVector<f64>) -> Result<UpdateOutcome> {
        const CONTEXT: &str = "update";
        self.check_input(CONTEXT, &state)?;
        if measurements.len() % MEASUREMENT_DIM != 0 {
            return Err(SlamError::MalformedMeasurements {
                context: CONTEXT,
                len: measurements.len(),
            });
        }

        let n_measurements = measurements.len() / MEASUREMENT_DIM;
        if n_measurements == 0 {
            return Ok(UpdateOutcome {
                state,
                nis: Nis::NotApplicable,
                association: Vec::new(),
            });
        }

        let (state, nis, association) = if state.num_landmarks() == 0 {
            (state, Nis::NotApplicable, vec![None; n_measurements])
        } else {
            self.correct(state, measurements)?
        };

        // --- New landmarks ---
        let new = unmatched(&association);
        let z_new = DVector::from_iterator(
            MEASUREMENT_DIM * new.len(),
            new.iter().flat_map(|&j| {
                let row = MEASUREMENT_DIM * j;
                [measurements[row], measurements[row + 1]]
            }),
        );
        let state = add_landmarks(
            state,
            &z_new,
            self.sensor.as_ref(),
            self.config.check_invariants,
        )?;

        if self.config.check_invariants {
            invariants::check_state(CONTEXT, &state)?;
        }

        debug!(
            measurements = n_measurements,
            matched = n_measurements - new.len(),
            new_landmarks = new.len(),
            landmarks = state.num_landmarks(),
            nis = ?nis.computed(),
            "update complete"
        );

        Ok(UpdateOutcome {
            state,
            nis,
            association,
        })
    }

    /// Association and Joseph-form correction against the existing map.
    fn correct(
        &self,
        state: SlamState,
        z: &DVector<f64>,
    ) -> Result<(SlamState, Nis, Association)> {
        const CONTEXT: &str = "update";

        let n = state.dim();
        let n_measurements = z.len() / MEASUREMENT_DIM;
        let n_landmarks = state.num_landmarks();
        let r = self.sensor.noise_covariance();

        // 1. Predict every landmark and its innovation covariance.
        let z_pred = self.sensor.predict_measurements(&state.eta);
        let h = self.sensor.measurement_jacobian(&state.eta);
        let r_stack = DMatrix::<f64>::identity(n_landmarks, n_landmarks).kronecker(r);
        let s = &h * &state.covariance * h.transpose() + r_stack;

        // 2. Associate.
        let association = self
            .associator
            .associate(z, &z_pred, &s, &self.config.gating);
        validate_association(&association, n_measurements, n_landmarks)?;

        let pairs = matched_pairs(&association);
        if pairs.is_empty() {
            return Ok((state, Nis::NotApplicable, association));
        }

        // 3. Matched subsets: innovation, Jacobian rows and innovation covariance.
        let k = pairs.len();
        let m = MEASUREMENT_DIM * k;
        let mut v = DVector::zeros(m);
        let mut h_a = DMatrix::zeros(m, n);
        let mut s_a = DMatrix::zeros(m, m);
        for (a, &(j, i)) in pairs.iter().enumerate() {
            let row = MEASUREMENT_DIM * a;
            v[row] = z[MEASUREMENT_DIM * j] - z_pred[MEASUREMENT_DIM * i];
            v[row + 1] = wrap_to_pi(z[MEASUREMENT_DIM * j + 1] - z_pred[MEASUREMENT_DIM * i + 1]);
            h_a.rows_mut(row, MEASUREMENT_DIM)
                .copy_from(&h.rows(MEASUREMENT_DIM * i, MEASUREMENT_DIM));
            for (b, &(_, i_b)) in pairs.iter().enumerate() {
                s_a.fixed_view_mut::<2, 2>(row, MEASUREMENT_DIM * b)
                    .copy_from(&s.fixed_view::<2, 2>(MEASUREMENT_DIM * i, MEASUREMENT_DIM * i_b));
            }
        }
        invariants::symmetrize(&mut s_a);

        // 4. Gain W = P·H_aᵀ·S_a⁻¹, computed as (S_a⁻¹·H_a·P)ᵀ with P symmetric.
        let chol = s_a
            .cholesky()
            .ok_or(SlamError::SingularInnovation { context: CONTEXT })?;
        let h_a_p = &h_a * &state.covariance;
        let w = chol.solve(&h_a_p).transpose();
        let nis = v.dot(&chol.solve(&v));

        // 5. Mean.
        let mut eta = &state.eta + &w * &v;
        eta[2] = wrap_to_pi(eta[2]);

        // 6. Covariance, Joseph form.
        let r_a = DMatrix::<f64>::identity(k, k).kronecker(r);
        let i_wh = DMatrix::<f64>::identity(n, n) - &w * &h_a;
        let mut covariance =
            &i_wh * &state.covariance * i_wh.transpose() + &w * r_a * w.transpose();
        invariants::symmetrize(&mut covariance);
        if self.config.check_invariants {
            invariants::check_positive_definite(CONTEXT, &covariance)?;
        }

        Ok((
            SlamState::from_parts(eta, covariance),
            Nis::Computed { value: nis, dof: m },
            association,
        ))
    }

    /// Shapes are always checked; symmetry and PSD only when enabled.
    fn check_input(&self, context: &'static str, state: &SlamState) -> Result<()> {
        if self.config.check_invariants {
            invariants::check_state(context, state)
        } else {
            invariants::check_shape(context, state)
        }
    }
}
