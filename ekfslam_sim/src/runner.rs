// ekfslam_sim/src/runner.rs

use ekfslam_core::prelude::*;
use ekfslam_core::utils::stats::chi2_interval;
use tracing::{debug, error, info};

use crate::config::ScenarioConfig;
use crate::error::Result;
use crate::prng::SimulationRng;
use crate::world::SyntheticWorld;

/// Per-step diagnostics.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: usize,
    pub nees: Nees,
    pub nis: Nis,
    /// Euclidean distance between estimated and true position.
    pub position_error: f64,
    pub num_landmarks: usize,
}

/// Averages over a run, with the fraction of samples inside the two-sided
/// chi² band at the configured confidence. NEES components that fell back
/// and steps without a NIS are left out.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencySummary {
    /// Average NEES, `[all, position, heading]`.
    pub anees: [Option<f64>; 3],
    /// Fraction of NEES samples inside their band, `[all, position, heading]`.
    pub nees_inside: [Option<f64>; 3],
    /// Number of NEES samples behind each average.
    pub nees_samples: [usize; 3],
    /// Average NIS over the steps that produced one.
    pub anis: Option<f64>,
    pub nis_inside: Option<f64>,
    pub confidence: f64,
}

/// Mean of `samples` and the fraction inside the band of each sample's dof.
fn band_statistics(samples: &[(f64, usize)], confidence: f64) -> (Option<f64>, Option<f64>) {
    if samples.is_empty() {
        return (None, None);
    }
    let m = samples.len() as f64;
    let mean = samples.iter().map(|(value, _)| value).sum::<f64>() / m;
    let inside = samples
        .iter()
        .filter(|(value, dof)| {
            let (low, high) = chi2_interval(*dof, confidence);
            (low..=high).contains(value)
        })
        .count() as f64
        / m;
    (Some(mean), Some(inside))
}

impl ConsistencySummary {
    pub fn from_records(records: &[StepRecord], confidence: f64) -> Self {
        let mut anees = [None; 3];
        let mut nees_inside = [None; 3];
        let mut nees_samples = [0; 3];
        for (k, dof) in Nees::DOF.into_iter().enumerate() {
            let samples: Vec<(f64, usize)> = records
                .iter()
                .filter_map(|r| r.nees.computed()[k])
                .map(|value| (value, dof))
                .collect();
            nees_samples[k] = samples.len();
            (anees[k], nees_inside[k]) = band_statistics(&samples, confidence);
        }

        let nis: Vec<(f64, usize)> = records.iter().filter_map(|r| r.nis.computed()).collect();
        let (anis, nis_inside) = band_statistics(&nis, confidence);

        Self {
            anees,
            nees_inside,
            nees_samples,
            anis,
            nis_inside,
            confidence,
        }
    }
}

/// Outcome of a run. A run that hit a fatal filter error still reports what
/// it had up to that point.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub seed: u64,
    pub steps_requested: usize,
    pub steps_completed: usize,
    pub final_state: SlamState,
    pub final_true_pose: Pose,
    pub records: Vec<StepRecord>,
    pub consistency: ConsistencySummary,
    /// RMS distance between each estimated landmark and the true landmark it
    /// was created from.
    pub map_rms_error: Option<f64>,
    pub error: Option<SlamError>,
}

/// Drives `EkfSlam` through a synthetic world, one predict/update per step.
#[derive(Debug)]
pub struct Simulation {
    filter: EkfSlam,
    world: SyntheticWorld,
    rng: SimulationRng,
    seed: u64,
    state: SlamState,
    /// Ground-truth id of each estimated landmark, in state order.
    landmark_truth: Vec<usize>,
    steps: usize,
    confidence: f64,
}

impl Simulation {
    pub fn new(config: &ScenarioConfig) -> Result<Self> {
        config.validate()?;

        let seed = config.simulation.seed.unwrap_or_else(rand::random);
        let mut rng = SimulationRng::from_seed(seed);
        let world = SyntheticWorld::new(config, &mut rng);
        let filter = EkfSlam::new(config.filter.clone())?;

        // The filter starts from the true pose with the configured uncertainty.
        let state = SlamState::new(world.true_pose(), config.motion.initial_covariance());

        info!(
            seed,
            landmarks = world.landmarks().len(),
            steps = config.simulation.steps,
            "simulation ready"
        );

        Ok(Self {
            filter,
            world,
            rng,
            seed,
            state,
            landmark_truth: Vec::new(),
            steps: config.simulation.steps,
            confidence: config.simulation.confidence,
        })
    }

    pub fn state(&self) -> &SlamState {
        &self.state
    }

    pub fn world(&self) -> &SyntheticWorld {
        &self.world
    }

    /// Runs one predict/update cycle and returns its diagnostics.
    pub fn step(&mut self, step: usize) -> std::result::Result<StepRecord, SlamError> {
        let data = self.world.step(&mut self.rng);

        let predicted = self.filter.predict(self.state.clone(), &data.odometry)?;
        let outcome = self.filter.update(predicted, &data.measurements)?;

        for (j, entry) in outcome.association.iter().enumerate() {
            if entry.is_none() {
                self.landmark_truth.push(data.landmark_ids[j]);
            }
        }
        self.state = outcome.state;

        let estimate = self.state.pose();
        let record = StepRecord {
            step,
            nees: nees(&estimate, &self.state.pose_covariance(), &data.true_pose),
            nis: outcome.nis,
            position_error: (estimate.xy() - data.true_pose.xy()).norm(),
            num_landmarks: self.state.num_landmarks(),
        };

        debug!(
            step,
            nees = ?record.nees.all,
            position_error = record.position_error,
            landmarks = record.num_landmarks,
            "step complete"
        );
        Ok(record)
    }

    /// Runs every configured step, stopping at the first fatal error.
    pub fn run(mut self) -> RunSummary {
        let mut records = Vec::with_capacity(self.steps);
        let mut failure = None;

        for step in 0..self.steps {
            match self.step(step) {
                Ok(record) => records.push(record),
                Err(err) => {
                    error!(step, %err, "filter failed, stopping run");
                    failure = Some(err);
                    break;
                }
            }
        }

        let consistency = ConsistencySummary::from_records(&records, self.confidence);
        RunSummary {
            seed: self.seed,
            steps_requested: self.steps,
            steps_completed: records.len(),
            map_rms_error: self.map_rms_error(),
            final_state: self.state,
            final_true_pose: self.world.true_pose(),
            records,
            consistency,
            error: failure,
        }
    }

    fn map_rms_error(&self) -> Option<f64> {
        if self.landmark_truth.is_empty() {
            return None;
        }
        let truth = self.world.landmarks();
        let sum: f64 = self
            .state
            .landmarks()
            .zip(&self.landmark_truth)
            .map(|(estimate, &id)| (estimate - truth[id]).norm_squared())
            .sum();
        Some((sum / self.landmark_truth.len() as f64).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LandmarkLayout, SensorConfig, WorldConfig};
    use nalgebra::{Matrix2, Matrix3};

    fn record(nees: [Option<f64>; 3], nis: Nis) -> StepRecord {
        StepRecord {
            step: 0,
            nees: Nees {
                all: nees[0],
                position: nees[1],
                heading: nees[2],
            },
            nis,
            position_error: 0.0,
            num_landmarks: 0,
        }
    }

    #[test]
    fn summary_averages_and_counts_band_hits() {
        let records = vec![
            record([Some(3.0), Some(2.0), Some(1.0)], Nis::Computed { value: 2.0, dof: 2 }),
            record([Some(100.0), Some(2.0), Some(1.0)], Nis::NotApplicable),
        ];
        let summary = ConsistencySummary::from_records(&records, 0.95);
        assert_eq!(summary.anees, [Some(51.5), Some(2.0), Some(1.0)]);
        assert_eq!(summary.nees_inside, [Some(0.5), Some(1.0), Some(1.0)]);
        assert_eq!(summary.nees_samples, [2, 2, 2]);
        assert_eq!(summary.anis, Some(2.0));
        assert_eq!(summary.nis_inside, Some(1.0));
    }

    #[test]
    fn summary_without_nis() {
        let summary = ConsistencySummary::from_records(&[record([Some(1.0); 3], Nis::NotApplicable)], 0.95);
        assert_eq!(summary.anis, None);
        assert_eq!(summary.nis_inside, None);
    }

    #[test]
    fn fallback_nees_components_are_not_averaged() {
        // 50 lies outside every band, 1.0 is the fallback reading.
        let records = vec![
            record([Some(50.0), Some(50.0), None], Nis::NotApplicable),
            record([None, Some(2.0), None], Nis::NotApplicable),
        ];
        let summary = ConsistencySummary::from_records(&records, 0.95);
        assert_eq!(summary.anees, [Some(50.0), Some(26.0), None]);
        assert_eq!(summary.nees_inside, [Some(0.0), Some(0.5), None]);
        assert_eq!(summary.nees_samples, [1, 2, 0]);
    }

    #[test]
    fn noiseless_run_tracks_truth_exactly() {
        let mut config = ScenarioConfig {
            world: WorldConfig {
                landmarks: LandmarkLayout::Fixed {
                    positions: vec![[3.0, 2.0], [6.0, -2.0], [9.0, 1.5]],
                },
            },
            sensor: SensorConfig {
                max_range: 15.0,
                noise: Some(Matrix2::zeros()),
            },
            ..ScenarioConfig::default()
        };
        config.motion.noise = Some(Matrix3::zeros());
        config.motion.commanded = [0.5, 0.0, 0.0];
        config.simulation.steps = 10;
        config.simulation.seed = Some(11);

        let summary = Simulation::new(&config).unwrap().run();
        assert!(summary.error.is_none());
        assert_eq!(summary.steps_completed, 10);
        assert_eq!(summary.final_state.num_landmarks(), 3);
        assert!(summary.records.iter().all(|r| r.position_error < 1e-9));
        assert!(summary.map_rms_error.unwrap() < 1e-9);
    }
}
