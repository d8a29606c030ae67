// ekfslam_sim/src/world.rs

use std::f64::consts::TAU;

use ekfslam_core::models::dynamics::odometry::OdometryModel;
use ekfslam_core::models::dynamics::MotionModel;
use ekfslam_core::models::measurement::range_bearing::RangeBearingModel;
use ekfslam_core::types::{Odometry, Pose};
use ekfslam_core::utils::geometry::wrap_to_pi;
use nalgebra::{DMatrix, DVector, Vector2};

use crate::config::{LandmarkLayout, ScenarioConfig};
use crate::prng::{GaussianNoise, SimulationRng};

/// Everything the world produces in one step.
#[derive(Debug, Clone)]
pub struct WorldStep {
    /// Ground-truth pose after the motion.
    pub true_pose: Pose,
    /// Noisy odometry reading of the motion.
    pub odometry: Odometry,
    /// Interleaved `[range, bearing]` detections in random order.
    pub measurements: DVector<f64>,
    /// Ground-truth landmark index of each detection.
    pub landmark_ids: Vec<usize>,
}

/// Ground truth for a simulated run: a landmark field and a robot driving it
/// with constant commanded odometry.
#[derive(Debug, Clone)]
pub struct SyntheticWorld {
    landmarks: Vec<Vector2<f64>>,
    pose: Pose,
    commanded: Odometry,
    motion: OdometryModel,
    sensor: RangeBearingModel,
    max_range: f64,
    odometry_noise: GaussianNoise,
    measurement_noise: GaussianNoise,
}

impl SyntheticWorld {
    pub fn new(config: &ScenarioConfig, rng: &mut SimulationRng) -> Self {
        let landmarks = place_landmarks(&config.world.landmarks, rng);

        let q = config.motion.noise.unwrap_or(config.filter.process_noise);
        let r = config.sensor.noise.unwrap_or(config.filter.measurement_noise);

        Self {
            landmarks,
            pose: Pose::from(config.motion.initial_pose),
            commanded: Odometry::from(config.motion.commanded),
            motion: OdometryModel,
            sensor: RangeBearingModel::new(config.filter.sensor_offset, r),
            max_range: config.sensor.max_range,
            odometry_noise: GaussianNoise::new(DMatrix::from_column_slice(3, 3, q.as_slice())),
            measurement_noise: GaussianNoise::new(DMatrix::from_column_slice(2, 2, r.as_slice())),
        }
    }

    pub fn landmarks(&self) -> &[Vector2<f64>] {
        &self.landmarks
    }

    pub fn true_pose(&self) -> Pose {
        self.pose
    }

    /// Moves the robot by the commanded odometry and observes the landmarks
    /// within range.
    pub fn step(&mut self, rng: &mut SimulationRng) -> WorldStep {
        self.pose = self.motion.predict_pose(&self.pose, &self.commanded);

        let noise = self.odometry_noise.sample(rng);
        let odometry = self.commanded + Odometry::new(noise[0], noise[1], noise[2]);

        let (measurements, landmark_ids) = self.observe(rng);
        WorldStep {
            true_pose: self.pose,
            odometry,
            measurements,
            landmark_ids,
        }
    }

    /// Noisy detections of every landmark within `max_range` of the sensor,
    /// shuffled so that their order carries no identity.
    pub fn observe(&self, rng: &mut SimulationRng) -> (DVector<f64>, Vec<usize>) {
        let mut detections: Vec<(usize, Vector2<f64>)> = self
            .landmarks
            .iter()
            .enumerate()
            .filter_map(|(id, landmark)| {
                let z = self.sensor.predict_point(&self.pose, landmark);
                (z[0] <= self.max_range).then_some((id, z))
            })
            .collect();

        for (_, z) in detections.iter_mut() {
            let noise = self.measurement_noise.sample(rng);
            z[0] = (z[0] + noise[0]).abs();
            z[1] = wrap_to_pi(z[1] + noise[1]);
        }
        rng.shuffle(&mut detections);

        let measurements = DVector::from_iterator(
            2 * detections.len(),
            detections.iter().flat_map(|(_, z)| [z[0], z[1]]),
        );
        let ids = detections.iter().map(|(id, _)| *id).collect();
        (measurements, ids)
    }
}

fn place_landmarks(layout: &LandmarkLayout, rng: &mut SimulationRng) -> Vec<Vector2<f64>> {
    match layout {
        LandmarkLayout::Ring {
            count,
            radius,
            center,
        } => (0..*count)
            .map(|k| {
                let angle = TAU * k as f64 / *count as f64;
                Vector2::new(center[0] + radius * angle.cos(), center[1] + radius * angle.sin())
            })
            .collect(),
        LandmarkLayout::Uniform { count, min, max } => (0..*count)
            .map(|_| Vector2::new(rng.uniform(min[0], max[0]), rng.uniform(min[1], max[1])))
            .collect(),
        LandmarkLayout::Fixed { positions } => {
            positions.iter().map(|p| Vector2::new(p[0], p[1])).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SensorConfig, WorldConfig};
    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix2, Matrix3};

    fn noiseless_scenario(positions: Vec<[f64; 2]>) -> ScenarioConfig {
        let mut config = ScenarioConfig {
            world: WorldConfig {
                landmarks: LandmarkLayout::Fixed { positions },
            },
            sensor: SensorConfig {
                max_range: 10.0,
                noise: Some(Matrix2::zeros()),
            },
            ..ScenarioConfig::default()
        };
        config.motion.noise = Some(Matrix3::zeros());
        config.motion.commanded = [1.0, 0.0, 0.0];
        config
    }

    #[test]
    fn ring_layout_is_evenly_spaced() {
        let mut rng = SimulationRng::from_seed(0);
        let layout = LandmarkLayout::Ring {
            count: 4,
            radius: 2.0,
            center: [1.0, 1.0],
        };
        let landmarks = place_landmarks(&layout, &mut rng);
        assert_eq!(landmarks.len(), 4);
        assert_abs_diff_eq!(landmarks[0], Vector2::new(3.0, 1.0), epsilon = 1e-12);
        assert_abs_diff_eq!(landmarks[1], Vector2::new(1.0, 3.0), epsilon = 1e-12);
    }

    #[test]
    fn uniform_layout_stays_in_box() {
        let mut rng = SimulationRng::from_seed(5);
        let layout = LandmarkLayout::Uniform {
            count: 50,
            min: [-2.0, 0.0],
            max: [2.0, 1.0],
        };
        for l in place_landmarks(&layout, &mut rng) {
            assert!((-2.0..2.0).contains(&l.x) && (0.0..1.0).contains(&l.y));
        }
    }

    #[test]
    fn noiseless_step_follows_command_and_sees_in_range() {
        let config = noiseless_scenario(vec![[4.0, 0.0], [30.0, 0.0]]);
        let mut rng = SimulationRng::from_seed(1);
        let mut world = SyntheticWorld::new(&config, &mut rng);

        let step = world.step(&mut rng);
        assert_abs_diff_eq!(step.true_pose, Pose::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(step.odometry, Odometry::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_eq!(step.landmark_ids, vec![0]);
        assert_abs_diff_eq!(step.measurements[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(step.measurements[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn detections_are_shuffled_with_ids() {
        let positions: Vec<[f64; 2]> = (0..8).map(|k| [2.0 + k as f64 * 0.5, 1.0]).collect();
        let config = noiseless_scenario(positions);
        let mut rng = SimulationRng::from_seed(9);
        let world = SyntheticWorld::new(&config, &mut rng);

        let (z, ids) = world.observe(&mut rng);
        assert_eq!(z.len(), 2 * ids.len());
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..8).collect::<Vec<_>>());
        for (k, id) in ids.iter().enumerate() {
            let expected = world.sensor.predict_point(&world.pose, &world.landmarks[*id]);
            assert_abs_diff_eq!(z[2 * k], expected[0], epsilon = 1e-12);
        }
    }
}
