// ekfslam_sim/src/config.rs

use std::path::Path;

use ekfslam_core::config::SlamConfig;
use figment::{
    providers::{Format, Toml},
    Figment,
};
use nalgebra::{Matrix2, Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # ScenarioConfig
/// Everything needed to run one simulated EKF-SLAM experiment.
/// This struct is the root of the data parsed from a `scenario.toml` file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    /// The filter under test.
    #[serde(default)]
    pub filter: SlamConfig,

    #[serde(default)]
    pub world: WorldConfig,

    #[serde(default)]
    pub motion: MotionConfig,

    #[serde(default)]
    pub sensor: SensorConfig,

    #[serde(default)] // Use default if the [simulation] section is missing
    pub simulation: SimulationSettings,
}

impl ScenarioConfig {
    /// Loads and validates a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        // `Toml::file` silently yields nothing for a missing file.
        if !path.is_file() {
            return Err(SimError::ScenarioNotFound(path.to_path_buf()));
        }
        let config: Self = Figment::new().merge(Toml::file(path)).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a scenario held in memory.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = Figment::new().merge(Toml::string(source)).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// The fully resolved scenario, defaults included.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.filter.validate()?;

        match &self.world.landmarks {
            LandmarkLayout::Ring { count, radius, .. } => {
                if *count == 0 || !(*radius > 0.0) {
                    return Err(invalid("ring layout needs count > 0 and radius > 0"));
                }
            }
            LandmarkLayout::Uniform { count, min, max } => {
                if *count == 0 || !(min[0] < max[0] && min[1] < max[1]) {
                    return Err(invalid("uniform layout needs count > 0 and min < max"));
                }
            }
            LandmarkLayout::Fixed { positions } => {
                if positions.iter().flatten().any(|v| !v.is_finite()) {
                    return Err(invalid("fixed landmark positions must be finite"));
                }
            }
        }

        if !(self.sensor.max_range > 0.0) {
            return Err(invalid("sensor.max_range must be positive"));
        }
        for (name, matrix) in [
            ("motion.noise", self.motion.noise.map(|m| m.as_slice().to_vec())),
            ("sensor.noise", self.sensor.noise.map(|m| m.as_slice().to_vec())),
        ] {
            if matrix.is_some_and(|m| m.iter().any(|v| !v.is_finite())) {
                return Err(invalid(&format!("{name} must be finite")));
            }
        }
        if self.motion.initial_std.iter().any(|s| !(*s >= 0.0)) {
            return Err(invalid("motion.initial_std must be non-negative"));
        }

        if self.simulation.steps == 0 {
            return Err(invalid("simulation.steps must be at least 1"));
        }
        let confidence = self.simulation.confidence;
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(invalid("simulation.confidence must be in (0, 1)"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> SimError {
    SimError::InvalidScenario(message.to_string())
}

// =========================================================================
// == Configuration Sub-Structs ==
// These map directly to the sections in the scenario.toml file.
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    pub landmarks: LandmarkLayout,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            landmarks: LandmarkLayout::Ring {
                count: 24,
                radius: 25.0,
                center: [0.0, 20.0],
            },
        }
    }
}

/// How the ground-truth landmarks are placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout")] // `layout = "..."` picks the variant
#[serde(rename_all = "snake_case")]
pub enum LandmarkLayout {
    /// Evenly spaced on a circle.
    Ring {
        count: usize,
        radius: f64,
        center: [f64; 2],
    },
    /// Uniformly at random inside an axis-aligned box.
    Uniform {
        count: usize,
        min: [f64; 2],
        max: [f64; 2],
    },
    Fixed { positions: Vec<[f64; 2]> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MotionConfig {
    /// True starting pose `[x, y, heading]`.
    pub initial_pose: [f64; 3],
    /// Standard deviations of the initial pose belief.
    pub initial_std: [f64; 3],
    /// Odometry commanded at every step, `[forward, lateral, heading_increment]`.
    pub commanded: [f64; 3],
    /// Covariance the odometry readings are perturbed with. Defaults to the
    /// filter's `process_noise`.
    pub noise: Option<Matrix3<f64>>,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            initial_pose: [0.0, 0.0, 0.0],
            initial_std: [0.0, 0.0, 0.0],
            commanded: [1.0, 0.0, 0.05],
            noise: None,
        }
    }
}

impl MotionConfig {
    pub fn initial_covariance(&self) -> Matrix3<f64> {
        Matrix3::from_diagonal(&Vector3::from(self.initial_std).map(|s| s * s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorConfig {
    /// Landmarks further away than this are not detected.
    pub max_range: f64,
    /// Covariance the detections are perturbed with. Defaults to the filter's
    /// `measurement_noise`.
    pub noise: Option<Matrix2<f64>>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            max_range: 10.0,
            noise: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSettings {
    /// Number of predict/update cycles.
    pub steps: usize,
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// Confidence level of the chi² consistency bands.
    pub confidence: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            steps: 250,
            seed: None,
            confidence: 0.95,
        }
    }
}
