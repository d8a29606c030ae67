// ekfslam_sim/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

use crate::config::ScenarioConfig;

/// ekfslam_sim: runs EKF-SLAM against a synthetic landmark world.
///
/// This struct defines the command-line arguments of the simulation binary.
/// Options given here override the matching values of the scenario file.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(
        short,
        long,
        default_value = "assets/scenarios/simulated_landmarks.toml"
    )]
    pub scenario: PathBuf,

    /// Number of predict/update steps.
    #[arg(long)]
    pub steps: Option<usize>,

    /// Seed for the simulation's random number generator.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the resolved scenario as TOML and exit.
    #[arg(long, default_value_t = false)]
    pub print_config: bool,
}

impl Cli {
    pub fn apply_overrides(&self, config: &mut ScenarioConfig) {
        if let Some(steps) = self.steps {
            config.simulation.steps = steps;
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = Some(seed);
        }
    }
}
