// ekfslam_sim/src/lib.rs

//! Synthetic-world harness for `ekfslam_core`: scenario loading, ground-truth
//! generation, the predict/update driver loop and consistency reporting.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod prng;
pub mod runner;
pub mod world;

pub use error::{Result, SimError};
pub use runner::{RunSummary, Simulation};
