// ekfslam_sim/src/error.rs

use std::path::PathBuf;

use ekfslam_core::SlamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("scenario file not found: {}", .0.display())]
    ScenarioNotFound(PathBuf),

    #[error("failed to load scenario: {0}")]
    Config(#[from] figment::Error),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("failed to render scenario as TOML: {0}")]
    Render(#[from] toml::ser::Error),

    #[error(transparent)]
    Slam(#[from] SlamError),
}

pub type Result<T> = std::result::Result<T, SimError>;
