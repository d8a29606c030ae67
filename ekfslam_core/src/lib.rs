// ekfslam_core/src/lib.rs

//! Pure EKF-SLAM estimator for a planar robot observing point landmarks with a
//! range-bearing sensor. Nothing in this crate performs I/O: the caller owns the
//! `SlamState` and hands it to `EkfSlam::predict` / `EkfSlam::update` each step.

pub mod association;
pub mod config;
pub mod error;
pub mod estimation;
pub mod models;
pub mod prelude;
pub mod types;
pub mod utils;

pub use error::{Result, SlamError};
