// ekfslam_core/src/utils/mod.rs

pub mod geometry;
pub mod stats;
