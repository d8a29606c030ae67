// ekfslam_core/src/estimation/mod.rs

pub mod augment;
pub mod consistency;
pub mod ekf_slam;
pub mod invariants;
pub mod state;

pub use consistency::{nees, nis, Nees, NEES_FALLBACK};
pub use ekf_slam::{EkfSlam, Nis, UpdateOutcome};
pub use state::SlamState;
