// ekfslam_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::association::{Association, Associator};
pub use crate::models::dynamics::MotionModel;
pub use crate::models::measurement::LandmarkMeasurement;

// --- Core Data Structures ---
pub use crate::config::{GatingThresholds, SlamConfig};
pub use crate::error::{Result, SlamError};
pub use crate::estimation::state::SlamState;
pub use crate::types::{Odometry, Pose};

// --- Estimation Algorithms ---
pub use crate::estimation::augment::add_landmarks;
pub use crate::estimation::consistency::{nees, nis, Nees, NEES_FALLBACK};
pub use crate::estimation::ekf_slam::{EkfSlam, Nis, UpdateOutcome};

// --- Concrete Implementations (Export common ones for convenience) ---
pub use crate::association::{GatedNearestNeighbor, KnownCorrespondence};
pub use crate::models::dynamics::odometry::OdometryModel;
pub use crate::models::measurement::range_bearing::RangeBearingModel;
pub use crate::utils::geometry::{rotation_matrix_2d, wrap_to_pi};
