// ekfslam_core/tests/filter.rs

use approx::assert_abs_diff_eq;
use ekfslam_core::estimation::invariants;
use ekfslam_core::prelude::*;
use nalgebra::{DVector, Matrix3, Vector2, Vector3};

/// Noise-free range-bearing scan of `landmarks` from `pose`, in the given order.
fn scan(sensor: &RangeBearingModel, pose: &Pose, landmarks: &[Vector2<f64>]) -> DVector<f64> {
    DVector::from_iterator(
        2 * landmarks.len(),
        landmarks.iter().flat_map(|l| {
            let z = sensor.predict_point(pose, l);
            [z[0], z[1]]
        }),
    )
}

fn square_world() -> Vec<Vector2<f64>> {
    vec![
        Vector2::new(4.0, 4.0),
        Vector2::new(4.0, -4.0),
        Vector2::new(-4.0, 4.0),
        Vector2::new(-4.0, -4.0),
    ]
}

#[test]
fn driving_a_square_keeps_the_map_and_invariants() {
    let config = SlamConfig {
        sensor_offset: Vector2::new(0.2, 0.0),
        ..SlamConfig::default()
    };
    let ekf = EkfSlam::new(config.clone()).unwrap();
    let sensor = RangeBearingModel::new(config.sensor_offset, config.measurement_noise);
    let world = square_world();

    let mut truth = Pose::zeros();
    let mut state = SlamState::new(truth, Matrix3::from_diagonal(&Vector3::new(1e-4, 1e-4, 1e-5)));
    let odometry = Odometry::new(0.5, 0.0, std::f64::consts::FRAC_PI_8);

    for step in 0..32 {
        truth = OdometryModel.predict_pose(&truth, &odometry);
        state = ekf.predict(state, &odometry).unwrap();

        // Rotate the scan order every step so that order carries no identity.
        let mut seen = world.clone();
        seen.rotate_left(step % world.len());
        let outcome = ekf.update(state, &scan(&sensor, &truth, &seen)).unwrap();

        if step == 0 {
            assert!(outcome.association.iter().all(Option::is_none));
            assert_eq!(outcome.nis, Nis::NotApplicable);
        } else {
            assert!(outcome.association.iter().all(Option::is_some));
            assert!(outcome.nis.computed().is_some());
        }
        state = outcome.state;
        invariants::check_state("test", &state).unwrap();
    }

    assert_eq!(state.num_landmarks(), 4);
    assert_abs_diff_eq!(state.pose(), truth, epsilon = 1e-6);
    for (estimate, expected) in state.landmarks().zip(&world) {
        assert_abs_diff_eq!(estimate, *expected, epsilon = 1e-6);
    }
}

#[test]
fn map_uncertainty_shrinks_with_reobservation() {
    let ekf = EkfSlam::new(SlamConfig::default()).unwrap();
    let sensor = ekf.sensor();
    let world = square_world();

    let state = SlamState::new(Pose::zeros(), Matrix3::zeros());
    let z = DVector::from_iterator(
        8,
        world.iter().flat_map(|l| [l.norm(), l.y.atan2(l.x)]),
    );
    let mut state = ekf.update(state, &z).unwrap().state;
    let first = state.landmark_covariance(0).unwrap().trace();

    for _ in 0..5 {
        state = ekf.predict(state, &Odometry::zeros()).unwrap();
        let z_pred = sensor.predict_measurements(&state.eta);
        state = ekf.update(state, &z_pred).unwrap().state;
    }
    let last = state.landmark_covariance(0).unwrap().trace();
    assert!(last < first, "landmark covariance trace {first} -> {last}");
}

#[test]
fn empty_scan_after_mapping_changes_nothing() {
    let ekf = EkfSlam::new(SlamConfig::default()).unwrap();
    let state = SlamState::new(Pose::zeros(), Matrix3::identity() * 0.01);
    let state = ekf
        .update(state, &DVector::from_vec(vec![3.0, 0.5]))
        .unwrap()
        .state;

    let outcome = ekf.update(state.clone(), &DVector::zeros(0)).unwrap();
    assert_eq!(outcome.state, state);
    assert_eq!(outcome.nis, Nis::NotApplicable);
    assert_eq!(outcome.nis.value(), 1.0);
}

#[test]
fn nees_of_a_perfect_estimate_is_zero() {
    let pose = Pose::new(1.0, -2.0, 3.0);
    let result = nees(&pose, &(Matrix3::identity() * 0.1), &pose);
    assert_eq!(result.as_array(), [0.0, 0.0, 0.0]);
}
