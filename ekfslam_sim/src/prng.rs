// ekfslam_sim/src/prng.rs

use nalgebra::{DMatrix, DVector};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{StandardNormal, Uniform};

/// A newtype wrapper around `ChaCha8Rng`.
/// This is the central, deterministic pseudo-random number generator for the simulation.
#[derive(Debug, Clone)]
pub struct SimulationRng(pub ChaCha8Rng);

impl SimulationRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn standard_normal(&mut self) -> f64 {
        self.0.sample(StandardNormal)
    }

    /// Uniform sample in `[low, high)`.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        self.0.sample(Uniform::new(low, high))
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.0);
    }
}

/// Zero-mean Gaussian noise with a fixed covariance.
///
/// Samples are `L·n` with `n ~ N(0, I)` and `L·Lᵀ = Σ`. `L` is the Cholesky
/// factor when `Σ` is positive definite; singular (e.g. noise-free) axes fall
/// back to the eigen decomposition so a PSD `Σ` is always accepted.
#[derive(Debug, Clone)]
pub struct GaussianNoise {
    factor: DMatrix<f64>,
}

impl GaussianNoise {
    pub fn new(covariance: DMatrix<f64>) -> Self {
        let factor = match covariance.clone().cholesky() {
            Some(chol) => chol.l(),
            None => {
                let eigen = covariance.symmetric_eigen();
                let sqrt = eigen.eigenvalues.map(|l| l.max(0.0).sqrt());
                eigen.eigenvectors * DMatrix::from_diagonal(&sqrt)
            }
        };
        Self { factor }
    }

    pub fn dim(&self) -> usize {
        self.factor.nrows()
    }

    pub fn sample(&self, rng: &mut SimulationRng) -> DVector<f64> {
        let white = DVector::from_fn(self.dim(), |_, _| rng.standard_normal());
        &self.factor * white
    }
}
