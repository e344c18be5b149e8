//! Explicit random number context shared by expression evaluation.
//!
//! `random(min, max)` and `gauss(mean, stddev)` expressions draw from a
//! single generator that the caller owns and passes down by `&mut`. Given the
//! same seed and the same evaluation order, a simulation is reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Seeded uniform/gaussian source.
#[derive(Debug, Clone)]
pub struct RngContext {
    seed: u64,
    rng: StdRng,
}

impl RngContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The seed this context was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw in `[min, max)`. Bounds in the wrong order are not
    /// swapped, so `uniform(1.0, 0.0)` lands in `(0.0, 1.0]`.
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        let u: f64 = self.rng.gen();
        min + (max - min) * u
    }

    /// Normal draw with the given mean and standard deviation.
    pub fn gaussian(&mut self, mean: f64, stddev: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        mean + stddev * z
    }
}

impl Default for RngContext {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = RngContext::new(7);
        let mut b = RngContext::new(7);
        for _ in 0..20 {
            assert_eq!(a.uniform(0.0, 1.0), b.uniform(0.0, 1.0));
            assert_eq!(a.gaussian(0.0, 1.0), b.gaussian(0.0, 1.0));
        }
    }

    #[test]
    fn uniform_stays_in_bounds() {
        let mut rng = RngContext::new(3);
        for _ in 0..1000 {
            let x = rng.uniform(2.0, 5.0);
            assert!((2.0..5.0).contains(&x), "{} out of bounds", x);
        }
    }

    #[test]
    fn zero_stddev_returns_mean() {
        let mut rng = RngContext::new(11);
        assert_eq!(rng.gaussian(4.5, 0.0), 4.5);
    }
}
