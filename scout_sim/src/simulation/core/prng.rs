// scout_sim/src/simulation/core/prng.rs

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// A newtype wrapper around `ChaCha8Rng`.
/// Every noisy device owns one, derived from the scenario seed and its own
/// stream number, so adding a device never shifts another device's draws.
#[derive(Debug, Clone)]
pub struct SimulationRng(pub ChaCha8Rng);

impl SimulationRng {
    pub fn new(seed: Option<u64>, stream: u64) -> Self {
        let mut rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        rng.set_stream(stream);
        Self(rng)
    }

    /// One draw from N(0, stddev²). A non-positive stddev yields 0.
    pub fn gaussian(&mut self, stddev: f64) -> f64 {
        match Normal::new(0.0, stddev) {
            Ok(normal) if stddev > 0.0 => normal.sample(&mut self.0),
            _ => 0.0,
        }
    }

    /// `true` with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        p > 0.0 && self.0.gen::<f64>() < p
    }

    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high > low {
            self.0.gen_range(low..high)
        } else {
            low
        }
    }
}
