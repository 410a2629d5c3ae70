//! Seeded random number generation
//!
//! Every stochastic decision in the swarm (frequency tuning, acceptance
//! draws, local search, discovery triggers, forwarding) pulls from a
//! [`SimRng`]. Runs built from the same seed replay identically.
//!
//! Uses ChaCha8 for the stream; `getrandom` supplies the seed when the
//! caller does not pin one.

use crate::types::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic random number generator for the simulation
#[derive(Debug, Clone)]
pub struct SimRng {
    inner: ChaCha8Rng,
}

impl SimRng {
    /// Create a generator from a fixed seed
    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Create a generator seeded from the OS entropy source
    pub fn from_entropy() -> Result<Self> {
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed).map_err(|_| SwarmError::EntropyUnavailable)?;
        Ok(Self {
            inner: ChaCha8Rng::from_seed(seed),
        })
    }

    /// Derive an independent child stream (one per agent or obstacle)
    pub fn fork(&mut self, stream: u64) -> Self {
        let mut child = ChaCha8Rng::seed_from_u64(self.inner.gen::<u64>());
        child.set_stream(stream);
        Self { inner: child }
    }

    /// Generate a random u64
    pub fn next_u64(&mut self) -> u64 {
        self.inner.gen()
    }

    /// Uniform f32 in [0.0, 1.0)
    pub fn next_f32(&mut self) -> f32 {
        self.inner.gen::<f32>()
    }

    /// Uniform f32 in [min, max); returns `min` for an empty range
    pub fn uniform(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        min + self.next_f32() * (max - min)
    }

    /// Uniform u64 in [min, max]
    pub fn uniform_u64(&mut self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        self.inner.gen_range(min..=max)
    }
}
