//! Injectable randomness for estimate jitter and announcement gating.
//!
//! Production code wraps a seedable `rand` generator; tests can supply a
//! scripted implementation to force every branch.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random draws needed by the estimation engine and reconciliation policy.
pub trait Entropy {
    /// Uniform integer in `low..=high`.
    fn between(&mut self, low: u32, high: u32) -> u32;

    /// `true` with probability `percent / 100`.
    fn chance(&mut self, percent: u32) -> bool;
}

/// `Entropy` backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngEntropy<R: Rng> {
    rng: R,
}

impl<R: Rng> RngEntropy<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngEntropy<StdRng> {
    /// Seeded from the operating system.
    pub fn from_os() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Entropy for RngEntropy<R> {
    fn between(&mut self, low: u32, high: u32) -> u32 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }

    fn chance(&mut self, percent: u32) -> bool {
        match percent {
            0 => false,
            p if p >= 100 => true,
            p => self.rng.gen_ratio(p, 100),
        }
    }
}

impl<E: Entropy + ?Sized> Entropy for &mut E {
    fn between(&mut self, low: u32, high: u32) -> u32 {
        (**self).between(low, high)
    }

    fn chance(&mut self, percent: u32) -> bool {
        (**self).chance(percent)
    }
}
