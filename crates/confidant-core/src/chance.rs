//! Injectable randomness for the probabilistic check-in trigger.
//!
//! The proactive scheduler samples users with a fixed probability; the
//! random source is a trait so the trigger decision is deterministic
//! under test and seedable in production if reproducibility matters.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Uniform `[0, 1)` sample source.
pub trait ChanceSource: Send + Sync {
    fn roll(&self) -> f64;
}

/// Thread-local OS-seeded randomness (production default).
pub struct RandChance;

impl ChanceSource for RandChance {
    fn roll(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Deterministic randomness from a fixed seed.
pub struct SeededChance {
    rng: Mutex<StdRng>,
}

impl SeededChance {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl ChanceSource for SeededChance {
    fn roll(&self) -> f64 {
        let mut rng = self.rng.lock().expect("chance lock poisoned");
        rng.gen_range(0.0..1.0)
    }
}
