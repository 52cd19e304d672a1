//! The chaos rule: a random mark override on every Nth move.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use tracing::{debug, instrument};

use crate::ChaosConfig;

/// Period used by the stock rule: every third move is eligible.
pub const DEFAULT_CHAOS_PERIOD: u32 = 3;

/// Flip probability used by the stock rule.
pub const DEFAULT_CHAOS_PROBABILITY: f64 = 0.1;

/// Decides whether an accepted move records the opponent's mark.
///
/// Only sequence numbers that are a multiple of `period` are eligible, and
/// each eligible move draws once. A period of zero disables the rule. The
/// generator is seedable so tests can pin the outcome.
#[derive(Debug)]
pub struct ChaosRule {
    period: u32,
    probability: f64,
    rng: Mutex<StdRng>,
}

fn clamp_probability(probability: f64) -> f64 {
    if probability.is_nan() {
        0.0
    } else {
        probability.clamp(0.0, 1.0)
    }
}

impl ChaosRule {
    /// Rule with a deterministic generator.
    #[instrument]
    pub fn seeded(seed: u64, period: u32, probability: f64) -> Self {
        Self {
            period,
            probability: clamp_probability(probability),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Rule seeded from the operating system.
    #[instrument]
    pub fn from_entropy(period: u32, probability: f64) -> Self {
        Self {
            period,
            probability: clamp_probability(probability),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Rule that never flips.
    pub fn disabled() -> Self {
        Self::seeded(0, 0, 0.0)
    }

    /// Builds the rule described by configuration.
    #[instrument(skip(config))]
    pub fn from_config(config: &ChaosConfig) -> Self {
        match config.seed() {
            Some(seed) => Self::seeded(*seed, *config.period(), *config.probability()),
            None => Self::from_entropy(*config.period(), *config.probability()),
        }
    }

    /// Eligibility period.
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Flip probability for eligible moves.
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Whether the move with this sequence number gets the opponent's mark.
    #[instrument(skip(self))]
    pub fn should_flip(&self, sequence: u32) -> bool {
        if self.period == 0 || sequence % self.period != 0 {
            return false;
        }
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let flip = rng.gen_bool(self.probability);
        debug!(sequence, flip, "Chaos draw");
        flip
    }
}

impl Default for ChaosRule {
    fn default() -> Self {
        Self::from_entropy(DEFAULT_CHAOS_PERIOD, DEFAULT_CHAOS_PROBABILITY)
    }
}
