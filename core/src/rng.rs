//! Deterministic random number generation.
//!
//! RULE: Nothing in the economy may call any platform RNG.
//! All randomness flows through SimRng instances derived from the
//! bot seed, which is itself derived from the campaign master seed.
//!
//! Each concern gets its own stream, seeded deterministically from
//! (bot_seed XOR stream_index * golden). This means:
//!   - Changing how actions are picked never changes what loot drops.
//!   - A single bot can be replayed from its recorded seed alone.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use uuid::Uuid;

const GOLDEN: u64 = 0x9e37_79b9_7f4a_7c15;

/// Mix a parent seed with a stable child index.
pub fn derive_seed(parent: u64, index: u64) -> u64 {
    parent ^ index.wrapping_add(1).wrapping_mul(GOLDEN)
}

/// A named, deterministic RNG stream.
#[derive(Clone, Debug)]
pub struct SimRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Uniform index into a slice of length `len`.
    pub fn index(&mut self, len: usize) -> usize {
        self.next_u64_below(len as u64) as usize
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform float in [min, max).
    pub fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Weighted selection by running subtraction.
    ///
    /// Draws `r` uniformly in `[0, total)` and walks the weights, returning the
    /// first index where the remainder goes non-positive. Ties go to the
    /// earlier entry; the last index is the fallback when rounding exhausts the
    /// draw. Returns None for an empty slice.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        if weights.is_empty() {
            return None;
        }
        let total: f64 = weights.iter().sum();
        let mut remainder = self.next_f64() * total;
        for (i, w) in weights.iter().enumerate() {
            remainder -= w;
            if remainder <= 0.0 {
                return Some(i);
            }
        }
        Some(weights.len() - 1)
    }

    /// A v4-layout UUID built from stream bytes, so ids replay with the seed.
    pub fn uuid(&mut self) -> Uuid {
        let mut bytes = [0u8; 16];
        self.inner.fill_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}

/// All RNG streams for a single bot, indexed by stable slot.
pub struct RngBank {
    bot_seed: u64,
}

impl RngBank {
    pub fn new(bot_seed: u64) -> Self {
        Self { bot_seed }
    }

    pub fn for_stream(&self, stream: RngStream) -> SimRng {
        SimRng::new(derive_seed(self.bot_seed, stream as u64)).with_name(stream.name())
    }
}

/// Stable stream assignments.
/// NEVER reorder or remove entries. Only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum RngStream {
    Policy = 0,
    Economy = 1,
}

impl RngStream {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Policy => "policy",
            Self::Economy => "economy",
        }
    }
}
