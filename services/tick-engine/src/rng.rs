//! Deterministic seeded randomness
//!
//! Every random draw in the synthesis path comes from a `SeededRng`. Each
//! candle gets independent ChaCha8 streams per purpose, keyed by the engine
//! seed and the candle index, so a candle's ticks are the same no matter
//! which candles were played, skipped or seeked past before it.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// Purpose of a random stream. Distinct streams never share draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Waypoints = 1,
    Prices = 2,
    Volumes = 3,
    Schedule = 4,
}

/// Seeded uniform/normal source.
#[derive(Debug, Clone)]
pub struct SeededRng {
    rng: ChaCha8Rng,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Stream for one candle and purpose.
    pub fn for_candle(seed: u64, candle_index: usize, stream: Stream) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(mix(seed, candle_index as u64));
        rng.set_stream(stream as u64);
        Self { rng }
    }

    /// Uniform draw in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform draw in `[low, high)`. Returns `low` for an empty range.
    pub fn range(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..high)
    }

    /// Uniform integer in `[low, high)`. Returns `low` for an empty range.
    pub fn index(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..high)
    }

    /// Standard normal draw.
    pub fn standard_normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }
}

/// SplitMix64 finalizer over the seed and candle index.
fn mix(seed: u64, index: u64) -> u64 {
    let mut z = seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
