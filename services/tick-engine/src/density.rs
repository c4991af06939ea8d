//! Tick density
//!
//! How many ticks a candle gets:
//!
//! ```text
//! base_rate × duration_minutes × volatility_multiplier
//!           × clamp(volume / avg_volume, 0.5, 2.5)
//!           × 1 / sqrt(max(speed, 1))
//! ```
//!
//! clamped to `[min_ticks, max_ticks]`. Fast playback thins ticks so the
//! per-second event rate stays bounded.

use serde::{Deserialize, Serialize};
use types::candle::Candle;

use crate::synth::VolatilityTier;

const VOLUME_RATIO_BOUNDS: (f64, f64) = (0.5, 2.5);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickDensityConfig {
    /// Ticks per minute of candle duration before scaling.
    pub base_rate: f64,
    pub min_ticks: usize,
    pub max_ticks: usize,
    pub low_volatility_multiplier: f64,
    pub medium_volatility_multiplier: f64,
    pub high_volatility_multiplier: f64,
}

impl Default for TickDensityConfig {
    fn default() -> Self {
        Self {
            base_rate: 50.0,
            min_ticks: 10,
            max_ticks: 500,
            low_volatility_multiplier: 0.8,
            medium_volatility_multiplier: 1.0,
            high_volatility_multiplier: 1.3,
        }
    }
}

impl TickDensityConfig {
    pub fn volatility_multiplier(&self, tier: VolatilityTier) -> f64 {
        match tier {
            VolatilityTier::Low => self.low_volatility_multiplier,
            VolatilityTier::Medium => self.medium_volatility_multiplier,
            VolatilityTier::High => self.high_volatility_multiplier,
        }
    }

    /// Tick count for `candle` over `duration_ms` at `speed`.
    ///
    /// `avg_volume` is the rolling average at the candle; zero means no
    /// history and the volume ratio is taken as 1.
    pub fn tick_count(&self, candle: &Candle, duration_ms: u64, avg_volume: f64, speed: f64) -> usize {
        let duration_minutes = duration_ms as f64 / 60_000.0;
        let volume_ratio = if avg_volume > 0.0 {
            (candle.volume as f64 / avg_volume).clamp(VOLUME_RATIO_BOUNDS.0, VOLUME_RATIO_BOUNDS.1)
        } else {
            1.0
        };
        let speed = if speed.is_finite() { speed.max(1.0) } else { 1.0 };

        let raw = self.base_rate
            * duration_minutes
            * self.volatility_multiplier(VolatilityTier::classify(candle))
            * volume_ratio
            / speed.sqrt();

        let lo = self.min_ticks as f64;
        let hi = (self.max_ticks as f64).max(lo);
        let clamped = if raw.is_finite() { raw.clamp(lo, hi) } else { lo };
        clamped.round() as usize
    }
}
