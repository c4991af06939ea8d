//! Organic price synthesis
//!
//! Walks the waypoint path tick by tick. Each step blends a linear target,
//! a quadratic "magnet" pull toward the segment end (weak early, strong
//! late), a small drift, and a noise term from a pluggable model. Every
//! value is hard-clamped to the candle's range, snapped to the waypoint on
//! a segment's last tick, and rounded onto the tick-size grid.
//!
//! Invariants of the output:
//! - `low <= price <= high` for every tick
//! - first price is the open on the grid, last is the close on the grid
//! - a flat candle (`high == low`) yields copies of the close

use serde::{Deserialize, Serialize};
use types::candle::Candle;
use types::numeric::TickSizeSchedule;

use crate::pattern::PatternProfile;
use crate::rng::SeededRng;

/// Fewest ticks a synthesized path may have (open and close).
pub const MIN_PATH_TICKS: usize = 2;

const MAGNET_STRENGTH: f64 = 0.4;
const DRIFT_STRENGTH: f64 = 0.1;
const LATTICE_SIZE: usize = 256;
/// Share of the noise amplitude that leans with the candle direction.
const TREND_BIAS: f64 = 0.1;

/// Volatility bucket of a candle, from its range relative to the open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityTier {
    Low,
    Medium,
    High,
}

impl VolatilityTier {
    /// `range/open` below 0.5% is low, below 2% medium, otherwise high.
    pub fn classify(candle: &Candle) -> Self {
        let relative = if candle.open > 0.0 {
            candle.range() / candle.open
        } else {
            0.0
        };
        if relative < 0.005 {
            VolatilityTier::Low
        } else if relative < 0.02 {
            VolatilityTier::Medium
        } else {
            VolatilityTier::High
        }
    }

    /// Scale applied to the coherent noise frequency.
    pub fn frequency_multiplier(&self) -> f64 {
        match self {
            VolatilityTier::Low => 0.7,
            VolatilityTier::Medium => 1.0,
            VolatilityTier::High => 1.5,
        }
    }
}

/// Candle direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn of(candle: &Candle) -> Self {
        if candle.close > candle.open {
            Trend::Up
        } else if candle.close < candle.open {
            Trend::Down
        } else {
            Trend::Flat
        }
    }

    pub fn sign(&self) -> f64 {
        match self {
            Trend::Up => 1.0,
            Trend::Down => -1.0,
            Trend::Flat => 0.0,
        }
    }
}

/// Geometric Brownian Motion parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbmParams {
    /// Drift per candle.
    pub mu: f64,
    /// Volatility per candle.
    pub sigma: f64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            mu: 0.0,
            sigma: 0.05,
        }
    }
}

/// Which noise model feeds the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseModel {
    /// Multi-octave value noise.
    #[default]
    Coherent,
    /// Geometric Brownian Motion increments.
    Gbm,
}

/// Parameters that shape synthesis for one candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub volatility: VolatilityTier,
    pub trend: Trend,
    /// Noise amplitude as a fraction of the candle range.
    pub noise_level: f64,
    /// Decisive candles (body at least half the range) are smoother.
    pub flow_aligned: bool,
    /// Present when the GBM model is active.
    pub gbm: Option<GbmParams>,
}

impl MarketContext {
    pub fn from_candle(candle: &Candle, profile: &PatternProfile, config: &SynthesisConfig) -> Self {
        Self {
            volatility: VolatilityTier::classify(candle),
            trend: Trend::of(candle),
            noise_level: config.noise_level,
            flow_aligned: profile.body_ratio >= 0.5,
            gbm: match config.noise_model {
                NoiseModel::Gbm => Some(config.gbm),
                NoiseModel::Coherent => None,
            },
        }
    }
}

/// Synthesis tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub noise_model: NoiseModel,
    /// Coherent noise amplitude as a fraction of the candle range.
    pub noise_level: f64,
    /// Coherent noise base frequency in cycles per tick.
    pub base_frequency: f64,
    pub gbm: GbmParams,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            noise_model: NoiseModel::Coherent,
            noise_level: 0.05,
            base_frequency: 0.15,
            gbm: GbmParams::default(),
        }
    }
}

/// Per-tick noise increment.
pub trait NoiseSource {
    /// Noise to add at `tick` given the current path price.
    fn sample(&mut self, tick: usize, price: f64) -> f64;
}

/// Smooth multi-octave value noise over a seeded lattice.
pub struct CoherentNoise {
    lattice: Vec<f64>,
    amplitude: f64,
    frequency: f64,
    octaves: u32,
    /// Constant lean toward the candle direction.
    bias: f64,
}

impl CoherentNoise {
    pub fn new(range: f64, context: &MarketContext, base_frequency: f64, rng: &mut SeededRng) -> Self {
        let lattice = (0..LATTICE_SIZE).map(|_| rng.range(-1.0, 1.0)).collect();
        let amplitude = range * context.noise_level;
        Self {
            lattice,
            amplitude,
            frequency: base_frequency * context.volatility.frequency_multiplier(),
            octaves: if context.flow_aligned { 2 } else { 3 },
            bias: amplitude * TREND_BIAS * context.trend.sign(),
        }
    }

    fn value_at(&self, x: f64) -> f64 {
        let cell = x.floor();
        let frac = x - cell;
        let i = (cell as i64).rem_euclid(LATTICE_SIZE as i64) as usize;
        let a = self.lattice[i];
        let b = self.lattice[(i + 1) % LATTICE_SIZE];
        let smooth = frac * frac * (3.0 - 2.0 * frac);
        a + (b - a) * smooth
    }
}

impl NoiseSource for CoherentNoise {
    fn sample(&mut self, tick: usize, _price: f64) -> f64 {
        let mut total = self.bias;
        let mut amplitude = self.amplitude;
        let mut frequency = self.frequency;
        for octave in 0..self.octaves {
            // Offset each octave so they read different lattice regions.
            let x = tick as f64 * frequency + octave as f64 * 61.7;
            total += amplitude * self.value_at(x);
            amplitude *= 0.5;
            frequency *= 2.0;
        }
        total
    }
}

/// Geometric Brownian Motion increments with `dt = 1/N`.
pub struct GbmNoise<'a> {
    params: GbmParams,
    dt: f64,
    rng: &'a mut SeededRng,
}

impl<'a> GbmNoise<'a> {
    pub fn new(params: GbmParams, tick_count: usize, rng: &'a mut SeededRng) -> Self {
        Self {
            params,
            dt: 1.0 / tick_count.max(1) as f64,
            rng,
        }
    }
}

impl NoiseSource for GbmNoise<'_> {
    fn sample(&mut self, _tick: usize, price: f64) -> f64 {
        let z = self.rng.standard_normal();
        self.params.mu * price * self.dt + self.params.sigma * price * self.dt.sqrt() * z
    }
}

/// Walks waypoint paths into tick prices.
pub struct OrganicSynthesizer<'a> {
    config: &'a SynthesisConfig,
    tick_size: &'a TickSizeSchedule,
}

impl<'a> OrganicSynthesizer<'a> {
    pub fn new(config: &'a SynthesisConfig, tick_size: &'a TickSizeSchedule) -> Self {
        Self { config, tick_size }
    }

    /// Synthesize `tick_count` prices along `waypoints`.
    pub fn synthesize(
        &self,
        candle: &Candle,
        waypoints: &[f64],
        tick_count: usize,
        context: &MarketContext,
        rng: &mut SeededRng,
    ) -> Vec<f64> {
        let tick_count = tick_count.max(MIN_PATH_TICKS);
        let (low, high) = (candle.low, candle.high);

        if high <= low {
            return vec![candle.close; tick_count];
        }

        match context.gbm {
            Some(params) => {
                let mut noise = GbmNoise::new(params, tick_count, rng);
                self.walk(candle, waypoints, tick_count, &mut noise)
            }
            None => {
                let mut noise =
                    CoherentNoise::new(candle.range(), context, self.config.base_frequency, rng);
                self.walk(candle, waypoints, tick_count, &mut noise)
            }
        }
    }

    fn walk(
        &self,
        candle: &Candle,
        waypoints: &[f64],
        tick_count: usize,
        noise: &mut dyn NoiseSource,
    ) -> Vec<f64> {
        let (low, high) = (candle.low, candle.high);
        let fallback = [candle.open, candle.close];

        let (path, counts) = match allocate_ticks(waypoints, tick_count - 1) {
            Some(counts) => (waypoints, counts),
            None => (&fallback[..], vec![tick_count - 1]),
        };

        let mut prices = Vec::with_capacity(tick_count);
        prices.push(candle.open);

        let mut current = candle.open;
        let mut tick = 1;
        for (segment, &count) in counts.iter().enumerate() {
            let start = path[segment];
            let end = path[segment + 1];
            for j in 1..=count {
                let progress = j as f64 / count as f64;
                let linear_target = start + (end - start) * progress;
                let gap = linear_target - current;
                let magnet_pull = gap * progress * progress * MAGNET_STRENGTH;
                let drift = gap * DRIFT_STRENGTH;

                let mut next =
                    (current + drift + magnet_pull + noise.sample(tick, current)).clamp(low, high);
                if j == count {
                    next = end;
                }

                current = next;
                prices.push(next);
                tick += 1;
            }
        }

        let mut rounded: Vec<f64> = prices
            .iter()
            .map(|&p| self.tick_size.round_within(p, low, high))
            .collect();
        rounded[0] = self.tick_size.round_within(candle.open, low, high);
        let last = rounded.len() - 1;
        rounded[last] = self.tick_size.round_within(candle.close, low, high);
        rounded
    }
}

/// Split `ticks` across the segments of `waypoints` in proportion to each
/// segment's price distance, at least one tick per segment.
///
/// Returns `None` when there are fewer ticks than segments.
pub fn allocate_ticks(waypoints: &[f64], ticks: usize) -> Option<Vec<usize>> {
    let segments = waypoints.len().checked_sub(1)?;
    if segments == 0 || ticks < segments {
        return None;
    }

    let distances: Vec<f64> = waypoints.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let total_distance: f64 = distances.iter().sum();
    let spare = ticks - segments;

    let shares: Vec<f64> = if total_distance > 0.0 {
        distances
            .iter()
            .map(|d| d / total_distance * spare as f64)
            .collect()
    } else {
        vec![spare as f64 / segments as f64; segments]
    };

    let mut counts: Vec<usize> = shares.iter().map(|s| 1 + s.floor() as usize).collect();
    let mut remaining = ticks - counts.iter().sum::<usize>();

    // Largest remainder, lower index first on ties.
    let mut order: Vec<usize> = (0..segments).collect();
    order.sort_by(|&a, &b| {
        let ra = shares[a] - shares[a].floor();
        let rb = shares[b] - shares[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for &i in order.iter().cycle() {
        if remaining == 0 {
            break;
        }
        counts[i] += 1;
        remaining -= 1;
    }

    Some(counts)
}
