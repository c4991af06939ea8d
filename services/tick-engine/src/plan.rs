//! Per-candle tick plan
//!
//! Everything the controller needs to play one candle: the classified
//! pattern, the synthesized ticks and their schedule. A plan is built when
//! a candle is entered and dropped when playback leaves it.

use types::candle::Candle;
use types::tick::Tick;

use crate::config::EngineConfig;
use crate::pattern::{analyze, PatternProfile};
use crate::rng::{SeededRng, Stream};
use crate::scheduler::TickSchedule;
use crate::synth::{MarketContext, OrganicSynthesizer};
use crate::{volume, waypoints};

#[derive(Debug, Clone)]
pub struct CandlePlan {
    candle_index: usize,
    candle: Candle,
    profile: PatternProfile,
    waypoints: Vec<f64>,
    ticks: Vec<Tick>,
    schedule: TickSchedule,
}

impl CandlePlan {
    /// Build the plan for one candle.
    ///
    /// Randomness comes only from streams keyed by `(seed, candle_index)`,
    /// so the same candle, speed and config always plan identically.
    pub fn build(
        config: &EngineConfig,
        candle_index: usize,
        candle: &Candle,
        avg_volume: f64,
        duration_ms: u64,
        speed: f64,
    ) -> Self {
        let seed = config.seed;
        let profile = analyze(candle);

        let path = waypoints::plan(
            candle,
            &profile,
            &mut SeededRng::for_candle(seed, candle_index, Stream::Waypoints),
        );

        let tick_count = config.density.tick_count(candle, duration_ms, avg_volume, speed);
        let context = MarketContext::from_candle(candle, &profile, &config.synthesis);
        let prices = OrganicSynthesizer::new(&config.synthesis, &config.tick_size).synthesize(
            candle,
            &path,
            tick_count,
            &context,
            &mut SeededRng::for_candle(seed, candle_index, Stream::Prices),
        );
        let tick_count = prices.len();

        let volumes = volume::distribute(
            candle.volume,
            tick_count,
            &mut SeededRng::for_candle(seed, candle_index, Stream::Volumes),
        );
        let schedule = TickSchedule::build(
            tick_count,
            duration_ms,
            &mut SeededRng::for_candle(seed, candle_index, Stream::Schedule),
        );

        let ticks = prices
            .iter()
            .zip(volumes.iter())
            .zip(schedule.offsets())
            .enumerate()
            .map(|(tick_index, ((&price, &volume), &offset))| Tick {
                price,
                volume,
                timestamp_offset: offset,
                tick_index,
                candle_index,
            })
            .collect();

        Self {
            candle_index,
            candle: *candle,
            profile,
            waypoints: path,
            ticks,
            schedule,
        }
    }

    pub fn candle_index(&self) -> usize {
        self.candle_index
    }

    pub fn candle(&self) -> &Candle {
        &self.candle
    }

    pub fn profile(&self) -> &PatternProfile {
        &self.profile
    }

    pub fn waypoints(&self) -> &[f64] {
        &self.waypoints
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn tick(&self, tick_index: usize) -> Option<&Tick> {
        self.ticks.get(tick_index)
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn schedule(&self) -> &TickSchedule {
        &self.schedule
    }

    pub fn duration_ms(&self) -> u64 {
        self.schedule.duration_ms()
    }

    /// Absolute time of a tick in Unix milliseconds.
    pub fn tick_timestamp(&self, tick: &Tick) -> f64 {
        self.candle.t as f64 + tick.timestamp_offset
    }
}
