//! Live candle aggregation
//!
//! Rebuilds the running candle from fired ticks. Every tick produces an
//! update; between ticks a periodic refresh is emitted at a cadence that
//! tightens with playback speed.

use types::candle::Candle;
use types::tick::RunningAggregate;

const BASE_CADENCE_MS: f64 = 100.0;
const MIN_CADENCE_MS: f64 = 16.0;
const MAX_CADENCE_MS: f64 = 100.0;

/// Periodic refresh cadence for a playback speed.
pub fn throttle_cadence_ms(speed: f64) -> f64 {
    let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
    (BASE_CADENCE_MS / speed).clamp(MIN_CADENCE_MS, MAX_CADENCE_MS)
}

#[derive(Debug, Clone, Default)]
pub struct LiveCandleAggregator {
    aggregate: Option<RunningAggregate>,
    last_emit_ms: Option<f64>,
}

impl LiveCandleAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh aggregate at the candle's open.
    pub fn begin(&mut self, candle: &Candle) -> RunningAggregate {
        let aggregate = RunningAggregate::begin(candle);
        self.aggregate = Some(aggregate);
        self.last_emit_ms = None;
        aggregate
    }

    /// Fold a fired tick in and return the update to emit.
    pub fn on_tick(&mut self, price: f64, now_ms: f64) -> Option<RunningAggregate> {
        let aggregate = self.aggregate.as_mut()?;
        aggregate.apply(price);
        self.last_emit_ms = Some(now_ms);
        Some(*aggregate)
    }

    /// Periodic refresh when the cadence for `speed` has passed since the
    /// last emission.
    pub fn refresh_due(&mut self, now_ms: f64, speed: f64) -> Option<RunningAggregate> {
        let aggregate = self.aggregate?;
        let due = match self.last_emit_ms {
            Some(last) => now_ms - last >= throttle_cadence_ms(speed),
            None => true,
        };
        if !due {
            return None;
        }
        self.last_emit_ms = Some(now_ms);
        Some(aggregate)
    }

    pub fn current(&self) -> Option<&RunningAggregate> {
        self.aggregate.as_ref()
    }

    /// Discard the aggregate (seek, stop, reload).
    pub fn clear(&mut self) {
        self.aggregate = None;
        self.last_emit_ms = None;
    }
}
