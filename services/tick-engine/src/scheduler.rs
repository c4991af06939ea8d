//! Tick scheduling (heartbeat)
//!
//! Assigns each tick a target offset inside the candle's span. Ticks are
//! grouped into mood runs (fast, slow, normal) to produce bursty, uneven
//! pacing. Raw delays are rescaled so the cumulative sum lands exactly on
//! the candle duration; the last offset is then pulled back by 1 ms so it
//! cannot collide with the next candle's first tick.

use serde::{Deserialize, Serialize};

use crate::rng::SeededRng;

/// Shortest candle duration the scheduler accepts.
pub const MIN_DURATION_MS: u64 = 1;

const RUN_LENGTH: (usize, usize) = (5, 15);
const JITTER: (f64, f64) = (0.8, 1.2);

/// Pacing of a run of consecutive ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    Fast,
    Slow,
    Normal,
}

impl Mood {
    /// Delay multiplier applied to every tick in the run.
    pub fn multiplier(&self) -> f64 {
        match self {
            Mood::Fast => 0.4,
            Mood::Slow => 1.8,
            Mood::Normal => 1.0,
        }
    }

    fn draw(rng: &mut SeededRng) -> Self {
        match rng.index(0, 3) {
            0 => Mood::Fast,
            1 => Mood::Slow,
            _ => Mood::Normal,
        }
    }
}

/// Ordered target offsets for one candle's ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSchedule {
    offsets: Vec<f64>,
    duration_ms: u64,
}

impl TickSchedule {
    /// Build a schedule for `tick_count` ticks over `duration_ms`.
    ///
    /// Degenerate inputs are clamped: at least one tick, at least
    /// `MIN_DURATION_MS` of duration.
    pub fn build(tick_count: usize, duration_ms: u64, rng: &mut SeededRng) -> Self {
        let tick_count = tick_count.max(1);
        let duration_ms = duration_ms.max(MIN_DURATION_MS);
        let duration = duration_ms as f64;

        let mut raw = Vec::with_capacity(tick_count - 1);
        let mut mood = Mood::Normal;
        let mut run_left = 0usize;
        for _ in 1..tick_count {
            if run_left == 0 {
                mood = Mood::draw(rng);
                run_left = rng.index(RUN_LENGTH.0, RUN_LENGTH.1);
            }
            run_left -= 1;
            raw.push(mood.multiplier() * rng.range(JITTER.0, JITTER.1));
        }

        let raw_sum: f64 = raw.iter().sum();
        let scale = if raw_sum > 0.0 { duration / raw_sum } else { 0.0 };

        let mut offsets = Vec::with_capacity(tick_count);
        offsets.push(0.0);
        let mut cumulative = 0.0;
        for delay in raw {
            cumulative += delay * scale;
            offsets.push(cumulative);
        }

        let ceiling = duration - 1.0;
        if let Some(last) = offsets.last_mut() {
            *last = last.min(ceiling);
        }
        for i in (0..offsets.len().saturating_sub(1)).rev() {
            offsets[i] = offsets[i].min(offsets[i + 1]);
        }

        Self {
            offsets,
            duration_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    pub fn offset(&self, tick_index: usize) -> Option<f64> {
        self.offsets.get(tick_index).copied()
    }

    /// Number of ticks whose offset is at or before `elapsed_ms`.
    pub fn due_count(&self, elapsed_ms: f64) -> usize {
        self.offsets.partition_point(|&o| o <= elapsed_ms)
    }
}
