//! Playback counters
//!
//! The two loss counters measure different things:
//! - `throttled`: ticks that were due but deferred past a poll by the
//!   per-poll cap. Each tick is counted once, however many polls it waits.
//! - `dropped`: candles discarded at ingestion as unsalvageable.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineMetrics {
    pub total_processed: u64,
    pub total_throttled: u64,
    pub total_dropped: u64,
    pub total_trimmed: u64,
    pub total_repaired: u64,
    pub polls: u64,
    pub late_polls: u64,
    pub candles_completed: u64,
}

impl EngineMetrics {
    pub fn record_ingest(&mut self, repaired: usize, dropped: usize, trimmed: usize) {
        self.total_repaired += repaired as u64;
        self.total_dropped += dropped as u64;
        self.total_trimmed += trimmed as u64;
    }

    pub fn record_processed(&mut self, ticks: usize) {
        self.total_processed += ticks as u64;
    }

    pub fn record_throttled(&mut self, ticks: usize) {
        self.total_throttled += ticks as u64;
    }

    pub fn record_poll(&mut self, late: bool) {
        self.polls += 1;
        if late {
            self.late_polls += 1;
        }
    }

    pub fn record_candle_completed(&mut self) {
        self.candles_completed += 1;
    }
}
