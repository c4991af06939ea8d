//! Synthesized tick and running-candle types

use serde::{Deserialize, Serialize};

use crate::candle::Candle;

/// One synthesized price/volume sample inside a candle's span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tick {
    pub price: f64,
    pub volume: u64,
    /// Milliseconds from the candle's open time.
    pub timestamp_offset: f64,
    pub tick_index: usize,
    pub candle_index: usize,
}

/// The live candle rebuilt from the tick stream.
///
/// `time` and `open` are fixed when the candle begins. Only `high`, `low`
/// and `close` move afterwards; fields are private so that holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunningAggregate {
    /// Candle open time in Unix seconds.
    time: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl RunningAggregate {
    /// Start a running aggregate at the candle's open.
    pub fn begin(candle: &Candle) -> Self {
        Self {
            time: candle.t.div_euclid(1000),
            open: candle.open,
            high: candle.open,
            low: candle.open,
            close: candle.open,
        }
    }

    /// Fold a tick price into the aggregate.
    pub fn apply(&mut self, price: f64) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
    }

    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn open(&self) -> f64 {
        self.open
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn close(&self) -> f64 {
        self.close
    }
}
