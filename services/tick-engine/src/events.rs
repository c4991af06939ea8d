//! Engine commands and events
//!
//! Both are closed enums tagged by `"type"` so they cross any transport as
//! JSON. Every event carries the epoch it was produced under; consumers
//! drop events whose epoch is older than the newest they have seen.

use serde::{Deserialize, Serialize};
use types::candle::Candle;
use types::ids::{Epoch, SessionId};
use types::tick::RunningAggregate;

/// Inbound control messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    Init {
        candles: Vec<Candle>,
        /// Candles preceding the playable range, used for volume statistics.
        #[serde(default)]
        history: Vec<Candle>,
        #[serde(default)]
        interval: String,
    },
    Play {
        #[serde(default)]
        speed: Option<f64>,
    },
    Pause,
    Stop,
    SetSpeed {
        speed: f64,
    },
    #[serde(rename_all = "camelCase")]
    Seek {
        candle_index: usize,
    },
}

impl Command {
    pub fn type_label(&self) -> &'static str {
        match self {
            Command::Init { .. } => "INIT",
            Command::Play { .. } => "PLAY",
            Command::Pause => "PAUSE",
            Command::Stop => "STOP",
            Command::SetSpeed { .. } => "SET_SPEED",
            Command::Seek { .. } => "SEEK",
        }
    }
}

/// Outbound messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    Ready { session_id: SessionId, epoch: Epoch },
    #[serde(rename_all = "camelCase")]
    DataReady {
        candle_count: usize,
        repaired: usize,
        dropped: usize,
        trimmed: usize,
        epoch: Epoch,
    },
    #[serde(rename_all = "camelCase")]
    Tick {
        price: f64,
        volume: u64,
        /// Absolute tick time in Unix milliseconds.
        timestamp: f64,
        candle_index: usize,
        tick_index: usize,
        epoch: Epoch,
    },
    #[serde(rename_all = "camelCase")]
    CandleUpdate {
        candle: RunningAggregate,
        epoch: Epoch,
    },
    #[serde(rename_all = "camelCase")]
    CandleChange { new_index: usize, epoch: Epoch },
    #[serde(rename_all = "camelCase")]
    PlaybackState {
        is_playing: bool,
        speed: f64,
        epoch: Epoch,
    },
    Complete { epoch: Epoch },
    Error { message: String, epoch: Epoch },
    Warning { message: String, epoch: Epoch },
    #[serde(rename_all = "camelCase")]
    GapDetected {
        candle_index: usize,
        from_t: i64,
        to_t: i64,
        missing: u64,
        epoch: Epoch,
    },
    #[serde(rename_all = "camelCase")]
    Metrics {
        tick_backlog: usize,
        total_processed: u64,
        total_throttled: u64,
        total_dropped: u64,
        epoch: Epoch,
    },
}

impl Event {
    pub fn epoch(&self) -> Epoch {
        match self {
            Event::Ready { epoch, .. }
            | Event::DataReady { epoch, .. }
            | Event::Tick { epoch, .. }
            | Event::CandleUpdate { epoch, .. }
            | Event::CandleChange { epoch, .. }
            | Event::PlaybackState { epoch, .. }
            | Event::Complete { epoch }
            | Event::Error { epoch, .. }
            | Event::Warning { epoch, .. }
            | Event::GapDetected { epoch, .. }
            | Event::Metrics { epoch, .. } => *epoch,
        }
    }

    pub fn type_label(&self) -> &'static str {
        match self {
            Event::Ready { .. } => "READY",
            Event::DataReady { .. } => "DATA_READY",
            Event::Tick { .. } => "TICK",
            Event::CandleUpdate { .. } => "CANDLE_UPDATE",
            Event::CandleChange { .. } => "CANDLE_CHANGE",
            Event::PlaybackState { .. } => "PLAYBACK_STATE",
            Event::Complete { .. } => "COMPLETE",
            Event::Error { .. } => "ERROR",
            Event::Warning { .. } => "WARNING",
            Event::GapDetected { .. } => "GAP_DETECTED",
            Event::Metrics { .. } => "METRICS",
        }
    }
}

/// Consumer-side filter that discards zombie events.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochGuard {
    current: Epoch,
}

impl EpochGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `event` should be applied. Newer epochs are adopted.
    pub fn accept(&mut self, event: &Event) -> bool {
        let tag = event.epoch();
        if self.current.is_stale(tag) {
            return false;
        }
        self.current = tag;
        true
    }

    pub fn current(&self) -> Epoch {
        self.current
    }
}
