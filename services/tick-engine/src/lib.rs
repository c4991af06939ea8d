//! Tick Engine
//!
//! Turns a sequence of OHLCV candles into a deterministic stream of
//! synthetic sub-candle ticks and replays it under play/pause/seek/speed
//! control:
//! - Candle shape classification and waypoint planning
//! - Bounded organic price paths on a venue tick-size grid
//! - Exact volume distribution and bursty tick scheduling
//! - A speed-aware playback clock and live candle aggregation
//! - Epoch-tagged events so consumers can reject stale output
//!
//! # Architecture
//!
//! ```text
//!   INIT candles
//!        │
//!   ┌────▼─────┐
//!   │ Ingest   │  ← Repairs, drops, trims, gaps, avg volume
//!   └────┬─────┘
//!        │ per candle
//!   ┌────▼─────┐   ┌──────────┐
//!   │ Pattern  ├──►│Waypoints │
//!   └──────────┘   └────┬─────┘
//!                       │
//!   ┌────────┬──────┴──┬─────────┬──────────┐
//!   │Density │ Synth   │ Volume  │ Schedule │
//!   └───┬────┴────┬────┴────┬────┴────┬─────┘
//!       └─────────┴────┬────┴─────────┘
//!                      ▼
//!                 CandlePlan
//!                      │
//!   ┌───────────────▼──────────────┐
//!   │ Controller (clock, poll cap) │ ← Commands
//!   └───────────────┬──────────────┘
//!                   │ Tick / CandleUpdate / ...
//!            ┌──────▼──────┐
//!            │   Runner    │ → Event channel
//!            └─────────────┘
//! ```

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod controller;
pub mod density;
pub mod events;
pub mod fingerprint;
pub mod ingestion;
pub mod metrics;
pub mod pattern;
pub mod plan;
pub mod rng;
pub mod runner;
pub mod scheduler;
pub mod synth;
pub mod volume;
pub mod waypoints;

pub use config::{ConfigError, EngineConfig};
pub use controller::{PlaybackState, SimulationController};
pub use events::{Command, Event, EpochGuard};
pub use runner::{spawn, EngineHandle};

// Service version
pub const SERVICE_VERSION: &str = "0.1.0";
