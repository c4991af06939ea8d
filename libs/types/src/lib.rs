//! Types library for the synthetic tick replay engine
//!
//! Shared definitions consumed by the engine and by whatever transport or
//! view sits on the other side of its message channel.
//!
//! # Modules
//! - `ids`: Session identifier and epoch counter
//! - `candle`: OHLCV candles, sanitization, intervals
//! - `tick`: Synthesized ticks and the running aggregate
//! - `numeric`: Tick-size grid (Decimal staircase)
//! - `errors`: Error taxonomy

pub mod ids;
pub mod candle;
pub mod tick;
pub mod numeric;
pub mod errors;

