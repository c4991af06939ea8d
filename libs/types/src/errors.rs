//! Error types for the replay engine
//!
//! Error taxonomy using thiserror. Candle and tick-size errors are local
//! and recoverable; `EngineError` covers the faults that end a session.

use thiserror::Error;

/// Top-level engine error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid engine configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Event delivery failed: {reason}")]
    DeliveryFailed { reason: String },

    #[error("Engine is shut down")]
    Shutdown,
}

/// Per-candle validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CandleError {
    #[error("Non-finite {field} in candle at t={t}")]
    NonFinite { t: i64, field: &'static str },

    #[error("Non-positive {field} ({value}) in candle at t={t}")]
    NonPositive {
        t: i64,
        field: &'static str,
        value: f64,
    },
}

/// Tick-size schedule construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TickSizeError {
    #[error("Tick size schedule has no tiers")]
    Empty,

    #[error("Tier {tier} has a non-positive step")]
    NonPositiveStep { tier: usize },

    #[error("Tier {tier} has no upper bound but is not the last tier")]
    UnboundedTier { tier: usize },

    #[error("Tier {tier} bound is not above the previous tier")]
    UnorderedBounds { tier: usize },

    #[error("Last tier must be unbounded")]
    MissingFinalTier,
}
