//! Candle shape classification
//!
//! Classifies a candle from its body and wick ratios. The result drives the
//! waypoint template the tick path follows.

use serde::{Deserialize, Serialize};
use types::candle::Candle;

/// Candle shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternType {
    /// Long lower wick, small body.
    Hammer,
    /// Long upper wick, small body.
    ShootingStar,
    /// Body fills almost the whole range.
    Marubozu,
    /// Almost no body.
    Doji,
    Neutral,
}

/// Derived shape statistics for one candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternProfile {
    #[serde(rename = "type")]
    pub pattern: PatternType,
    pub is_bullish: bool,
    pub body_ratio: f64,
    pub upper_wick_ratio: f64,
    pub lower_wick_ratio: f64,
}

/// Classify a candle. First matching rule wins.
pub fn analyze(candle: &Candle) -> PatternProfile {
    let is_bullish = candle.is_bullish();
    let range = candle.range();

    if range <= 0.0 {
        return PatternProfile {
            pattern: PatternType::Neutral,
            is_bullish,
            body_ratio: 0.0,
            upper_wick_ratio: 0.0,
            lower_wick_ratio: 0.0,
        };
    }

    let body_ratio = candle.body() / range;
    let upper_wick_ratio = (candle.high - candle.body_top()) / range;
    let lower_wick_ratio = (candle.body_bottom() - candle.low) / range;

    let pattern = if lower_wick_ratio > 0.6 && body_ratio < 0.3 {
        PatternType::Hammer
    } else if upper_wick_ratio > 0.6 && body_ratio < 0.3 {
        PatternType::ShootingStar
    } else if upper_wick_ratio + lower_wick_ratio < 0.1 && body_ratio > 0.8 {
        PatternType::Marubozu
    } else if body_ratio < 0.05 {
        PatternType::Doji
    } else {
        PatternType::Neutral
    };

    PatternProfile {
        pattern,
        is_bullish,
        body_ratio,
        upper_wick_ratio,
        lower_wick_ratio,
    }
}
