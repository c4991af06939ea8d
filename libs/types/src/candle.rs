//! OHLCV candle and interval types
//!
//! Candles arrive from the external data-preparation step. They are checked
//! and repaired here before any synthesis runs: inverted highs/lows are
//! swapped, wicks are widened to contain the body, and candles with
//! non-finite or non-positive prices are rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CandleError;

/// A single OHLCV candle.
///
/// `t` is the bucket open time in Unix milliseconds. Field names on the wire
/// use the compact `t/o/h/l/c/v` form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub t: i64,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: u64,
}

/// Outcome of sanitizing a candle that survived validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sanitized {
    /// Candle already satisfied every invariant.
    Clean(Candle),
    /// Candle was repaired in place (swap and/or clamp).
    Repaired(Candle),
}

impl Sanitized {
    pub fn candle(&self) -> Candle {
        match self {
            Sanitized::Clean(c) | Sanitized::Repaired(c) => *c,
        }
    }

    pub fn was_repaired(&self) -> bool {
        matches!(self, Sanitized::Repaired(_))
    }
}

impl Candle {
    pub fn new(t: i64, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            t,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// High minus low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Absolute body size.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }

    /// Upper edge of the body.
    pub fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    /// Lower edge of the body.
    pub fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }

    /// Bucket open time as a UTC datetime, if representable.
    pub fn open_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.t)
    }

    /// Validate candle integrity (OHLC invariants).
    pub fn is_valid(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite() && *p > 0.0)
            && self.high >= self.body_top()
            && self.low <= self.body_bottom()
            && self.high >= self.low
    }

    /// Repair a candle where mechanically possible.
    ///
    /// Fails only when a price is non-finite or non-positive, in which case
    /// the candle must be dropped.
    pub fn sanitize(self) -> Result<Sanitized, CandleError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(CandleError::NonFinite { t: self.t, field });
            }
            if value <= 0.0 {
                return Err(CandleError::NonPositive {
                    t: self.t,
                    field,
                    value,
                });
            }
        }

        if self.is_valid() {
            return Ok(Sanitized::Clean(self));
        }

        let mut repaired = self;
        if repaired.high < repaired.low {
            std::mem::swap(&mut repaired.high, &mut repaired.low);
        }
        repaired.high = repaired.high.max(repaired.body_top());
        repaired.low = repaired.low.min(repaired.body_bottom());

        Ok(Sanitized::Repaired(repaired))
    }
}

/// Supported candle intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    /// 1 minute
    M1,
    /// 5 minutes
    M5,
    /// 15 minutes
    M15,
    /// 30 minutes
    M30,
    /// 1 hour
    H1,
    /// 4 hours
    H4,
    /// 1 day
    D1,
    /// 1 week
    W1,
}

impl Interval {
    /// Duration of this interval in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        match self {
            Interval::M1 => 60_000,
            Interval::M5 => 5 * 60_000,
            Interval::M15 => 15 * 60_000,
            Interval::M30 => 30 * 60_000,
            Interval::H1 => 3_600_000,
            Interval::H4 => 4 * 3_600_000,
            Interval::D1 => 86_400_000,
            Interval::W1 => 7 * 86_400_000,
        }
    }

    /// All supported intervals, shortest first.
    pub fn all() -> &'static [Interval] {
        &[
            Interval::M1,
            Interval::M5,
            Interval::M15,
            Interval::M30,
            Interval::H1,
            Interval::H4,
            Interval::D1,
            Interval::W1,
        ]
    }

    /// Parse an interval label such as `1m`, `15m`, `1h`, `60m`, `1d`, `1wk`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "1m" | "1min" => Some(Interval::M1),
            "5m" | "5min" => Some(Interval::M5),
            "15m" | "15min" => Some(Interval::M15),
            "30m" | "30min" => Some(Interval::M30),
            "1h" | "60m" | "60min" => Some(Interval::H1),
            "4h" | "240m" => Some(Interval::H4),
            "1d" | "d" | "daily" => Some(Interval::D1),
            "1w" | "1wk" | "w" | "weekly" => Some(Interval::W1),
            _ => None,
        }
    }

    /// Interval whose duration matches `duration_ms` exactly.
    pub fn from_duration_ms(duration_ms: u64) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|i| i.duration_ms() == duration_ms)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::H4 => "4h",
            Interval::D1 => "1d",
            Interval::W1 => "1w",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(o: f64, h: f64, l: f64, c: f64) -> Candle {
        Candle::new(1_700_000_000_000, o, h, l, c, 1000)
    }

    #[test]
    fn test_candle_validity() {
        assert!(candle(100.0, 110.0, 95.0, 105.0).is_valid());
        assert!(!candle(100.0, 99.0, 95.0, 105.0).is_valid());
        assert!(!candle(f64::NAN, 110.0, 95.0, 105.0).is_valid());
    }

    #[test]
    fn test_sanitize_clean_candle() {
        let c = candle(100.0, 110.0, 95.0, 105.0);
        let result = c.sanitize().unwrap();
        assert_eq!(result, Sanitized::Clean(c));
        assert!(!result.was_repaired());
    }

    #[test]
    fn test_sanitize_swaps_inverted_high_low() {
        let result = candle(100.0, 95.0, 110.0, 105.0).sanitize().unwrap();
        assert!(result.was_repaired());
        let c = result.candle();
        assert_eq!(c.high, 110.0);
        assert_eq!(c.low, 95.0);
        assert!(c.is_valid());
    }

    #[test]
    fn test_sanitize_clamps_wicks_to_body() {
        // High below close, low above open
        let c = candle(100.0, 104.0, 101.0, 106.0).sanitize().unwrap().candle();
        assert_eq!(c.high, 106.0);
        assert_eq!(c.low, 100.0);
        assert!(c.is_valid());
    }

    #[test]
    fn test_sanitize_rejects_non_finite() {
        let err = candle(100.0, f64::INFINITY, 95.0, 105.0)
            .sanitize()
            .unwrap_err();
        assert!(matches!(err, CandleError::NonFinite { field: "high", .. }));
    }

    #[test]
    fn test_sanitize_rejects_non_positive() {
        let err = candle(100.0, 110.0, 0.0, 105.0).sanitize().unwrap_err();
        assert!(matches!(err, CandleError::NonPositive { field: "low", .. }));
    }

    #[test]
    fn test_candle_wire_format() {
        let c = candle(100.0, 110.0, 95.0, 105.0);
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"o\":100.0"));
        assert!(json.contains("\"v\":1000"));
        let back: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }

    #[test]
    fn test_open_datetime() {
        let c = Candle::new(0, 1.0, 1.0, 1.0, 1.0, 0);
        assert_eq!(c.open_datetime().unwrap().timestamp(), 0);
    }

    #[test]
    fn test_interval_parse() {
        assert_eq!(Interval::parse("1m"), Some(Interval::M1));
        assert_eq!(Interval::parse("60m"), Some(Interval::H1));
        assert_eq!(Interval::parse(" 1D "), Some(Interval::D1));
        assert_eq!(Interval::parse("1wk"), Some(Interval::W1));
        assert_eq!(Interval::parse("3m"), None);
    }

    #[test]
    fn test_interval_duration() {
        assert_eq!(Interval::M1.duration_ms(), 60_000);
        assert_eq!(Interval::H1.duration_ms(), 3_600_000);
        assert_eq!(Interval::from_duration_ms(300_000), Some(Interval::M5));
        assert_eq!(Interval::from_duration_ms(12_345), None);
    }
}
