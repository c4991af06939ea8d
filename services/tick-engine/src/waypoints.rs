//! Waypoint path planning
//!
//! Turns a pattern classification into the ordered target prices the tick
//! path must pass through. Every path starts at the open and ends at the
//! close. Only neutral candles consume randomness (one draw).

use types::candle::Candle;

use crate::pattern::{PatternProfile, PatternType};
use crate::rng::SeededRng;

/// Below this draw a neutral candle visits its extremes in inverted order.
const NEUTRAL_INVERSION_THRESHOLD: f64 = 0.3;

/// Plan the waypoint sequence for a candle.
pub fn plan(candle: &Candle, profile: &PatternProfile, rng: &mut SeededRng) -> Vec<f64> {
    let Candle {
        open,
        high,
        low,
        close,
        ..
    } = *candle;

    let interior: Vec<f64> = match profile.pattern {
        PatternType::Hammer => {
            let rebound = close - low;
            vec![low, low + 0.3 * rebound, low + 0.1 * rebound]
        }
        PatternType::ShootingStar => {
            let rejection = high - close;
            vec![high, high - 0.3 * rejection, high - 0.1 * rejection]
        }
        PatternType::Marubozu => Vec::new(),
        PatternType::Doji => {
            let mid = (high + low) / 2.0;
            vec![high, low, mid + 0.5 * (high - mid), mid - 0.5 * (mid - low)]
        }
        PatternType::Neutral => {
            let inverted = rng.unit() < NEUTRAL_INVERSION_THRESHOLD;
            // Bullish candles dip first, bearish candles rally first.
            let low_first = profile.is_bullish != inverted;
            if low_first {
                vec![low, high]
            } else {
                vec![high, low]
            }
        }
    };

    collapse(open, &interior, close)
}

/// Assemble `[open, interior.., close]` dropping consecutive duplicates.
fn collapse(open: f64, interior: &[f64], close: f64) -> Vec<f64> {
    let mut path = Vec::with_capacity(interior.len() + 2);
    path.push(open);
    for &price in interior.iter().chain(std::iter::once(&close)) {
        if path.last().is_some_and(|&last| last == price) {
            continue;
        }
        path.push(price);
    }
    if path.len() == 1 {
        // open == close with nothing in between
        path.push(close);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::analyze;

    fn candle(o: f64, h: f64, l: f64, c: f64) -> Candle {
        Candle::new(0, o, h, l, c, 1000)
    }

    fn plan_for(c: &Candle, seed: u64) -> Vec<f64> {
        let profile = analyze(c);
        plan(c, &profile, &mut SeededRng::new(seed))
    }

    #[test]
    fn test_hammer_template() {
        let c = candle(100.0, 100.0, 40.0, 95.0);
        let path = plan_for(&c, 1);
        assert_eq!(path, vec![100.0, 40.0, 40.0 + 0.3 * 55.0, 40.0 + 0.1 * 55.0, 95.0]);
    }

    #[test]
    fn test_shooting_star_template() {
        let c = candle(100.0, 160.0, 99.0, 102.0);
        let path = plan_for(&c, 1);
        assert_eq!(path.len(), 5);
        assert_eq!(path[1], 160.0);
        assert_eq!(path[2], 160.0 - 0.3 * 58.0);
        assert_eq!(path[3], 160.0 - 0.1 * 58.0);
        assert_eq!(*path.last().unwrap(), 102.0);
    }

    #[test]
    fn test_marubozu_template() {
        let c = candle(100.0, 120.5, 99.5, 120.0);
        assert_eq!(plan_for(&c, 1), vec![100.0, 120.0]);
    }

    #[test]
    fn test_doji_template() {
        let c = candle(100.0, 110.0, 90.0, 100.5);
        let path = plan_for(&c, 1);
        assert_eq!(path, vec![100.0, 110.0, 90.0, 105.0, 95.0, 100.5]);
    }

    #[test]
    fn test_neutral_visits_both_extremes() {
        let c = candle(100.0, 110.0, 95.0, 105.0);
        for seed in 0..50 {
            let path = plan_for(&c, seed);
            assert_eq!(path.len(), 4);
            assert_eq!(path[0], 100.0);
            assert_eq!(path[3], 105.0);
            let mut mids = [path[1], path[2]];
            mids.sort_by(f64::total_cmp);
            assert_eq!(mids, [95.0, 110.0]);
        }
    }

    #[test]
    fn test_neutral_order_depends_on_draw() {
        let c = candle(100.0, 110.0, 95.0, 105.0);
        let orders: std::collections::HashSet<bool> =
            (0..100).map(|seed| plan_for(&c, seed)[1] == 95.0).collect();
        assert_eq!(orders.len(), 2, "both visitation orders should occur");
    }

    #[test]
    fn test_neutral_skips_extreme_at_close() {
        // Bullish, closes on the high: path collapses to open → low → close
        let c = candle(100.0, 110.0, 95.0, 110.0);
        let profile = PatternProfile {
            pattern: PatternType::Neutral,
            ..analyze(&c)
        };
        for seed in 0..20 {
            let path = plan(&c, &profile, &mut SeededRng::new(seed));
            assert_eq!(path[0], 100.0);
            assert_eq!(*path.last().unwrap(), 110.0);
            assert!(path.len() == 3 || path.len() == 4);
        }
    }

    #[test]
    fn test_flat_candle_path() {
        let c = candle(100.0, 100.0, 100.0, 100.0);
        assert_eq!(plan_for(&c, 1), vec![100.0, 100.0]);
    }
}
