//! Volume profile distribution
//!
//! Splits a candle's total volume across its ticks. The first and last 15%
//! of ticks carry heavier weights to mimic open and close activity. Values
//! are floored and the whole rounding remainder lands on the last tick, so
//! the sum always equals the candle volume exactly.

use crate::rng::SeededRng;

/// Share of ticks at each edge that gets the heavy weighting.
const EDGE_FRACTION: f64 = 0.15;
const EDGE_WEIGHT: (f64, f64) = (3.0, 6.0);
const MIDDLE_WEIGHT: (f64, f64) = (0.5, 1.0);
const JITTER: (f64, f64) = (0.8, 1.2);

/// Distribute `total` across `tick_count` ticks.
///
/// A zero tick count is raised to one unless there is no volume to place.
pub fn distribute(total: u64, tick_count: usize, rng: &mut SeededRng) -> Vec<u64> {
    if tick_count == 0 {
        return if total == 0 { Vec::new() } else { vec![total] };
    }

    let edge = tick_count as f64 * EDGE_FRACTION;
    let weights: Vec<f64> = (0..tick_count)
        .map(|i| {
            let position = i as f64;
            let is_edge = position < edge || position >= tick_count as f64 - edge;
            let (lo, hi) = if is_edge { EDGE_WEIGHT } else { MIDDLE_WEIGHT };
            rng.range(lo, hi) * rng.range(JITTER.0, JITTER.1)
        })
        .collect();

    let weight_sum: f64 = weights.iter().sum();
    let mut volumes: Vec<u64> = weights
        .iter()
        .map(|w| ((w / weight_sum) * total as f64).floor() as u64)
        .collect();

    // Float error may overshoot; trim from the front, then the remainder
    // goes to the last tick. Sums are u128 since volumes reach u64::MAX.
    let mut excess = volumes
        .iter()
        .map(|&v| v as u128)
        .sum::<u128>()
        .saturating_sub(total as u128);
    for v in volumes.iter_mut() {
        if excess == 0 {
            break;
        }
        let take = (*v as u128).min(excess);
        *v -= take as u64;
        excess -= take;
    }

    let assigned: u128 = volumes.iter().map(|&v| v as u128).sum();
    if let Some(last) = volumes.last_mut() {
        *last += (total as u128 - assigned) as u64;
    }

    volumes
}
