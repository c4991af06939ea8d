//! Candle ingestion
//!
//! Prepares an INIT payload for playback:
//! - repairs inverted or inconsistent OHLC values
//! - drops candles with non-finite or non-positive prices
//! - trims candles whose timestamp does not advance
//! - resolves the candle duration from the interval label or the data
//! - flags gaps wider than the interval
//! - computes the rolling average volume used for tick density

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::candle::{Candle, Interval, Sanitized};

/// Fallback duration when neither the label nor the data decide.
pub const DEFAULT_DURATION_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Candles in the rolling volume average.
    pub volume_window: usize,
    /// A spacing larger than `gap_multiple × duration` is a gap.
    pub gap_multiple: f64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            volume_window: 20,
            gap_multiple: 1.5,
        }
    }
}

/// A hole in the candle timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gap {
    /// Index of the candle after the gap.
    pub candle_index: usize,
    pub from_t: i64,
    pub to_t: i64,
    /// Whole intervals missing between the two candles.
    pub missing: u64,
}

/// The cleaned sequence plus everything learned while cleaning it.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub candles: Vec<Candle>,
    /// Rolling average volume before each candle; `0.0` without history.
    pub avg_volumes: Vec<f64>,
    pub interval: Option<Interval>,
    pub duration_ms: u64,
    pub repaired: usize,
    pub dropped: usize,
    pub trimmed: usize,
    pub gaps: Vec<Gap>,
}

impl IngestReport {
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

pub struct CandleIngester {
    config: IngestionConfig,
}

impl CandleIngester {
    pub fn new(config: IngestionConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(IngestionConfig::default())
    }

    /// Clean `candles`, using `history` only to seed the volume average.
    pub fn ingest(&self, candles: &[Candle], history: &[Candle], interval_label: &str) -> IngestReport {
        let mut report = IngestReport::default();

        let mut last_t: Option<i64> = None;
        for raw in candles {
            let candle = match raw.sanitize() {
                Ok(Sanitized::Clean(c)) => c,
                Ok(Sanitized::Repaired(c)) => {
                    report.repaired += 1;
                    debug!(t = c.t, "Candle repaired");
                    c
                }
                Err(e) => {
                    report.dropped += 1;
                    warn!(t = raw.t, error = %e, "Candle dropped");
                    continue;
                }
            };

            if last_t.is_some_and(|last| candle.t <= last) {
                report.trimmed += 1;
                warn!(t = candle.t, last_t = ?last_t, "Non-advancing candle timestamp trimmed");
                continue;
            }
            last_t = Some(candle.t);
            report.candles.push(candle);
        }

        let (interval, duration_ms) = resolve_duration(interval_label, &report.candles);
        report.interval = interval;
        report.duration_ms = duration_ms;
        report.gaps = self.detect_gaps(&report.candles, duration_ms);
        for gap in &report.gaps {
            let at = &report.candles[gap.candle_index];
            warn!(
                candle_index = gap.candle_index,
                from = ?report.candles[gap.candle_index - 1].open_datetime(),
                to = ?at.open_datetime(),
                missing = gap.missing,
                "Gap in candle timeline"
            );
        }
        report.avg_volumes = self.rolling_average_volume(history, &report.candles);

        info!(
            accepted = report.candles.len(),
            repaired = report.repaired,
            dropped = report.dropped,
            trimmed = report.trimmed,
            gaps = report.gaps.len(),
            interval = interval.map(|i| i.label()).unwrap_or("custom"),
            duration_ms = duration_ms,
            "Candles ingested"
        );

        report
    }

    fn detect_gaps(&self, candles: &[Candle], duration_ms: u64) -> Vec<Gap> {
        let duration = duration_ms as f64;
        candles
            .windows(2)
            .enumerate()
            .filter_map(|(i, pair)| {
                let spacing = (pair[1].t - pair[0].t) as f64;
                if spacing <= duration * self.config.gap_multiple {
                    return None;
                }
                Some(Gap {
                    candle_index: i + 1,
                    from_t: pair[0].t,
                    to_t: pair[1].t,
                    missing: ((spacing / duration).round() as u64).saturating_sub(1),
                })
            })
            .collect()
    }

    /// Average of up to `volume_window` volumes strictly before each candle.
    fn rolling_average_volume(&self, history: &[Candle], candles: &[Candle]) -> Vec<f64> {
        let window = self.config.volume_window.max(1);
        let mut recent: VecDeque<u64> = VecDeque::with_capacity(window);
        // u128 so a full window of large volumes cannot overflow.
        let mut sum: u128 = 0;

        for c in history.iter().filter(|c| c.sanitize().is_ok()) {
            push_window(&mut recent, &mut sum, window, c.volume);
        }

        let mut averages = Vec::with_capacity(candles.len());
        for c in candles {
            averages.push(if recent.is_empty() {
                0.0
            } else {
                sum as f64 / recent.len() as f64
            });
            push_window(&mut recent, &mut sum, window, c.volume);
        }
        averages
    }
}

fn push_window(recent: &mut VecDeque<u64>, sum: &mut u128, window: usize, volume: u64) {
    if recent.len() == window {
        if let Some(old) = recent.pop_front() {
            *sum -= old as u128;
        }
    }
    recent.push_back(volume);
    *sum += volume as u128;
}

/// Interval label first, then the median candle spacing, then one minute.
pub fn resolve_duration(label: &str, candles: &[Candle]) -> (Option<Interval>, u64) {
    if let Some(interval) = Interval::parse(label) {
        return (Some(interval), interval.duration_ms());
    }

    let mut spacings: Vec<i64> = candles
        .windows(2)
        .map(|pair| pair[1].t - pair[0].t)
        .filter(|&d| d > 0)
        .collect();
    if spacings.is_empty() {
        return (Some(Interval::M1), DEFAULT_DURATION_MS);
    }
    spacings.sort_unstable();
    let median = spacings[spacings.len() / 2] as u64;
    (Interval::from_duration_ms(median), median)
}
