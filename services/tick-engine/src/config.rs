//! Engine configuration
//!
//! Every section has defaults matching the documented constants, so an
//! empty JSON object is a valid configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use types::numeric::TickSizeSchedule;

use crate::clock::{DEFAULT_MAX_SPEED, DEFAULT_MIN_SPEED};
use crate::density::TickDensityConfig;
use crate::ingestion::IngestionConfig;
use crate::synth::SynthesisConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Poll cadence and per-poll work caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub poll_interval_ms: u64,
    /// Ticks fired per on-time poll.
    pub max_ticks_per_poll: usize,
    /// Ticks fired by a late poll's catch-up burst.
    pub catch_up_ticks_per_poll: usize,
    /// A poll is late when more than this many intervals have elapsed.
    pub late_poll_factor: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    /// Emit a METRICS event every this many polls; 0 disables.
    pub metrics_every_polls: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 16,
            max_ticks_per_poll: 16,
            catch_up_ticks_per_poll: 64,
            late_poll_factor: 2.0,
            min_speed: DEFAULT_MIN_SPEED,
            max_speed: DEFAULT_MAX_SPEED,
            metrics_every_polls: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root seed for every per-candle random stream.
    pub seed: u64,
    pub density: TickDensityConfig,
    pub synthesis: SynthesisConfig,
    pub playback: PlaybackConfig,
    pub ingestion: IngestionConfig,
    pub tick_size: TickSizeSchedule,
    /// Capacity of the runner's command and event channels.
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            density: TickDensityConfig::default(),
            synthesis: SynthesisConfig::default(),
            playback: PlaybackConfig::default(),
            ingestion: IngestionConfig::default(),
            tick_size: TickSizeSchedule::idx(),
            channel_capacity: 4_096,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.density;
        if !(d.base_rate.is_finite() && d.base_rate > 0.0) {
            return Err(ConfigError::invalid("density.base_rate", "must be positive"));
        }
        if d.min_ticks < 2 {
            return Err(ConfigError::invalid("density.min_ticks", "must be at least 2"));
        }
        if d.max_ticks < d.min_ticks {
            return Err(ConfigError::invalid(
                "density.max_ticks",
                format!("must be >= min_ticks ({})", d.min_ticks),
            ));
        }

        let s = &self.synthesis;
        if !(s.noise_level.is_finite() && s.noise_level >= 0.0) {
            return Err(ConfigError::invalid("synthesis.noise_level", "must be non-negative"));
        }
        if !(s.base_frequency.is_finite() && s.base_frequency > 0.0) {
            return Err(ConfigError::invalid("synthesis.base_frequency", "must be positive"));
        }
        if !(s.gbm.sigma.is_finite() && s.gbm.sigma >= 0.0) || !s.gbm.mu.is_finite() {
            return Err(ConfigError::invalid("synthesis.gbm", "mu must be finite, sigma non-negative"));
        }

        let p = &self.playback;
        if p.poll_interval_ms == 0 {
            return Err(ConfigError::invalid("playback.poll_interval_ms", "must be positive"));
        }
        if p.max_ticks_per_poll == 0 {
            return Err(ConfigError::invalid("playback.max_ticks_per_poll", "must be positive"));
        }
        if p.catch_up_ticks_per_poll < p.max_ticks_per_poll {
            return Err(ConfigError::invalid(
                "playback.catch_up_ticks_per_poll",
                "must be >= max_ticks_per_poll",
            ));
        }
        if !(p.late_poll_factor.is_finite() && p.late_poll_factor >= 1.0) {
            return Err(ConfigError::invalid("playback.late_poll_factor", "must be >= 1"));
        }
        if !(p.min_speed.is_finite() && p.min_speed > 0.0 && p.max_speed.is_finite())
            || p.max_speed < p.min_speed
            || !(p.min_speed..=p.max_speed).contains(&1.0)
        {
            return Err(ConfigError::invalid(
                "playback.speed",
                "need 0 < min_speed <= 1 <= max_speed",
            ));
        }

        if self.ingestion.volume_window == 0 {
            return Err(ConfigError::invalid("ingestion.volume_window", "must be positive"));
        }
        if !(self.ingestion.gap_multiple.is_finite() && self.ingestion.gap_multiple >= 1.0) {
            return Err(ConfigError::invalid("ingestion.gap_multiple", "must be >= 1"));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::invalid("channel_capacity", "must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::NoiseModel;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{
            "seed": 7,
            "synthesis": { "noise_model": "gbm", "gbm": { "sigma": 0.1 } },
            "playback": { "max_ticks_per_poll": 8 }
        }"#;
        let config = EngineConfig::from_json_str(json).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.synthesis.noise_model, NoiseModel::Gbm);
        assert_eq!(config.synthesis.gbm.sigma, 0.1);
        assert_eq!(config.synthesis.gbm.mu, 0.0);
        assert_eq!(config.synthesis.noise_level, 0.05);
        assert_eq!(config.playback.max_ticks_per_poll, 8);
        assert_eq!(config.playback.catch_up_ticks_per_poll, 64);
    }

    #[test]
    fn test_custom_tick_size() {
        let json = r#"{ "tick_size": [ { "below": null, "step": "0.01" } ] }"#;
        let config = EngineConfig::from_json_str(json).unwrap();
        assert_eq!(config.tick_size.round(10.236), 10.24);
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig {
            seed: 99,
            ..EngineConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_invalid() {
        let err = EngineConfig::from_json_str(r#"{ "playback": { "poll_interval_ms": 0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "playback.poll_interval_ms", .. }));

        let err = EngineConfig::from_json_str(r#"{ "density": { "min_ticks": 50, "max_ticks": 20 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "density.max_ticks", .. }));

        let err = EngineConfig::from_json_str(r#"{ "playback": { "min_speed": 2.0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "playback.speed", .. }));

        assert!(matches!(
            EngineConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_bad_tick_size() {
        let json = r#"{ "tick_size": [] }"#;
        assert!(matches!(EngineConfig::from_json_str(json), Err(ConfigError::Parse(_))));
    }
}
