//! Playback clock
//!
//! Maps host wall time (milliseconds, monotonic) to simulated elapsed time
//! inside the current candle: `elapsed = (now - segment_start) * speed`.
//! Speed changes and resumes rebase `segment_start` so the simulated
//! position is continuous across them.

use tracing::debug;

pub const DEFAULT_SPEED: f64 = 1.0;
pub const DEFAULT_MIN_SPEED: f64 = 0.1;
pub const DEFAULT_MAX_SPEED: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    playing: bool,
    speed: f64,
    segment_start_ms: f64,
    /// Simulated position while stopped or paused.
    held_elapsed_ms: f64,
    min_speed: f64,
    max_speed: f64,
}

impl PlaybackClock {
    /// An inverted band collapses to `min_speed`.
    pub fn new(min_speed: f64, max_speed: f64) -> Self {
        Self {
            playing: false,
            speed: DEFAULT_SPEED,
            segment_start_ms: 0.0,
            held_elapsed_ms: 0.0,
            min_speed,
            max_speed: max_speed.max(min_speed),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MIN_SPEED, DEFAULT_MAX_SPEED)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Clamp a requested speed into the accepted band.
    ///
    /// Non-finite and non-positive requests fall back to `DEFAULT_SPEED`.
    pub fn clamp_speed(&self, speed: f64) -> f64 {
        if !speed.is_finite() || speed <= 0.0 {
            return DEFAULT_SPEED.clamp(self.min_speed, self.max_speed);
        }
        speed.clamp(self.min_speed, self.max_speed)
    }

    /// Simulated milliseconds elapsed in the current candle.
    pub fn elapsed(&self, now_ms: f64) -> f64 {
        if self.playing {
            ((now_ms - self.segment_start_ms) * self.speed).max(0.0)
        } else {
            self.held_elapsed_ms
        }
    }

    /// Start (or resume) running from the held position. No-op while playing.
    pub fn play(&mut self, now_ms: f64) {
        if self.playing {
            return;
        }
        self.playing = true;
        self.segment_start_ms = now_ms - self.held_elapsed_ms / self.speed;
        debug!(elapsed_ms = self.held_elapsed_ms, speed = self.speed, "Clock started");
    }

    /// Freeze the simulated position. No-op while paused.
    pub fn pause(&mut self, now_ms: f64) {
        if !self.playing {
            return;
        }
        self.held_elapsed_ms = self.elapsed(now_ms);
        self.playing = false;
        debug!(elapsed_ms = self.held_elapsed_ms, "Clock paused");
    }

    /// Change speed keeping the simulated position continuous. Returns the
    /// speed actually applied.
    pub fn set_speed(&mut self, now_ms: f64, speed: f64) -> f64 {
        let speed = self.clamp_speed(speed);
        let elapsed = self.elapsed(now_ms);
        self.speed = speed;
        self.rebase(now_ms, elapsed);
        speed
    }

    /// Place the simulated position at `elapsed_ms` as of `now_ms`.
    pub fn rebase(&mut self, now_ms: f64, elapsed_ms: f64) {
        let elapsed_ms = elapsed_ms.max(0.0);
        self.held_elapsed_ms = elapsed_ms;
        if self.playing {
            self.segment_start_ms = now_ms - elapsed_ms / self.speed;
        }
    }

    /// Stop and rewind to zero. Speed is kept.
    pub fn reset(&mut self) {
        self.playing = false;
        self.segment_start_ms = 0.0;
        self.held_elapsed_ms = 0.0;
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::with_defaults()
    }
}
