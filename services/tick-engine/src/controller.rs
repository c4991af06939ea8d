//! Simulation controller
//!
//! Single owner of all playback state. Commands and polls are applied one at
//! a time and each returns the events it produced, in emission order.
//!
//! ```text
//!            INIT
//!   Idle ───────────► Loaded ◄──────────── STOP (any non-Idle state)
//!                       │ PLAY
//!                       ▼
//!                    Playing ◄──PLAY── Paused
//!                       │  └──PAUSE──────►
//!                       │ last candle exhausted
//!                       ▼
//!                   Completed ──PLAY──► Playing (restart at candle 0)
//! ```
//!
//! Every INIT, STOP, SEEK and restart bumps the epoch. Events produced
//! after a bump carry the new epoch; nothing from the superseded candle is
//! emitted afterwards because its plan is discarded in the same step.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::candle::Candle;
use types::ids::Epoch;

use crate::aggregator::LiveCandleAggregator;
use crate::clock::PlaybackClock;
use crate::config::{ConfigError, EngineConfig};
use crate::events::{Command, Event};
use crate::ingestion::CandleIngester;
use crate::metrics::EngineMetrics;
use crate::plan::CandlePlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Loaded,
    Playing,
    Paused,
    Completed,
}

pub struct SimulationController {
    config: EngineConfig,
    state: PlaybackState,
    epoch: Epoch,
    candles: Vec<Candle>,
    avg_volumes: Vec<f64>,
    duration_ms: u64,
    index: usize,
    plan: Option<CandlePlan>,
    /// Next tick of the current plan to fire.
    next_tick: usize,
    /// Ticks below this index were already counted as throttled.
    throttled_through: usize,
    backlog: usize,
    clock: PlaybackClock,
    aggregator: LiveCandleAggregator,
    metrics: EngineMetrics,
    last_poll_ms: Option<f64>,
    polls_since_metrics: u64,
}

impl SimulationController {
    /// Validate `config` and build an idle controller.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    pub fn with_defaults() -> Self {
        Self::from_validated(EngineConfig::default())
    }

    fn from_validated(config: EngineConfig) -> Self {
        let clock = PlaybackClock::new(config.playback.min_speed, config.playback.max_speed);
        info!(
            seed = config.seed,
            poll_interval_ms = config.playback.poll_interval_ms,
            max_ticks_per_poll = config.playback.max_ticks_per_poll,
            "SimulationController initialized"
        );
        Self {
            config,
            state: PlaybackState::Idle,
            epoch: Epoch::ZERO,
            candles: Vec::new(),
            avg_volumes: Vec::new(),
            duration_ms: 0,
            index: 0,
            plan: None,
            next_tick: 0,
            throttled_through: 0,
            backlog: 0,
            clock,
            aggregator: LiveCandleAggregator::new(),
            metrics: EngineMetrics::default(),
            last_poll_ms: None,
            polls_since_metrics: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn candle_index(&self) -> usize {
        self.index
    }

    pub fn candle_count(&self) -> usize {
        self.candles.len()
    }

    pub fn candle_duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn speed(&self) -> f64 {
        self.clock.speed()
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub fn plan(&self) -> Option<&CandlePlan> {
        self.plan.as_ref()
    }

    /// Index of the next tick to fire in the current candle.
    pub fn next_tick(&self) -> usize {
        self.next_tick
    }

    /// Apply one command.
    pub fn handle(&mut self, command: Command, now_ms: f64) -> Vec<Event> {
        debug!(command = command.type_label(), epoch = %self.epoch, "Command received");

        if self.state == PlaybackState::Idle && !matches!(command, Command::Init { .. }) {
            warn!(command = command.type_label(), "Command ignored before INIT");
            return vec![self.warning(format!("{} ignored: no data loaded", command.type_label()))];
        }

        match command {
            Command::Init {
                candles,
                history,
                interval,
            } => self.init(&candles, &history, &interval),
            Command::Play { speed } => self.play(speed, now_ms),
            Command::Pause => self.pause(now_ms),
            Command::Stop => self.stop(),
            Command::SetSpeed { speed } => self.set_speed(speed, now_ms),
            Command::Seek { candle_index } => self.seek(candle_index, now_ms),
        }
    }

    fn init(&mut self, candles: &[Candle], history: &[Candle], interval: &str) -> Vec<Event> {
        let report = CandleIngester::new(self.config.ingestion.clone()).ingest(candles, history, interval);

        self.epoch = self.epoch.next();
        self.metrics
            .record_ingest(report.repaired, report.dropped, report.trimmed);
        self.discard_candle();
        self.clock.reset();
        self.index = 0;
        self.last_poll_ms = None;
        self.duration_ms = report.duration_ms;

        let mut events = vec![Event::DataReady {
            candle_count: report.candles.len(),
            repaired: report.repaired,
            dropped: report.dropped,
            trimmed: report.trimmed,
            epoch: self.epoch,
        }];

        if report.trimmed > 0 {
            events.push(self.warning(format!(
                "{} candles trimmed for non-advancing timestamps",
                report.trimmed
            )));
        }
        for gap in &report.gaps {
            events.push(Event::GapDetected {
                candle_index: gap.candle_index,
                from_t: gap.from_t,
                to_t: gap.to_t,
                missing: gap.missing,
                epoch: self.epoch,
            });
        }

        if report.is_empty() {
            self.candles.clear();
            self.avg_volumes.clear();
            self.state = PlaybackState::Idle;
            events.push(self.warning("INIT contained no valid candles".to_string()));
            return events;
        }

        self.candles = report.candles;
        self.avg_volumes = report.avg_volumes;
        self.state = PlaybackState::Loaded;

        info!(
            epoch = %self.epoch,
            candle_count = self.candles.len(),
            duration_ms = self.duration_ms,
            "Data loaded"
        );
        events
    }

    fn play(&mut self, speed: Option<f64>, now_ms: f64) -> Vec<Event> {
        if self.state == PlaybackState::Playing {
            return Vec::new();
        }

        let mut events = Vec::new();
        if self.state == PlaybackState::Completed {
            self.epoch = self.epoch.next();
            self.discard_candle();
            self.clock.reset();
            self.index = 0;
            info!(epoch = %self.epoch, "Restarting from first candle");
        }

        if let Some(speed) = speed {
            self.clock.set_speed(now_ms, speed);
        }
        if self.plan.is_none() {
            self.enter_candle(self.index, &mut events);
        }

        self.clock.play(now_ms);
        self.last_poll_ms = Some(now_ms);
        self.state = PlaybackState::Playing;
        info!(epoch = %self.epoch, candle_index = self.index, speed = self.clock.speed(), "Playing");

        events.push(self.playback_state());
        events
    }

    fn pause(&mut self, now_ms: f64) -> Vec<Event> {
        if self.state != PlaybackState::Playing {
            return Vec::new();
        }
        self.clock.pause(now_ms);
        self.state = PlaybackState::Paused;
        info!(epoch = %self.epoch, candle_index = self.index, tick_index = self.next_tick, "Paused");
        vec![self.playback_state()]
    }

    fn stop(&mut self) -> Vec<Event> {
        self.epoch = self.epoch.next();
        self.discard_candle();
        self.clock.reset();
        self.index = 0;
        self.last_poll_ms = None;
        self.state = PlaybackState::Loaded;
        info!(epoch = %self.epoch, "Stopped");

        vec![
            self.playback_state(),
            Event::CandleChange {
                new_index: 0,
                epoch: self.epoch,
            },
        ]
    }

    fn set_speed(&mut self, speed: f64, now_ms: f64) -> Vec<Event> {
        let applied = self.clock.set_speed(now_ms, speed);
        if applied != speed {
            debug!(requested = speed, applied = applied, "Speed clamped");
        }
        info!(epoch = %self.epoch, speed = applied, "Speed changed");
        vec![self.playback_state()]
    }

    fn seek(&mut self, candle_index: usize, now_ms: f64) -> Vec<Event> {
        let target = candle_index.min(self.candles.len().saturating_sub(1));
        self.epoch = self.epoch.next();
        self.discard_candle();
        self.clock.rebase(now_ms, 0.0);
        self.last_poll_ms = Some(now_ms);
        if self.state == PlaybackState::Completed {
            self.state = PlaybackState::Paused;
        }
        info!(epoch = %self.epoch, requested = candle_index, candle_index = target, "Seek");

        let mut events = Vec::new();
        self.enter_candle(target, &mut events);
        events
    }

    /// Advance playback to `now_ms`, firing due ticks up to the per-poll cap.
    pub fn poll(&mut self, now_ms: f64) -> Vec<Event> {
        let mut events = Vec::new();
        if self.state != PlaybackState::Playing {
            return events;
        }

        let playback = &self.config.playback;
        let late_after = playback.poll_interval_ms as f64 * playback.late_poll_factor;
        let late = self
            .last_poll_ms
            .is_some_and(|last| now_ms - last > late_after);
        let mut budget = if late {
            playback.catch_up_ticks_per_poll
        } else {
            playback.max_ticks_per_poll
        };
        self.last_poll_ms = Some(now_ms);
        self.metrics.record_poll(late);
        if late {
            debug!(epoch = %self.epoch, budget = budget, "Late poll, catching up");
        }

        let mut fired_any = false;
        loop {
            if self.plan.is_none() {
                self.enter_candle(self.index, &mut events);
            }
            let Some(plan) = self.plan.as_ref() else {
                break;
            };

            let elapsed = self.clock.elapsed(now_ms);
            let due = plan.schedule().due_count(elapsed);
            let fire_end = due.min(self.next_tick + budget);

            for tick in &plan.ticks()[self.next_tick.min(fire_end)..fire_end] {
                events.push(Event::Tick {
                    price: tick.price,
                    volume: tick.volume,
                    timestamp: plan.tick_timestamp(tick),
                    candle_index: tick.candle_index,
                    tick_index: tick.tick_index,
                    epoch: self.epoch,
                });
                if let Some(candle) = self.aggregator.on_tick(tick.price, now_ms) {
                    events.push(Event::CandleUpdate {
                        candle,
                        epoch: self.epoch,
                    });
                }
            }
            let fired = fire_end.saturating_sub(self.next_tick);
            if fired > 0 {
                fired_any = true;
                budget -= fired;
                self.next_tick = fire_end;
                self.metrics.record_processed(fired);
            }

            self.backlog = due.saturating_sub(self.next_tick);
            if self.backlog > 0 {
                let newly = due.saturating_sub(self.next_tick.max(self.throttled_through));
                self.throttled_through = self.throttled_through.max(due);
                if newly > 0 {
                    self.metrics.record_throttled(newly);
                    debug!(
                        epoch = %self.epoch,
                        candle_index = self.index,
                        deferred = self.backlog,
                        newly_throttled = newly,
                        "Tick cap reached"
                    );
                }
                break;
            }

            let duration = plan.duration_ms() as f64;
            if self.next_tick < plan.len() || elapsed < duration {
                break;
            }

            // Candle exhausted and its span has passed.
            let overshoot = elapsed - duration;
            self.metrics.record_candle_completed();
            if self.index + 1 < self.candles.len() {
                self.index += 1;
                self.discard_candle();
                self.clock.rebase(now_ms, overshoot);
                continue;
            }

            self.clock.pause(now_ms);
            self.state = PlaybackState::Completed;
            info!(epoch = %self.epoch, candle_count = self.candles.len(), "Playback complete");
            events.push(self.playback_state());
            events.push(Event::Complete { epoch: self.epoch });
            break;
        }

        if !fired_any && self.state == PlaybackState::Playing {
            if let Some(candle) = self.aggregator.refresh_due(now_ms, self.clock.speed()) {
                events.push(Event::CandleUpdate {
                    candle,
                    epoch: self.epoch,
                });
            }
        }

        let every = self.config.playback.metrics_every_polls;
        if every > 0 {
            self.polls_since_metrics += 1;
            if self.polls_since_metrics >= every {
                self.polls_since_metrics = 0;
                events.push(self.metrics_event());
            }
        }

        events
    }

    pub fn metrics_event(&self) -> Event {
        Event::Metrics {
            tick_backlog: self.backlog,
            total_processed: self.metrics.total_processed,
            total_throttled: self.metrics.total_throttled,
            total_dropped: self.metrics.total_dropped,
            epoch: self.epoch,
        }
    }

    fn warning(&self, message: String) -> Event {
        Event::Warning {
            message,
            epoch: self.epoch,
        }
    }

    fn playback_state(&self) -> Event {
        Event::PlaybackState {
            is_playing: self.state == PlaybackState::Playing,
            speed: self.clock.speed(),
            epoch: self.epoch,
        }
    }

    /// Build the plan for `index` and open its running aggregate.
    fn enter_candle(&mut self, index: usize, events: &mut Vec<Event>) {
        let Some(candle) = self.candles.get(index).copied() else {
            return;
        };
        let avg_volume = self.avg_volumes.get(index).copied().unwrap_or(0.0);
        let plan = CandlePlan::build(
            &self.config,
            index,
            &candle,
            avg_volume,
            self.duration_ms,
            self.clock.speed(),
        );
        debug!(
            epoch = %self.epoch,
            candle_index = index,
            tick_count = plan.len(),
            pattern = ?plan.profile().pattern,
            "Candle planned"
        );

        self.index = index;
        self.plan = Some(plan);
        self.next_tick = 0;
        self.throttled_through = 0;
        self.backlog = 0;
        let aggregate = self.aggregator.begin(&candle);

        events.push(Event::CandleChange {
            new_index: index,
            epoch: self.epoch,
        });
        events.push(Event::CandleUpdate {
            candle: aggregate,
            epoch: self.epoch,
        });
    }

    fn discard_candle(&mut self) {
        self.plan = None;
        self.next_tick = 0;
        self.throttled_through = 0;
        self.backlog = 0;
        self.aggregator.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: f64 = 60_000.0;

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64;
                Candle::new(i as i64 * 60_000, base, base + 10.0, base - 5.0, base + 5.0, 10_000)
            })
            .collect()
    }

    fn loaded(n: usize) -> SimulationController {
        let mut c = SimulationController::with_defaults();
        c.handle(
            Command::Init {
                candles: candles(n),
                history: Vec::new(),
                interval: "1m".to_string(),
            },
            0.0,
        );
        c
    }

    fn ticks(events: &[Event]) -> Vec<(usize, usize)> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Tick {
                    candle_index,
                    tick_index,
                    ..
                } => Some((*candle_index, *tick_index)),
                _ => None,
            })
            .collect()
    }

    /// Poll every 16 ms from `from` through `to`.
    fn run(c: &mut SimulationController, from: f64, to: f64) -> Vec<Event> {
        let mut events = Vec::new();
        let mut now = from;
        while now <= to {
            events.extend(c.poll(now));
            now += 16.0;
        }
        events
    }

    #[test]
    fn test_init_loads() {
        let mut c = SimulationController::with_defaults();
        let events = c.handle(
            Command::Init {
                candles: candles(3),
                history: Vec::new(),
                interval: "1m".to_string(),
            },
            0.0,
        );
        assert_eq!(c.state(), PlaybackState::Loaded);
        assert_eq!(c.epoch(), Epoch::new(1));
        assert!(matches!(
            events[0],
            Event::DataReady {
                candle_count: 3,
                dropped: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_commands_before_init_warn() {
        let mut c = SimulationController::with_defaults();
        let events = c.handle(Command::Play { speed: None }, 0.0);
        assert!(matches!(events.as_slice(), [Event::Warning { .. }]));
        assert_eq!(c.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_play_emits_state_and_first_candle() {
        let mut c = loaded(2);
        let events = c.handle(Command::Play { speed: None }, 0.0);
        assert!(matches!(events[0], Event::CandleChange { new_index: 0, .. }));
        assert!(matches!(events[1], Event::CandleUpdate { .. }));
        assert!(matches!(
            events.last(),
            Some(Event::PlaybackState {
                is_playing: true,
                ..
            })
        ));
        assert!(c.handle(Command::Play { speed: None }, 5.0).is_empty());
    }

    #[test]
    fn test_first_poll_fires_opening_tick() {
        let mut c = loaded(1);
        c.handle(Command::Play { speed: None }, 0.0);
        let events = c.poll(0.0);
        assert_eq!(ticks(&events), vec![(0, 0)]);
    }

    #[test]
    fn test_plays_through_to_completion() {
        let mut c = loaded(2);
        c.handle(Command::Play { speed: None }, 0.0);
        let events = run(&mut c, 0.0, 2.0 * MINUTE + 100.0);
        let fired = ticks(&events);

        let total: usize = fired.len();
        assert_eq!(c.state(), PlaybackState::Completed);
        assert!(events.iter().any(|e| matches!(e, Event::Complete { .. })));

        // Each candle fires all its ticks exactly once, in order.
        let first: Vec<usize> = fired.iter().filter(|t| t.0 == 0).map(|t| t.1).collect();
        let second: Vec<usize> = fired.iter().filter(|t| t.0 == 1).map(|t| t.1).collect();
        assert_eq!(first, (0..first.len()).collect::<Vec<_>>());
        assert_eq!(second, (0..second.len()).collect::<Vec<_>>());
        assert_eq!(total, first.len() + second.len());
        assert_eq!(c.metrics().total_processed, total as u64);
        assert_eq!(c.metrics().total_throttled, 0);
    }

    #[test]
    fn test_pause_resume_no_refire_no_skip() {
        let mut c = loaded(1);
        c.handle(Command::Play { speed: None }, 0.0);
        let mut events = run(&mut c, 0.0, 20_000.0);
        c.handle(Command::Pause, 20_010.0);
        let paused = run(&mut c, 20_020.0, 90_000.0);
        assert!(ticks(&paused).is_empty());

        c.handle(Command::Play { speed: None }, 100_000.0);
        events.extend(run(&mut c, 100_000.0, 160_000.0));
        let fired = ticks(&events);
        let indices: Vec<usize> = fired.iter().map(|t| t.1).collect();
        assert_eq!(indices, (0..indices.len()).collect::<Vec<_>>());
        assert_eq!(c.state(), PlaybackState::Completed);
    }

    #[test]
    fn test_speed_change_continuity() {
        let mut c = loaded(1);
        c.handle(Command::Play { speed: None }, 0.0);
        run(&mut c, 0.0, 30_000.0);
        let before = c.next_tick();
        c.handle(Command::SetSpeed { speed: 4.0 }, 30_000.0);
        // No jump at the instant of the change
        let events = c.poll(30_000.0);
        assert!(ticks(&events).is_empty());
        assert_eq!(c.next_tick(), before);

        // Remaining ~30s of candle time plays in ~7.5s of wall time
        run(&mut c, 30_016.0, 38_000.0);
        assert_eq!(c.state(), PlaybackState::Completed);
    }

    #[test]
    fn test_seek_invalidates_in_flight_candle() {
        let mut c = loaded(8);
        c.handle(Command::Seek { candle_index: 2 }, 0.0);
        c.handle(Command::Play { speed: None }, 0.0);
        run(&mut c, 0.0, 20_000.0);
        assert_eq!(c.candle_index(), 2);
        let old_epoch = c.epoch();

        let events = c.handle(Command::Seek { candle_index: 5 }, 20_001.0);
        assert!(c.epoch() > old_epoch);
        assert!(c.is_playing());

        let mut after = events.clone();
        after.extend(run(&mut c, 20_001.0, 30_000.0));
        assert!(after.iter().all(|e| e.epoch() == c.epoch()));
        assert!(ticks(&after).iter().all(|t| t.0 == 5));
        match &events[1] {
            Event::CandleUpdate { candle, .. } => {
                assert_eq!(candle.open(), 105.0);
                assert_eq!(candle.close(), 105.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_seek_clamps_and_keeps_pause() {
        let mut c = loaded(3);
        let events = c.handle(Command::Seek { candle_index: 99 }, 0.0);
        assert_eq!(c.candle_index(), 2);
        assert_eq!(c.state(), PlaybackState::Loaded);
        assert!(matches!(events[0], Event::CandleChange { new_index: 2, .. }));
        assert!(c.poll(1_000.0).is_empty());
    }

    #[test]
    fn test_stop_resets() {
        let mut c = loaded(3);
        c.handle(Command::Play { speed: None }, 0.0);
        run(&mut c, 0.0, 70_000.0);
        assert_eq!(c.candle_index(), 1);
        let epoch = c.epoch();

        let events = c.handle(Command::Stop, 70_001.0);
        assert_eq!(c.state(), PlaybackState::Loaded);
        assert_eq!(c.candle_index(), 0);
        assert_eq!(c.epoch(), epoch.next());
        assert!(matches!(events[0], Event::PlaybackState { is_playing: false, .. }));
        assert!(matches!(events[1], Event::CandleChange { new_index: 0, .. }));
        assert!(c.plan().is_none());
    }

    #[test]
    fn test_play_after_complete_restarts() {
        let mut c = loaded(1);
        c.handle(Command::Play { speed: None }, 0.0);
        run(&mut c, 0.0, 61_000.0);
        assert_eq!(c.state(), PlaybackState::Completed);
        let epoch = c.epoch();

        let events = c.handle(Command::Play { speed: None }, 62_000.0);
        assert_eq!(c.state(), PlaybackState::Playing);
        assert_eq!(c.epoch(), epoch.next());
        assert!(matches!(events[0], Event::CandleChange { new_index: 0, .. }));
        assert_eq!(ticks(&c.poll(62_000.0)), vec![(0, 0)]);
    }

    #[test]
    fn test_throttled_counts_each_tick_once() {
        let mut config = EngineConfig::default();
        config.playback.max_ticks_per_poll = 2;
        config.playback.catch_up_ticks_per_poll = 2;
        config.playback.metrics_every_polls = 0;
        let mut c = SimulationController::new(config).unwrap();
        c.handle(
            Command::Init {
                candles: candles(1),
                history: Vec::new(),
                interval: "1m".to_string(),
            },
            0.0,
        );
        c.handle(Command::Play { speed: None }, 0.0);

        // Whole candle due at once
        let first = c.poll(59_999.0);
        let total = c.plan().unwrap().len();
        assert_eq!(ticks(&first).len(), 2);
        assert_eq!(c.metrics().total_throttled, (total - 2) as u64);

        // Later polls drain the backlog without recounting it
        let mut drained = 2;
        let mut now = 59_999.0;
        while c.next_tick() < total {
            now += 16.0;
            drained += ticks(&c.poll(now)).len();
        }
        assert_eq!(drained, total);
        assert_eq!(c.metrics().total_throttled, (total - 2) as u64);
        assert_eq!(c.metrics().total_dropped, 0);
    }

    #[test]
    fn test_dropped_counts_invalid_candles() {
        let mut c = SimulationController::with_defaults();
        let mut data = candles(3);
        data[1].open = f64::NAN;
        let events = c.handle(
            Command::Init {
                candles: data,
                history: Vec::new(),
                interval: "1m".to_string(),
            },
            0.0,
        );
        assert!(matches!(
            events[0],
            Event::DataReady {
                candle_count: 2,
                dropped: 1,
                ..
            }
        ));
        assert_eq!(c.metrics().total_dropped, 1);
        assert_eq!(c.metrics().total_throttled, 0);
    }

    #[test]
    fn test_late_poll_uses_catch_up_cap() {
        let mut config = EngineConfig::default();
        config.playback.max_ticks_per_poll = 2;
        config.playback.catch_up_ticks_per_poll = 5;
        let mut c = SimulationController::new(config).unwrap();
        c.handle(
            Command::Init {
                candles: candles(1),
                history: Vec::new(),
                interval: "1m".to_string(),
            },
            0.0,
        );
        c.handle(Command::Play { speed: None }, 0.0);
        c.poll(0.0);
        c.poll(16.0);

        // Host stalled for 50 seconds
        let events = c.poll(50_016.0);
        assert_eq!(ticks(&events).len(), 5);
        assert_eq!(c.metrics().late_polls, 1);

        // Back on cadence: normal cap
        let events = c.poll(50_032.0);
        assert_eq!(ticks(&events).len(), 2);
    }

    #[test]
    fn test_overshoot_carries_into_next_candle() {
        let mut c = loaded(3);
        c.handle(Command::Play { speed: None }, 0.0);
        run(&mut c, 0.0, 59_984.0);

        // One late poll lands 30s into the second candle
        let events = c.poll(90_000.0);
        assert_eq!(c.candle_index(), 1);
        let expected = c.plan().unwrap().schedule().due_count(30_000.0);
        let second: Vec<(usize, usize)> =
            ticks(&events).into_iter().filter(|t| t.0 == 1).collect();
        assert!(expected > 1);
        assert_eq!(second.len(), expected);
    }

    #[test]
    fn test_speed_clamped_in_state_event() {
        let mut c = loaded(1);
        let events = c.handle(Command::SetSpeed { speed: 1_000.0 }, 0.0);
        assert!(matches!(
            events[0],
            Event::PlaybackState { speed, is_playing: false, .. } if speed == 100.0
        ));
    }

    #[test]
    fn test_metrics_event_periodic() {
        let mut config = EngineConfig::default();
        config.playback.metrics_every_polls = 3;
        let mut c = SimulationController::new(config).unwrap();
        c.handle(
            Command::Init {
                candles: candles(1),
                history: Vec::new(),
                interval: "1m".to_string(),
            },
            0.0,
        );
        c.handle(Command::Play { speed: None }, 0.0);
        let events = run(&mut c, 0.0, 32.0);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, Event::Metrics { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.density.min_ticks = 100;
        config.density.max_ticks = 10;
        assert!(matches!(
            SimulationController::new(config),
            Err(ConfigError::Invalid { field: "density.max_ticks", .. })
        ));

        let mut config = EngineConfig::default();
        config.playback.min_speed = 50.0;
        config.playback.max_speed = 5.0;
        assert!(matches!(
            SimulationController::new(config),
            Err(ConfigError::Invalid { field: "playback.speed", .. })
        ));
    }

    #[test]
    fn test_seek_after_complete_pauses_then_resumes_there() {
        let mut c = loaded(3);
        c.handle(Command::Play { speed: None }, 0.0);
        run(&mut c, 0.0, 3.0 * MINUTE + 100.0);
        assert_eq!(c.state(), PlaybackState::Completed);
        let epoch = c.epoch();

        let now = 200_000.0;
        let events = c.handle(Command::Seek { candle_index: 1 }, now);
        assert_eq!(c.state(), PlaybackState::Paused);
        assert_eq!(c.candle_index(), 1);
        assert_eq!(c.epoch(), epoch.next());
        assert!(matches!(events[0], Event::CandleChange { new_index: 1, .. }));
        assert!(c.poll(now + 500.0).is_empty());

        let events = c.handle(Command::Play { speed: None }, now + 1_000.0);
        assert_eq!(c.state(), PlaybackState::Playing);
        assert_eq!(c.epoch(), epoch.next());
        assert!(!events.iter().any(|e| matches!(e, Event::CandleChange { .. })));
        assert_eq!(ticks(&c.poll(now + 1_000.0)), vec![(1, 0)]);

        let rest = run(&mut c, now + 1_016.0, now + 1_000.0 + 2.0 * MINUTE + 100.0);
        let fired = ticks(&rest);
        assert!(fired.iter().all(|t| t.0 == 1 || t.0 == 2));
        assert!(fired.iter().any(|t| t.0 == 2));
        assert_eq!(c.state(), PlaybackState::Completed);
    }

    #[test]
    fn test_max_volume_candle_plays_without_overflow() {
        let mut c = SimulationController::with_defaults();
        let mut data = candles(1);
        data[0].volume = u64::MAX;
        c.handle(
            Command::Init {
                candles: data,
                history: Vec::new(),
                interval: "1m".to_string(),
            },
            0.0,
        );
        c.handle(Command::Play { speed: None }, 0.0);
        let events = run(&mut c, 0.0, MINUTE + 100.0);
        assert_eq!(c.state(), PlaybackState::Completed);

        let volume: u128 = events
            .iter()
            .filter_map(|e| match e {
                Event::Tick { volume, .. } => Some(*volume as u128),
                _ => None,
            })
            .sum();
        assert_eq!(volume, u64::MAX as u128);
    }
}
