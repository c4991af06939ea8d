//! Engine runner
//!
//! Hosts a `SimulationController` on its own tokio task. Commands arrive on
//! an mpsc mailbox, a fixed-cadence interval drives `poll`, and events leave
//! on a bounded mpsc channel in production order. The task is the only
//! owner of controller state, so a poll never overlaps a command.
//!
//! A configuration that fails validation is reported as an `ERROR` event and
//! the task ends with `EngineError::InvalidConfig`. Losing the event receiver
//! is fatal too: the task stops and the join result carries
//! `EngineError::DeliveryFailed`.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};
use types::errors::EngineError;
use types::ids::{Epoch, SessionId};

use crate::config::EngineConfig;
use crate::controller::SimulationController;
use crate::events::{Command, Event};
use crate::metrics::EngineMetrics;
use crate::SERVICE_VERSION;

/// Client side of a running engine.
pub struct EngineHandle {
    session_id: SessionId,
    commands: mpsc::Sender<Command>,
    task: JoinHandle<Result<EngineMetrics, EngineError>>,
}

impl EngineHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Queue a command for the engine task.
    pub async fn send(&self, command: Command) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::Shutdown)
    }

    /// Close the mailbox and wait for the task to finish.
    pub async fn shutdown(self) -> Result<EngineMetrics, EngineError> {
        drop(self.commands);
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(EngineError::DeliveryFailed {
                reason: format!("engine task failed: {}", e),
            }),
        }
    }
}

/// Spawn an engine task on the current tokio runtime.
pub fn spawn(config: EngineConfig) -> (EngineHandle, mpsc::Receiver<Event>) {
    let capacity = config.channel_capacity.max(1);
    let (command_tx, command_rx) = mpsc::channel(capacity);
    let (event_tx, event_rx) = mpsc::channel(capacity);
    let session_id = SessionId::new();

    let task = tokio::spawn(run(config, session_id, command_rx, event_tx));

    (
        EngineHandle {
            session_id,
            commands: command_tx,
            task,
        },
        event_rx,
    )
}

async fn run(
    config: EngineConfig,
    session_id: SessionId,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<Event>,
) -> Result<EngineMetrics, EngineError> {
    let poll_interval = Duration::from_millis(config.playback.poll_interval_ms.max(1));
    let mut controller = match SimulationController::new(config) {
        Ok(controller) => controller,
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Engine configuration rejected");
            deliver(
                &events,
                Event::Error {
                    message: e.to_string(),
                    epoch: Epoch::ZERO,
                },
            )
            .await?;
            return Err(EngineError::InvalidConfig {
                reason: e.to_string(),
            });
        }
    };
    let origin = Instant::now();
    let now_ms = || origin.elapsed().as_secs_f64() * 1_000.0;

    info!(session_id = %session_id, version = SERVICE_VERSION, "Engine task started");
    deliver(
        &events,
        Event::Ready {
            session_id,
            epoch: controller.epoch(),
        },
    )
    .await?;

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let produced = tokio::select! {
            biased;
            command = commands.recv() => match command {
                Some(command) => controller.handle(command, now_ms()),
                None => break,
            },
            _ = ticker.tick() => controller.poll(now_ms()),
        };

        for event in produced {
            deliver(&events, event).await?;
        }
    }

    let metrics = *controller.metrics();
    info!(
        session_id = %session_id,
        total_processed = metrics.total_processed,
        total_throttled = metrics.total_throttled,
        total_dropped = metrics.total_dropped,
        "Engine task stopped"
    );
    Ok(metrics)
}

async fn deliver(events: &mpsc::Sender<Event>, event: Event) -> Result<(), EngineError> {
    let label = event.type_label();
    events.send(event).await.map_err(|_| {
        error!(event = label, "Event receiver dropped");
        EngineError::DeliveryFailed {
            reason: format!("receiver closed while sending {}", label),
        }
    })
}
