//! Replay a candle file as a JSON-lines event stream.
//!
//! Usage: `tick-replay <candles.json> [speed] [config.json]`
//!
//! The candle file is a JSON array of `{t, o, h, l, c, v}` objects. Events
//! are written to stdout one per line until playback completes.

use std::io::Write;

use anyhow::Context;
use tick_engine::{spawn, Command, EngineConfig, Event};
use types::candle::Candle;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let mut args = std::env::args().skip(1);
    let candles_path = args
        .next()
        .context("usage: tick-replay <candles.json> [speed] [config.json]")?;
    let speed: f64 = match args.next() {
        Some(s) => s.parse().with_context(|| format!("invalid speed {:?}", s))?,
        None => 1.0,
    };
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
            EngineConfig::from_json_str(&json)?
        }
        None => EngineConfig::default(),
    };

    let json = std::fs::read_to_string(&candles_path)
        .with_context(|| format!("reading {}", candles_path))?;
    let candles: Vec<Candle> = serde_json::from_str(&json).context("parsing candles")?;

    tracing::info!(candles = candles.len(), speed = speed, "Starting replay");

    let (handle, mut events) = spawn(config);
    handle
        .send(Command::Init {
            candles,
            history: Vec::new(),
            interval: String::new(),
        })
        .await?;
    handle.send(Command::Play { speed: Some(speed) }).await?;

    let stdout = std::io::stdout();
    while let Some(event) = events.recv().await {
        let done = matches!(event, Event::Complete { .. });
        let mut out = stdout.lock();
        serde_json::to_writer(&mut out, &event)?;
        writeln!(out)?;
        if done {
            break;
        }
        match event {
            Event::DataReady { candle_count: 0, .. } => {
                anyhow::bail!("no playable candles in {}", candles_path)
            }
            Event::Error { message, .. } => anyhow::bail!("engine error: {}", message),
            _ => {}
        }
    }

    let metrics = handle.shutdown().await?;
    tracing::info!(
        total_processed = metrics.total_processed,
        total_throttled = metrics.total_throttled,
        total_dropped = metrics.total_dropped,
        "Replay finished"
    );
    Ok(())
}
