//! Replay a captured feed through the full pipeline.
//!
//! Reads newline-delimited JSON `RawFeedEvent`s from a file, ingests them
//! in order, and prints the session result. Useful for re-running a
//! recorded market day against changed parameters.
//!
//! Usage: `tapeflow-replay <events.jsonl> [config.toml]`

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use tapeflow_core::RawFeedEvent;
use tapeflow_engine::{Engine, EngineConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tapeflow_telemetry::init_logging()?;

    let mut args = std::env::args().skip(1);
    let Some(events_path) = args.next() else {
        bail!("usage: tapeflow-replay <events.jsonl> [config.toml]");
    };

    let config = match args.next() {
        Some(path) => EngineConfig::from_file(&path)?,
        None => EngineConfig::load()?,
    };

    let engine = Engine::new(config);
    engine.apply_subscriptions();

    let raw = std::fs::read_to_string(&events_path)
        .with_context(|| format!("failed to read {events_path}"))?;

    let mut ingested = 0u64;
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RawFeedEvent>(line) {
            Ok(event) => {
                engine.ingest(&event).await;
                ingested += 1;
            }
            Err(e) => {
                warn!(lineno = lineno + 1, error = %e, "unparseable event line skipped");
            }
        }
    }

    engine.shutdown().await;

    let positions = engine.positions();
    info!(
        ingested,
        trades = positions.trades_taken(),
        pnl = %positions.get_total_pnl(),
        open_positions = positions.positions_snapshot().len(),
        "replay complete"
    );
    for record in positions.records_snapshot() {
        println!(
            "{} {} entry {} -> exit {} pnl {} ({})",
            record.instrument,
            record.side,
            record.entry_price,
            record.exit_price,
            record.pnl,
            record.reason
        );
    }

    Ok(())
}
