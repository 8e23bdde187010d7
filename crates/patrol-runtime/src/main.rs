//! # Patrol Runtime
//!
//! Replays a recorded patrol round through the round execution engine.
//!
//! ## Startup
//!
//! 1. Load runtime configuration from the environment
//! 2. Install structured logging
//! 3. Load the fixture (path argument, else `RONDA_FIXTURE`)
//! 4. Seed the in-memory stores and replay every step

use anyhow::{Context, Result};
use patrol_runtime::config::COMPONENT;
use patrol_runtime::{Fixture, ReplayRuntime, RuntimeConfig};
use ronda_telemetry::{init_telemetry, log_checkpoint_event};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().with_fixture_arg(std::env::args().nth(1));
    init_telemetry(config.telemetry.clone()).context("failed to initialize telemetry")?;

    config
        .engine
        .validate()
        .context("invalid round engine configuration")?;

    info!("===========================================");
    info!("  Patrol Round Replay");
    info!("===========================================");
    info!(fixture = %config.fixture_path.display(), "Loading fixture");

    let fixture = Fixture::load(&config.fixture_path)?;
    let runtime = ReplayRuntime::new(config);
    let report = runtime
        .run(&fixture)
        .await
        .with_context(|| format!("replay of round {} aborted", fixture.round.id))?;

    info!(
        round_id = %report.round_id,
        status = %report.progress.status,
        visited = report.progress.visited,
        total = report.progress.total,
        applied = report.applied,
        events = report.events.len(),
        "Replay complete"
    );
    for visit in &report.visits {
        log_checkpoint_event!(
            info,
            COMPONENT,
            "Visit on record",
            report.round_id,
            visit.checkpoint_id,
            visit_id = %visit.id,
            check_in = ?visit.check_in,
            duration_ms = visit.duration_ms
        );
    }
    for rejected in &report.rejected {
        warn!(
            step = rejected.index,
            action = rejected.action,
            reason = rejected.kind,
            retryable = rejected.retryable,
            "{}",
            rejected.message
        );
    }

    Ok(())
}
