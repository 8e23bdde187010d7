//! # Fixture Replay
//!
//! Wires the round engine to in-memory stores, the event bus and a manual
//! clock, then drives it through a fixture one step at a time.
//!
//! ```text
//! Fixture steps ──→ RoundExecutionApi ──→ InMemoryRoundStore / InMemoryBaseControlStore
//!                          │
//!                          └── PatrolEvent ──→ InMemoryEventBus ──→ replay log
//! ```
//!
//! A rejected step is logged and the replay moves on, the way a field device
//! shows the guard an error and waits for the next action.

use crate::config::{RuntimeConfig, COMPONENT};
use crate::fixture::{Fixture, StepAction};
use rd_01_round_execution::adapters::{
    EventBusNotifier, InMemoryBaseControlStore, InMemoryRoundStore, ManualTimeSource,
};
use rd_01_round_execution::ports::{LocationOutcome, RoundExecutionApi, RoundProgress};
use rd_01_round_execution::{RoundError, RoundExecutionService, RoundResult};
use ronda_telemetry::{log_event, log_round_event};
use serde::Serialize;
use shared_bus::{EventFilter, InMemoryEventBus, PatrolEvent};
use shared_types::{CheckpointVisit, RoundId, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// The engine as the runtime wires it.
pub type PatrolEngine =
    RoundExecutionService<InMemoryRoundStore, InMemoryBaseControlStore, EventBusNotifier>;

#[derive(Debug, Error)]
pub enum ReplayError {
    /// Only raised when the runtime is told to stop on the first rejection.
    #[error("step {index} ({action}) rejected: {source}")]
    StepRejected {
        index: usize,
        action: &'static str,
        #[source]
        source: RoundError,
    },

    #[error(transparent)]
    Engine(#[from] RoundError),
}

/// A step the engine refused.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedStep {
    pub index: usize,
    pub action: &'static str,
    pub kind: &'static str,
    pub retryable: bool,
    pub message: String,
}

/// What a replay did to the round.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub round_id: RoundId,
    pub applied: usize,
    pub rejected: Vec<RejectedStep>,
    pub progress: RoundProgress,
    pub visits: Vec<CheckpointVisit>,
    /// Events published on the bus for this round, in order.
    pub events: Vec<PatrolEvent>,
}

impl ReplayReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    pub fn rejected_kinds(&self) -> Vec<&'static str> {
        self.rejected.iter().map(|r| r.kind).collect()
    }
}

/// Owns the engine and the adapters behind it.
pub struct ReplayRuntime {
    config: RuntimeConfig,
    engine: Arc<PatrolEngine>,
    round_store: Arc<InMemoryRoundStore>,
    base_control: Arc<InMemoryBaseControlStore>,
    event_bus: Arc<InMemoryEventBus>,
    clock: Arc<ManualTimeSource>,
}

impl ReplayRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        let round_store = Arc::new(InMemoryRoundStore::new());
        let base_control = Arc::new(InMemoryBaseControlStore::new());
        let event_bus = Arc::new(InMemoryEventBus::with_capacity(config.event_capacity));
        let clock = Arc::new(ManualTimeSource::new(0));

        let engine = Arc::new(RoundExecutionService::new(
            config.engine.clone(),
            Arc::clone(&round_store),
            Arc::clone(&base_control),
            Arc::new(EventBusNotifier::new(Arc::clone(&event_bus))),
            clock.clone(),
        ));

        Self {
            config,
            engine,
            round_store,
            base_control,
            event_bus,
            clock,
        }
    }

    pub fn engine(&self) -> &Arc<PatrolEngine> {
        &self.engine
    }

    pub fn round_store(&self) -> &Arc<InMemoryRoundStore> {
        &self.round_store
    }

    pub fn event_bus(&self) -> &Arc<InMemoryEventBus> {
        &self.event_bus
    }

    /// Seed the stores from `fixture` and run every step.
    pub async fn run(&self, fixture: &Fixture) -> Result<ReplayReport, ReplayError> {
        let round_id = fixture.round.id.clone();

        self.round_store.insert(fixture.snapshot());
        for record in &fixture.base_records {
            self.base_control.insert(record.clone());
        }
        self.clock.set(fixture.start_time);

        let mut subscription = self
            .event_bus
            .subscribe(EventFilter::for_rounds(vec![round_id.clone()]));

        let opened = self.engine.open_round(&round_id).await?;
        log_round_event!(
            info,
            COMPONENT,
            "Replay started",
            round_id,
            status = %opened.status,
            visited = opened.visited,
            total = opened.total,
            steps = fixture.steps.len()
        );

        let mut applied = 0;
        let mut rejected = Vec::new();

        for (index, step) in fixture.steps.iter().enumerate() {
            if let Some(at) = step.at {
                self.clock.set(at);
            }
            let action = step.action.name();

            match self.apply(&round_id, &step.action).await {
                Ok(summary) => {
                    applied += 1;
                    log_round_event!(
                        info,
                        COMPONENT,
                        "Step applied",
                        round_id,
                        step = index,
                        action,
                        outcome = %summary
                    );
                }
                Err(err) => {
                    log_round_event!(
                        warn,
                        COMPONENT,
                        "Step rejected",
                        round_id,
                        step = index,
                        action,
                        reason = err.kind(),
                        retryable = err.is_retryable(),
                        hint = err.user_hint(),
                        error = %err
                    );
                    if self.config.stop_on_rejection {
                        return Err(ReplayError::StepRejected {
                            index,
                            action,
                            source: err,
                        });
                    }
                    rejected.push(RejectedStep {
                        index,
                        action,
                        kind: err.kind(),
                        retryable: err.is_retryable(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let events = subscription.drain();
        for event in &events {
            log_event!(debug, COMPONENT, "Bus event", topic = ?event.topic());
        }

        let progress = self.engine.progress(&round_id)?;
        let visits = self.engine.visits(&round_id)?;
        log_round_event!(
            info,
            COMPONENT,
            "Replay finished",
            round_id,
            status = %progress.status,
            visited = progress.visited,
            total = progress.total,
            applied,
            rejected = rejected.len(),
            events = events.len()
        );

        Ok(ReplayReport {
            round_id,
            applied,
            rejected,
            progress,
            visits,
            events,
        })
    }

    /// Run one step, returning a short description of what changed.
    async fn apply(&self, round_id: &RoundId, action: &StepAction) -> RoundResult<String> {
        let engine = &self.engine;
        let summary = match action {
            StepAction::Depart { odometer_km } => {
                let record = engine.record_departure(round_id, *odometer_km).await?;
                format!("departed at {} km", record.odometer_km)
            }
            StepAction::Scan { scanned } => {
                let outcome = engine.submit_scan(round_id, scanned).await?;
                format!(
                    "checked in at {} by {:?}, {} missing",
                    outcome.checkpoint_id,
                    outcome.method,
                    outcome.missing.len()
                )
            }
            StepAction::Location { lat, lng } => {
                let point = shared_types::Coordinate::new(*lat, *lng);
                match engine.update_location(round_id, point).await? {
                    LocationOutcome::Idle => "no checkpoint left".to_string(),
                    LocationOutcome::OutsideGeofence {
                        checkpoint_id,
                        distance_m,
                    } => match distance_m {
                        Some(d) => format!("{d:.0} m from {checkpoint_id}"),
                        None => format!("{checkpoint_id} has no geofence"),
                    },
                    LocationOutcome::CheckedIn {
                        checkpoint_id,
                        missing,
                    } => format!("inside {checkpoint_id}, {} missing", missing.len()),
                    LocationOutcome::AutoFinalized(outcome) => {
                        format!("auto-finalized {}", outcome.visit.checkpoint_id)
                    }
                }
            }
            StepAction::Check { item_id, checked } => {
                let report = engine.set_checklist_item(round_id, item_id, *checked).await?;
                format!("{item_id} = {checked}, {} missing", report.missing.len())
            }
            StepAction::Photo { photo } => {
                let report = engine.attach_photo(round_id, photo.clone()).await?;
                format!("photo attached, {} missing", report.missing.len())
            }
            StepAction::Signature { signature } => {
                let report = engine.attach_signature(round_id, signature.clone()).await?;
                format!("signature attached, {} missing", report.missing.len())
            }
            StepAction::RoundSignature { signature } => {
                engine
                    .attach_round_signature(round_id, signature.clone())
                    .await?;
                "round signature attached".to_string()
            }
            StepAction::Finalize { checkpoint_id } => {
                let outcome = engine.finalize_checkpoint(round_id, checkpoint_id).await?;
                match outcome.next_checkpoint {
                    Some(next) => format!("visit {} recorded, next {next}", outcome.visit.id),
                    None => format!("visit {} recorded, route done", outcome.visit.id),
                }
            }
            StepAction::Cancel => {
                let report = engine.cancel_attempt(round_id).await?;
                format!("attempt at {} restarted", report.attempt.checkpoint_id)
            }
            StepAction::Arrive { odometer_km } => {
                let record = engine.record_arrival(round_id, *odometer_km).await?;
                format!("arrived at {} km", record.odometer_km)
            }
            StepAction::Incident { description } => {
                engine.report_incident(round_id, description).await?;
                "incident flagged".to_string()
            }
            StepAction::Complete => {
                let round = engine.complete_round(round_id).await?;
                format!("round closed as {}", round.status)
            }
            StepAction::Resync => {
                let progress = engine.resync(round_id).await?;
                format!("resynced at {}/{}", progress.visited, progress.total)
            }
            StepAction::StoreOutage => {
                self.round_store
                    .fail_next_write(StoreError::Unavailable("simulated outage".to_string()));
                "next round store write will fail".to_string()
            }
        };
        Ok(summary)
    }
}
