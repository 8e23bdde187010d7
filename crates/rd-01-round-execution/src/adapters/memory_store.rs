//! In-memory store adapters
//!
//! Back the engine in tests and in fixture replay. Writes can be delayed or
//! made to fail so callers can exercise storage outages and overlapping
//! requests.

use crate::ports::outbound::{
    BaseControlStore, NewVisit, RoundSnapshot, RoundStatusUpdate, RoundStore,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{
    BaseControlKind, BaseControlRecord, CheckpointVisit, Round, RoundId, StoreError, Timestamp,
    VisitId,
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Failure and latency knobs shared by the in-memory stores.
#[derive(Debug, Default)]
struct WriteFaults {
    /// Fails every write until cleared.
    persistent: RwLock<Option<StoreError>>,
    /// Fails the next write only.
    next: RwLock<Option<StoreError>>,
    delay: RwLock<Option<Duration>>,
}

impl WriteFaults {
    async fn before_write(&self) -> Result<(), StoreError> {
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.next.write().take() {
            return Err(err);
        }
        match self.persistent.read().as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Rounds, checkpoints and visits held in memory.
#[derive(Debug, Default)]
pub struct InMemoryRoundStore {
    rounds: RwLock<HashMap<RoundId, RoundSnapshot>>,
    faults: WriteFaults,
}

impl InMemoryRoundStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a round.
    pub fn insert(&self, snapshot: RoundSnapshot) {
        self.rounds
            .write()
            .insert(snapshot.round.id.clone(), snapshot);
    }

    pub fn round(&self, round_id: &RoundId) -> Option<Round> {
        self.rounds.read().get(round_id).map(|s| s.round.clone())
    }

    pub fn visits(&self, round_id: &RoundId) -> Vec<CheckpointVisit> {
        self.rounds
            .read()
            .get(round_id)
            .map(|s| s.visits.clone())
            .unwrap_or_default()
    }

    /// Fail every write with `err` until called with `None`.
    pub fn set_write_failure(&self, err: Option<StoreError>) {
        *self.faults.persistent.write() = err;
    }

    pub fn fail_next_write(&self, err: StoreError) {
        *self.faults.next.write() = Some(err);
    }

    /// Sleep before every write.
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *self.faults.delay.write() = delay;
    }
}

#[async_trait]
impl RoundStore for InMemoryRoundStore {
    async fn load_round(&self, round_id: &RoundId) -> Result<RoundSnapshot, StoreError> {
        self.rounds
            .read()
            .get(round_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(round_id.to_string()))
    }

    async fn record_visit(&self, visit: NewVisit) -> Result<VisitId, StoreError> {
        self.faults.before_write().await?;

        let mut rounds = self.rounds.write();
        let snapshot = rounds
            .get_mut(&visit.round_id)
            .ok_or_else(|| StoreError::NotFound(visit.round_id.to_string()))?;

        if !snapshot
            .checkpoints
            .iter()
            .any(|cp| cp.id == visit.checkpoint_id)
        {
            return Err(StoreError::Rejected(format!(
                "checkpoint {} is not part of round {}",
                visit.checkpoint_id, visit.round_id
            )));
        }
        if snapshot
            .visits
            .iter()
            .any(|v| v.checkpoint_id == visit.checkpoint_id)
        {
            return Err(StoreError::DuplicateVisit {
                round_id: visit.round_id.to_string(),
                checkpoint_id: visit.checkpoint_id.to_string(),
            });
        }

        let id = VisitId::from(Uuid::new_v4().to_string());
        debug!(round_id = %visit.round_id, checkpoint_id = %visit.checkpoint_id, visit_id = %id, "Visit stored");
        snapshot.visits.push(visit.into_visit(id.clone()));
        Ok(id)
    }

    async fn update_round_status(&self, update: RoundStatusUpdate) -> Result<(), StoreError> {
        self.faults.before_write().await?;

        let mut rounds = self.rounds.write();
        let snapshot = rounds
            .get_mut(&update.round_id)
            .ok_or_else(|| StoreError::NotFound(update.round_id.to_string()))?;

        let round = &mut snapshot.round;
        round.status = update.status;
        if update.start_time.is_some() {
            round.start_time = update.start_time;
        }
        if update.end_time.is_some() {
            round.end_time = update.end_time;
        }
        if update.signature.is_some() {
            round.signature = update.signature;
        }
        Ok(())
    }
}

/// Departure and arrival records held in memory.
#[derive(Debug, Default)]
pub struct InMemoryBaseControlStore {
    records: RwLock<HashMap<(RoundId, BaseControlKind), BaseControlRecord>>,
    faults: WriteFaults,
}

impl InMemoryBaseControlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly.
    pub fn insert(&self, record: BaseControlRecord) {
        self.records
            .write()
            .insert((record.round_id.clone(), record.kind), record);
    }

    pub fn set_write_failure(&self, err: Option<StoreError>) {
        *self.faults.persistent.write() = err;
    }

    pub fn fail_next_write(&self, err: StoreError) {
        *self.faults.next.write() = Some(err);
    }

    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *self.faults.delay.write() = delay;
    }

    fn get(&self, round_id: &RoundId, kind: BaseControlKind) -> Option<BaseControlRecord> {
        self.records.read().get(&(round_id.clone(), kind)).cloned()
    }

    async fn record(
        &self,
        round_id: &RoundId,
        kind: BaseControlKind,
        odometer_km: f64,
        at: Timestamp,
    ) -> Result<BaseControlRecord, StoreError> {
        self.faults.before_write().await?;

        let mut records = self.records.write();
        let key = (round_id.clone(), kind);
        if records.contains_key(&key) {
            return Err(StoreError::Rejected(format!(
                "{:?} already recorded for round {}",
                kind, round_id
            )));
        }
        let record = BaseControlRecord {
            round_id: round_id.clone(),
            kind,
            odometer_km,
            recorded_at: at,
        };
        records.insert(key, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl BaseControlStore for InMemoryBaseControlStore {
    async fn departure(&self, round_id: &RoundId) -> Result<Option<BaseControlRecord>, StoreError> {
        Ok(self.get(round_id, BaseControlKind::Departure))
    }

    async fn arrival(&self, round_id: &RoundId) -> Result<Option<BaseControlRecord>, StoreError> {
        Ok(self.get(round_id, BaseControlKind::Arrival))
    }

    async fn record_departure(
        &self,
        round_id: &RoundId,
        odometer_km: f64,
        at: Timestamp,
    ) -> Result<BaseControlRecord, StoreError> {
        self.record(round_id, BaseControlKind::Departure, odometer_km, at)
            .await
    }

    async fn record_arrival(
        &self,
        round_id: &RoundId,
        odometer_km: f64,
        at: Timestamp,
    ) -> Result<BaseControlRecord, StoreError> {
        self.record(round_id, BaseControlKind::Arrival, odometer_km, at)
            .await
    }
}
