//! Driven Ports (SPI - Outbound Dependencies)
//!
//! The engine never talks to a backend directly. Whatever persists rounds,
//! base-control records and events sits behind these traits.

use async_trait::async_trait;
use shared_bus::PatrolEvent;
use shared_types::{
    BaseControlRecord, CheckInMethod, Checkpoint, CheckpointId, CheckpointVisit, Coordinate,
    EvidenceRef, Round, RoundId, RoundStatus, StoreError, Timestamp, VisitId,
};
use std::time::{SystemTime, UNIX_EPOCH};

/// Everything needed to open a round session.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundSnapshot {
    pub round: Round,
    pub checkpoints: Vec<Checkpoint>,
    /// Visits already durable for this round.
    pub visits: Vec<CheckpointVisit>,
}

/// A visit the store has not yet assigned an id to.
#[derive(Clone, Debug, PartialEq)]
pub struct NewVisit {
    pub round_id: RoundId,
    pub checkpoint_id: CheckpointId,
    pub visited_at: Timestamp,
    pub location: Option<Coordinate>,
    pub signature: Option<EvidenceRef>,
    pub photo: Option<EvidenceRef>,
    pub duration_ms: u64,
    pub check_in: CheckInMethod,
}

impl NewVisit {
    pub fn into_visit(self, id: VisitId) -> CheckpointVisit {
        CheckpointVisit {
            id,
            round_id: self.round_id,
            checkpoint_id: self.checkpoint_id,
            visited_at: self.visited_at,
            location: self.location,
            signature: self.signature,
            photo: self.photo,
            duration_ms: self.duration_ms,
            check_in: self.check_in,
        }
    }
}

/// Status write for a round. `None` fields leave the stored value alone.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundStatusUpdate {
    pub round_id: RoundId,
    pub status: RoundStatus,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub signature: Option<EvidenceRef>,
}

/// Durable storage for rounds and their visits.
#[async_trait]
pub trait RoundStore: Send + Sync {
    async fn load_round(&self, round_id: &RoundId) -> Result<RoundSnapshot, StoreError>;

    /// Persist a visit. The engine treats the visit as real only after this
    /// returns `Ok`.
    async fn record_visit(&self, visit: NewVisit) -> Result<VisitId, StoreError>;

    async fn update_round_status(&self, update: RoundStatusUpdate) -> Result<(), StoreError>;
}

/// Departure and arrival records for the vehicle bracketing a round.
#[async_trait]
pub trait BaseControlStore: Send + Sync {
    async fn departure(&self, round_id: &RoundId) -> Result<Option<BaseControlRecord>, StoreError>;

    async fn arrival(&self, round_id: &RoundId) -> Result<Option<BaseControlRecord>, StoreError>;

    async fn has_departure(&self, round_id: &RoundId) -> Result<bool, StoreError> {
        Ok(self.departure(round_id).await?.is_some())
    }

    async fn record_departure(
        &self,
        round_id: &RoundId,
        odometer_km: f64,
        at: Timestamp,
    ) -> Result<BaseControlRecord, StoreError>;

    async fn record_arrival(
        &self,
        round_id: &RoundId,
        odometer_km: f64,
        at: Timestamp,
    ) -> Result<BaseControlRecord, StoreError>;
}

/// Outbound notifications. Delivery failures are the adapter's problem;
/// they never fail the operation that produced the event.
#[async_trait]
pub trait PatrolNotifier: Send + Sync {
    async fn notify(&self, event: PatrolEvent);
}

/// Time source abstraction for testability
pub trait TimeSource: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Timestamp)
            .unwrap_or(0)
    }
}
