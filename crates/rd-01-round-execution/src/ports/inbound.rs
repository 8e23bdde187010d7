//! Driving Ports (API - Inbound)
//!
//! What the field UI calls. Every operation addresses a round by id; the
//! round must have been opened first.

use crate::domain::{CheckpointAttemptState, MissingRequirement};
use crate::error::RoundResult;
use crate::ports::outbound::RoundSnapshot;
use async_trait::async_trait;
use serde::Serialize;
use shared_types::{
    BaseControlRecord, CheckInMethod, CheckpointId, CheckpointVisit, Coordinate, EvidenceRef,
    Round, RoundId, RoundStatus,
};

/// Result of an accepted scan or manual code.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScanOutcome {
    pub checkpoint_id: CheckpointId,
    pub method: CheckInMethod,
    /// The attempt was already checked in; nothing changed.
    pub already_checked_in: bool,
    pub missing: Vec<MissingRequirement>,
}

/// Current attempt plus what still blocks it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttemptReport {
    pub attempt: CheckpointAttemptState,
    pub missing: Vec<MissingRequirement>,
}

impl AttemptReport {
    pub fn can_finalize(&self) -> bool {
        self.missing.is_empty()
    }
}

/// A visit that the store acknowledged.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FinalizeOutcome {
    pub visit: CheckpointVisit,
    pub next_checkpoint: Option<CheckpointId>,
    /// Every checkpoint has now been visited.
    pub all_visited: bool,
}

/// Result of a location update.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum LocationOutcome {
    /// No checkpoint left to evaluate.
    Idle,
    OutsideGeofence {
        checkpoint_id: CheckpointId,
        distance_m: Option<f64>,
    },
    /// Inside the geofence; evidence still missing.
    CheckedIn {
        checkpoint_id: CheckpointId,
        missing: Vec<MissingRequirement>,
    },
    AutoFinalized(FinalizeOutcome),
}

/// Progress summary for a round.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoundProgress {
    pub round_id: RoundId,
    pub status: RoundStatus,
    pub visited: usize,
    pub total: usize,
    pub current_checkpoint: Option<CheckpointId>,
    pub has_departure: bool,
    pub has_arrival: bool,
    pub has_round_signature: bool,
}

impl RoundProgress {
    pub fn is_complete(&self) -> bool {
        self.visited >= self.total
    }
}

/// Primary round execution API
#[async_trait]
pub trait RoundExecutionApi: Send + Sync {
    /// Load a round from the store and start a session. Opening an already
    /// open round returns its current progress without reloading.
    async fn open_round(&self, round_id: &RoundId) -> RoundResult<RoundProgress>;

    /// Rebuild the session from the store, discarding the current attempt.
    async fn resync(&self, round_id: &RoundId) -> RoundResult<RoundProgress>;

    /// Drop the in-memory session. `Ok(false)` when none was open.
    ///
    /// Refused with `AlreadyProcessing` while a store call is outstanding.
    /// A round signature not yet written by completion is dropped with the
    /// session; `resync` keeps it.
    fn close_session(&self, round_id: &RoundId) -> RoundResult<bool>;

    /// Record the base departure and activate the round. An existing
    /// departure record is reused instead of written again.
    async fn record_departure(
        &self,
        round_id: &RoundId,
        odometer_km: f64,
    ) -> RoundResult<BaseControlRecord>;

    /// Scanned tag or typed manual code for the current checkpoint.
    async fn submit_scan(&self, round_id: &RoundId, scanned: &str) -> RoundResult<ScanOutcome>;

    /// Guard position update.
    async fn update_location(
        &self,
        round_id: &RoundId,
        point: Coordinate,
    ) -> RoundResult<LocationOutcome>;

    async fn set_checklist_item(
        &self,
        round_id: &RoundId,
        item_id: &str,
        checked: bool,
    ) -> RoundResult<AttemptReport>;

    async fn attach_photo(&self, round_id: &RoundId, photo: EvidenceRef)
        -> RoundResult<AttemptReport>;

    async fn attach_signature(
        &self,
        round_id: &RoundId,
        signature: EvidenceRef,
    ) -> RoundResult<AttemptReport>;

    /// Round-level signature, persisted on completion.
    async fn attach_round_signature(
        &self,
        round_id: &RoundId,
        signature: EvidenceRef,
    ) -> RoundResult<()>;

    /// Persist the visit for `checkpoint_id` and advance.
    async fn finalize_checkpoint(
        &self,
        round_id: &RoundId,
        checkpoint_id: &CheckpointId,
    ) -> RoundResult<FinalizeOutcome>;

    /// Discard the current attempt and start it over.
    async fn cancel_attempt(&self, round_id: &RoundId) -> RoundResult<AttemptReport>;

    async fn record_arrival(
        &self,
        round_id: &RoundId,
        odometer_km: f64,
    ) -> RoundResult<BaseControlRecord>;

    async fn report_incident(&self, round_id: &RoundId, description: &str) -> RoundResult<()>;

    /// Close the round once every checkpoint is visited.
    async fn complete_round(&self, round_id: &RoundId) -> RoundResult<Round>;

    fn progress(&self, round_id: &RoundId) -> RoundResult<RoundProgress>;

    /// `None` once every checkpoint is visited.
    fn current_attempt(&self, round_id: &RoundId) -> RoundResult<Option<AttemptReport>>;

    fn visits(&self, round_id: &RoundId) -> RoundResult<Vec<CheckpointVisit>>;

    /// The round as the open session holds it.
    fn snapshot(&self, round_id: &RoundId) -> RoundResult<RoundSnapshot>;
}
