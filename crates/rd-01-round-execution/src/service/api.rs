use super::core::RoundExecutionService;
use crate::error::RoundResult;
use crate::ports::{
    AttemptReport, BaseControlStore, FinalizeOutcome, LocationOutcome, PatrolNotifier,
    RoundExecutionApi, RoundProgress, RoundSnapshot, RoundStore, ScanOutcome,
};
use async_trait::async_trait;
use shared_types::{
    BaseControlRecord, CheckpointId, CheckpointVisit, Coordinate, EvidenceRef, Round, RoundId,
};

#[async_trait]
impl<S, B, N> RoundExecutionApi for RoundExecutionService<S, B, N>
where
    S: RoundStore + 'static,
    B: BaseControlStore + 'static,
    N: PatrolNotifier + 'static,
{
    async fn open_round(&self, round_id: &RoundId) -> RoundResult<RoundProgress> {
        self.open(round_id)
            .await
            .map_err(|e| self.rejected(round_id, "open_round", e))
    }

    async fn resync(&self, round_id: &RoundId) -> RoundResult<RoundProgress> {
        self.reload(round_id)
            .await
            .map_err(|e| self.rejected(round_id, "resync", e))
    }

    fn close_session(&self, round_id: &RoundId) -> RoundResult<bool> {
        self.close(round_id)
            .map_err(|e| self.rejected(round_id, "close_session", e))
    }

    async fn record_departure(
        &self,
        round_id: &RoundId,
        odometer_km: f64,
    ) -> RoundResult<BaseControlRecord> {
        self.departure(round_id, odometer_km)
            .await
            .map_err(|e| self.rejected(round_id, "record_departure", e))
    }

    async fn submit_scan(&self, round_id: &RoundId, scanned: &str) -> RoundResult<ScanOutcome> {
        self.scan(round_id, scanned)
            .map_err(|e| self.rejected(round_id, "submit_scan", e))
    }

    async fn update_location(
        &self,
        round_id: &RoundId,
        point: Coordinate,
    ) -> RoundResult<LocationOutcome> {
        self.location(round_id, point)
            .await
            .map_err(|e| self.rejected(round_id, "update_location", e))
    }

    async fn set_checklist_item(
        &self,
        round_id: &RoundId,
        item_id: &str,
        checked: bool,
    ) -> RoundResult<AttemptReport> {
        self.checklist_item(round_id, item_id, checked)
            .map_err(|e| self.rejected(round_id, "set_checklist_item", e))
    }

    async fn attach_photo(
        &self,
        round_id: &RoundId,
        photo: EvidenceRef,
    ) -> RoundResult<AttemptReport> {
        self.photo(round_id, photo)
            .map_err(|e| self.rejected(round_id, "attach_photo", e))
    }

    async fn attach_signature(
        &self,
        round_id: &RoundId,
        signature: EvidenceRef,
    ) -> RoundResult<AttemptReport> {
        self.signature(round_id, signature)
            .map_err(|e| self.rejected(round_id, "attach_signature", e))
    }

    async fn attach_round_signature(
        &self,
        round_id: &RoundId,
        signature: EvidenceRef,
    ) -> RoundResult<()> {
        self.round_signature(round_id, signature)
            .map_err(|e| self.rejected(round_id, "attach_round_signature", e))
    }

    async fn finalize_checkpoint(
        &self,
        round_id: &RoundId,
        checkpoint_id: &CheckpointId,
    ) -> RoundResult<FinalizeOutcome> {
        self.finalize(round_id, checkpoint_id)
            .await
            .map_err(|e| self.rejected(round_id, "finalize_checkpoint", e))
    }

    async fn cancel_attempt(&self, round_id: &RoundId) -> RoundResult<AttemptReport> {
        self.cancel(round_id)
            .map_err(|e| self.rejected(round_id, "cancel_attempt", e))
    }

    async fn record_arrival(
        &self,
        round_id: &RoundId,
        odometer_km: f64,
    ) -> RoundResult<BaseControlRecord> {
        self.arrival(round_id, odometer_km)
            .await
            .map_err(|e| self.rejected(round_id, "record_arrival", e))
    }

    async fn report_incident(&self, round_id: &RoundId, description: &str) -> RoundResult<()> {
        self.incident(round_id, description)
            .await
            .map_err(|e| self.rejected(round_id, "report_incident", e))
    }

    async fn complete_round(&self, round_id: &RoundId) -> RoundResult<Round> {
        self.complete(round_id)
            .await
            .map_err(|e| self.rejected(round_id, "complete_round", e))
    }

    fn progress(&self, round_id: &RoundId) -> RoundResult<RoundProgress> {
        Ok(self.session(round_id)?.lock().progress())
    }

    fn current_attempt(&self, round_id: &RoundId) -> RoundResult<Option<AttemptReport>> {
        Ok(self.session(round_id)?.lock().attempt_report())
    }

    fn visits(&self, round_id: &RoundId) -> RoundResult<Vec<CheckpointVisit>> {
        Ok(self.session(round_id)?.lock().visits.clone())
    }

    fn snapshot(&self, round_id: &RoundId) -> RoundResult<RoundSnapshot> {
        Ok(self.session(round_id)?.lock().snapshot())
    }
}
