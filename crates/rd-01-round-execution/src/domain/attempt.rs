//! Per-checkpoint attempt state
//!
//! Everything gathered at the current checkpoint before its visit is
//! written. Each update returns a new value; the session swaps it in.

use super::checklist::{missing_requirements, ChecklistState, MissingRequirement};
use serde::{Deserialize, Serialize};
use shared_types::{CheckInMethod, Checkpoint, CheckpointId, EvidenceRef, Timestamp};

/// Proof of presence at the checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    pub method: CheckInMethod,
    pub at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointAttemptState {
    pub checkpoint_id: CheckpointId,
    pub check_in: Option<CheckIn>,
    pub checklist: ChecklistState,
    pub photo: Option<EvidenceRef>,
    pub signature: Option<EvidenceRef>,
}

impl CheckpointAttemptState {
    /// Empty attempt for `checkpoint`.
    pub fn new(checkpoint: &Checkpoint) -> Self {
        Self {
            checkpoint_id: checkpoint.id.clone(),
            check_in: None,
            checklist: ChecklistState::from_template(&checkpoint.checklist),
            photo: None,
            signature: None,
        }
    }

    pub fn is_checked_in(&self) -> bool {
        self.check_in.is_some()
    }

    /// Records the first check-in. Later check-ins keep the original.
    pub fn with_check_in(&self, method: CheckInMethod, at: Timestamp) -> Self {
        if self.check_in.is_some() {
            return self.clone();
        }
        Self {
            check_in: Some(CheckIn { method, at }),
            ..self.clone()
        }
    }

    /// `None` if the item id is not part of this checklist.
    pub fn with_checklist_item(&self, item_id: &str, checked: bool) -> Option<Self> {
        let checklist = self.checklist.with_item(item_id, checked)?;
        Some(Self {
            checklist,
            ..self.clone()
        })
    }

    /// Replaces any earlier photo.
    pub fn with_photo(&self, photo: EvidenceRef) -> Self {
        Self {
            photo: Some(photo),
            ..self.clone()
        }
    }

    pub fn with_signature(&self, signature: EvidenceRef) -> Self {
        Self {
            signature: Some(signature),
            ..self.clone()
        }
    }

    /// Gate items still open, check-in first.
    pub fn missing(&self, checkpoint: &Checkpoint) -> Vec<MissingRequirement> {
        let mut missing = Vec::new();
        if self.check_in.is_none() {
            missing.push(MissingRequirement::CheckIn);
        }
        missing.extend(missing_requirements(
            &self.checklist,
            self.photo.is_some(),
            self.signature.is_some(),
            checkpoint.requires_signature,
        ));
        missing
    }

    /// Checked in and the completion gate is open.
    pub fn is_ready(&self, checkpoint: &Checkpoint) -> bool {
        self.missing(checkpoint).is_empty()
    }

    /// Milliseconds between check-in and `now`.
    pub fn elapsed_since_check_in(&self, now: Timestamp) -> u64 {
        self.check_in
            .map(|c| now.saturating_sub(c.at))
            .unwrap_or_default()
    }
}
