//! # Patrol Events
//!
//! Defines all event types that flow through the shared bus.
//! Events are published only after the store acknowledged the change they
//! describe.

use serde::{Deserialize, Serialize};
use shared_types::entities::{
    BaseControlRecord, CheckpointId, CheckpointVisit, RoundId, RoundStatus, Timestamp,
};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PatrolEvent {
    // =========================================================================
    // ROUND LIFECYCLE
    // =========================================================================
    /// Departure recorded and the round is now active.
    RoundStarted {
        round_id: RoundId,
        departure: BaseControlRecord,
    },

    /// Arrival back at base recorded.
    ArrivalRecorded {
        round_id: RoundId,
        arrival: BaseControlRecord,
    },

    /// An incident was reported for the round.
    IncidentReported {
        round_id: RoundId,
        description: String,
        reported_at: Timestamp,
    },

    /// The round was closed (`Completed`, or `Incident` when flagged).
    RoundClosed {
        round_id: RoundId,
        status: RoundStatus,
        end_time: Timestamp,
    },

    // =========================================================================
    // CHECKPOINTS
    // =========================================================================
    /// A checkpoint visit was durably recorded and the cursor advanced.
    VisitRecorded {
        visit: CheckpointVisit,
        /// The checkpoint that became current, if any remain.
        next_checkpoint: Option<CheckpointId>,
    },
}

impl PatrolEvent {
    /// Get the topic for this event.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::RoundStarted { .. } | Self::ArrivalRecorded { .. } | Self::RoundClosed { .. } => {
                EventTopic::RoundLifecycle
            }
            Self::IncidentReported { .. } => EventTopic::Incidents,
            Self::VisitRecorded { .. } => EventTopic::Visits,
        }
    }

    /// Get the round this event belongs to.
    #[must_use]
    pub fn round_id(&self) -> &RoundId {
        match self {
            Self::RoundStarted { round_id, .. }
            | Self::ArrivalRecorded { round_id, .. }
            | Self::IncidentReported { round_id, .. }
            | Self::RoundClosed { round_id, .. } => round_id,
            Self::VisitRecorded { visit, .. } => &visit.round_id,
        }
    }
}

/// Event topics for filtering subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Departure, arrival and closing events.
    RoundLifecycle,
    /// Checkpoint visit records.
    Visits,
    /// Field incident reports.
    Incidents,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Rounds to include. Empty means all rounds.
    pub rounds: Vec<RoundId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            rounds: Vec::new(),
        }
    }

    /// Create a filter for events of specific rounds.
    #[must_use]
    pub fn for_rounds(rounds: Vec<RoundId>) -> Self {
        Self {
            topics: Vec::new(),
            rounds,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &PatrolEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let round_match = self.rounds.is_empty() || self.rounds.contains(event.round_id());

        topic_match && round_match
    }
}
