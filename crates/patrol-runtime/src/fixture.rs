//! # Patrol Fixtures
//!
//! A fixture is a recorded patrol: the round as the store holds it and the
//! sequence of field actions the guard took, each stamped with device time.
//!
//! ```json
//! {
//!   "round": { "id": "round-night-07", "requires_signature": true },
//!   "checkpoints": [ { "id": "cp-gate", "name": "Main gate", "manual_code": "123456789" } ],
//!   "start_time": 1700000000000,
//!   "steps": [
//!     { "at": 1700000000000, "action": "depart", "odometer_km": 48210.0 },
//!     { "at": 1700000030000, "action": "scan", "scanned": "123456789" }
//!   ]
//! }
//! ```

use anyhow::Context;
use rd_01_round_execution::ports::RoundSnapshot;
use serde::Deserialize;
use shared_types::{
    BaseControlRecord, Checkpoint, CheckpointId, CheckpointVisit, Coordinate, EvidenceRef, Round,
    Timestamp,
};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Structural problems caught before any step runs.
#[derive(Debug, Error, PartialEq)]
pub enum FixtureError {
    #[error("fixture round {0} has no checkpoints")]
    NoCheckpoints(String),

    #[error("visit {visit} belongs to round {found}, fixture round is {expected}")]
    ForeignVisit {
        visit: String,
        found: String,
        expected: String,
    },

    #[error("base-control record for round {found} in fixture for round {expected}")]
    ForeignBaseRecord { found: String, expected: String },

    #[error("step {index} is stamped {at}, before the previous step at {previous}")]
    TimeWentBackwards {
        index: usize,
        at: Timestamp,
        previous: Timestamp,
    },
}

/// A recorded patrol ready for replay.
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    pub round: Round,
    pub checkpoints: Vec<Checkpoint>,
    #[serde(default)]
    pub visits: Vec<CheckpointVisit>,
    /// Base-control records already on file before the replay starts.
    #[serde(default)]
    pub base_records: Vec<BaseControlRecord>,
    /// Device clock at the start of the replay.
    #[serde(default)]
    pub start_time: Timestamp,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Fixture {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let fixture: Fixture = serde_json::from_str(json).context("fixture is not valid JSON")?;
        fixture.validate()?;
        Ok(fixture)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("failed to load fixture {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), FixtureError> {
        let round_id = &self.round.id;
        if self.checkpoints.is_empty() {
            return Err(FixtureError::NoCheckpoints(round_id.to_string()));
        }
        if let Some(visit) = self.visits.iter().find(|v| &v.round_id != round_id) {
            return Err(FixtureError::ForeignVisit {
                visit: visit.id.to_string(),
                found: visit.round_id.to_string(),
                expected: round_id.to_string(),
            });
        }
        if let Some(record) = self.base_records.iter().find(|r| &r.round_id != round_id) {
            return Err(FixtureError::ForeignBaseRecord {
                found: record.round_id.to_string(),
                expected: round_id.to_string(),
            });
        }

        let mut previous = self.start_time;
        for (index, step) in self.steps.iter().enumerate() {
            if let Some(at) = step.at {
                if at < previous {
                    return Err(FixtureError::TimeWentBackwards {
                        index,
                        at,
                        previous,
                    });
                }
                previous = at;
            }
        }
        Ok(())
    }

    /// What the round store holds when the replay begins.
    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            round: self.round.clone(),
            checkpoints: self.checkpoints.clone(),
            visits: self.visits.clone(),
        }
    }
}

/// One field action. Steps without `at` run at the previous step's time.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub at: Option<Timestamp>,
    #[serde(flatten)]
    pub action: StepAction,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    Depart {
        odometer_km: f64,
    },
    /// Camera tag payload or typed keypad code.
    Scan {
        scanned: String,
    },
    Location {
        lat: f64,
        lng: f64,
    },
    Check {
        item_id: String,
        #[serde(default = "checked_default")]
        checked: bool,
    },
    Photo {
        photo: EvidenceRef,
    },
    Signature {
        signature: EvidenceRef,
    },
    RoundSignature {
        signature: EvidenceRef,
    },
    Finalize {
        checkpoint_id: CheckpointId,
    },
    Cancel,
    Arrive {
        odometer_km: f64,
    },
    Incident {
        description: String,
    },
    Complete,
    /// Reload the session from the store.
    Resync,
    /// The next store write fails, as a dropped connection would.
    StoreOutage,
}

fn checked_default() -> bool {
    true
}

impl StepAction {
    pub fn name(&self) -> &'static str {
        match self {
            StepAction::Depart { .. } => "depart",
            StepAction::Scan { .. } => "scan",
            StepAction::Location { .. } => "location",
            StepAction::Check { .. } => "check",
            StepAction::Photo { .. } => "photo",
            StepAction::Signature { .. } => "signature",
            StepAction::RoundSignature { .. } => "round_signature",
            StepAction::Finalize { .. } => "finalize",
            StepAction::Cancel => "cancel",
            StepAction::Arrive { .. } => "arrive",
            StepAction::Incident { .. } => "incident",
            StepAction::Complete => "complete",
            StepAction::Resync => "resync",
            StepAction::StoreOutage => "store_outage",
        }
    }

    pub fn location(&self) -> Option<Coordinate> {
        match self {
            StepAction::Location { lat, lng } => Some(Coordinate::new(*lat, *lng)),
            _ => None,
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
