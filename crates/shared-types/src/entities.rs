//! # Core Domain Entities
//!
//! Defines the patrol entities shared by the engine, the adapters and the
//! runtime.
//!
//! ## Clusters
//!
//! - **Round**: `Round`, `RoundStatus`, `BaseControlRecord`
//! - **Route**: `Checkpoint`, `ChecklistItemTemplate`, `Coordinate`
//! - **Evidence**: `CheckpointVisit`, `EvidenceRef`, `CheckInMethod`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds since the UNIX epoch.
pub type Timestamp = u64;

/// Geofence radius applied when a checkpoint does not configure one.
pub const DEFAULT_GEOFENCE_RADIUS_M: f64 = 50.0;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a patrol round.
    RoundId
);
string_id!(
    /// Identifier of a checkpoint.
    CheckpointId
);
string_id!(
    /// Identifier assigned by the store to a recorded visit.
    VisitId
);

/// Opaque reference to a captured blob (photo or signature).
///
/// The engine only tracks presence; the content lives wherever the UI put it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceRef(pub String);

impl From<&str> for EvidenceRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    #[serde(alias = "lon", alias = "lng")]
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

// =============================================================================
// CLUSTER A: THE ROUND
// =============================================================================

/// Persisted status of a round.
///
/// `Incident` is reported by the field and may coexist with ongoing
/// checkpoint processing; `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Incident,
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundStatus::Pending => "pending",
            RoundStatus::Active => "active",
            RoundStatus::Completed => "completed",
            RoundStatus::Incident => "incident",
        };
        f.write_str(s)
    }
}

/// A scheduled patrol assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    #[serde(default)]
    pub status: RoundStatus,
    #[serde(default)]
    pub start_time: Option<Timestamp>,
    #[serde(default)]
    pub end_time: Option<Timestamp>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub vehicle_id: Option<String>,
    /// Round-level signature requirement, derived from the shift type.
    #[serde(default)]
    pub requires_signature: bool,
    /// Round-level signature captured at completion.
    #[serde(default)]
    pub signature: Option<EvidenceRef>,
}

impl Round {
    /// A pending round with no references attached.
    pub fn new(id: impl Into<RoundId>) -> Self {
        Self {
            id: id.into(),
            status: RoundStatus::Pending,
            start_time: None,
            end_time: None,
            template_id: None,
            vehicle_id: None,
            requires_signature: false,
            signature: None,
        }
    }

    pub fn with_signature_required(mut self, required: bool) -> Self {
        self.requires_signature = required;
        self
    }
}

/// Which side of the base bracket a record marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseControlKind {
    Departure,
    Arrival,
}

/// Odometer and timestamp marker taken when leaving or returning to base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseControlRecord {
    pub round_id: RoundId,
    pub kind: BaseControlKind,
    pub odometer_km: f64,
    pub recorded_at: Timestamp,
}

// =============================================================================
// CLUSTER B: THE ROUTE
// =============================================================================

/// One configured checklist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItemTemplate {
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl ChecklistItemTemplate {
    pub fn new(description: impl Into<String>, required: bool) -> Self {
        Self {
            description: description.into(),
            required,
        }
    }
}

fn default_radius() -> f64 {
    DEFAULT_GEOFENCE_RADIUS_M
}

/// A location to be visited during a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub name: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub location: Option<Coordinate>,
    #[serde(default = "default_radius")]
    pub geofence_radius_m: f64,
    /// Code embedded in the printed structured tag.
    #[serde(default)]
    pub qr_code: Option<String>,
    /// Short numeric code for keypad entry.
    #[serde(default)]
    pub manual_code: Option<String>,
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub requires_signature: bool,
    #[serde(default)]
    pub checklist: Vec<ChecklistItemTemplate>,
}

impl Checkpoint {
    pub fn new(id: impl Into<CheckpointId>, name: impl Into<String>, position: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            client_id: None,
            location: None,
            geofence_radius_m: DEFAULT_GEOFENCE_RADIUS_M,
            qr_code: None,
            manual_code: None,
            position,
            requires_signature: false,
            checklist: Vec::new(),
        }
    }

    pub fn with_manual_code(mut self, code: impl Into<String>) -> Self {
        self.manual_code = Some(code.into());
        self
    }

    pub fn with_qr_code(mut self, code: impl Into<String>) -> Self {
        self.qr_code = Some(code.into());
        self
    }

    pub fn with_location(mut self, location: Coordinate, radius_m: f64) -> Self {
        self.location = Some(location);
        self.geofence_radius_m = radius_m;
        self
    }

    pub fn with_checklist(mut self, items: Vec<ChecklistItemTemplate>) -> Self {
        self.checklist = items;
        self
    }

    pub fn with_signature_required(mut self, required: bool) -> Self {
        self.requires_signature = required;
        self
    }

    /// True if `code` equals either configured identifying code.
    pub fn has_code(&self, code: &str) -> bool {
        self.manual_code.as_deref() == Some(code) || self.qr_code.as_deref() == Some(code)
    }
}

// =============================================================================
// CLUSTER C: EVIDENCE
// =============================================================================

/// How the guard proved presence at a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInMethod {
    /// Camera-decoded structured tag.
    Scan,
    /// Short numeric code typed on the keypad.
    ManualCode,
    /// Location update inside the checkpoint geofence.
    Geofence,
}

/// Durable record that a checkpoint was completed within a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointVisit {
    pub id: VisitId,
    pub round_id: RoundId,
    pub checkpoint_id: CheckpointId,
    pub visited_at: Timestamp,
    #[serde(default)]
    pub location: Option<Coordinate>,
    #[serde(default)]
    pub signature: Option<EvidenceRef>,
    #[serde(default)]
    pub photo: Option<EvidenceRef>,
    #[serde(default)]
    pub duration_ms: u64,
    pub check_in: CheckInMethod,
}
