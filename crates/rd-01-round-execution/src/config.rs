//! Round execution configuration

use crate::domain::DEFAULT_MANUAL_CODE_LENGTH;
use serde::{Deserialize, Serialize};
use shared_types::DEFAULT_GEOFENCE_RADIUS_M;
use std::env;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("manual code length must be at least 1")]
    ZeroManualCodeLength,
    #[error("default geofence radius must be positive, got {0}")]
    InvalidGeofenceRadius(f64),
}

/// Round execution configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundExecutionConfig {
    /// Digits in a keypad code
    pub manual_code_length: usize,
    /// Radius for checkpoints that carry none
    pub default_geofence_radius_m: f64,
    /// Finalize from a location update when the gate is already open
    pub auto_finalize_on_geofence: bool,
    /// Completion needs the arrival record
    pub require_arrival: bool,
}

impl Default for RoundExecutionConfig {
    fn default() -> Self {
        Self {
            manual_code_length: DEFAULT_MANUAL_CODE_LENGTH,
            default_geofence_radius_m: DEFAULT_GEOFENCE_RADIUS_M,
            auto_finalize_on_geofence: true,
            require_arrival: true,
        }
    }
}

/// `true`, `TRUE` and `1` turn a flag on; anything else turns it off.
fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}

impl RoundExecutionConfig {
    /// Defaults overridden by `RONDA_*` environment variables.
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            manual_code_length: env::var("RONDA_MANUAL_CODE_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.manual_code_length),
            default_geofence_radius_m: env::var("RONDA_GEOFENCE_RADIUS_M")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_geofence_radius_m),
            auto_finalize_on_geofence: env::var("RONDA_GEOFENCE_AUTO_FINALIZE")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.auto_finalize_on_geofence),
            require_arrival: env::var("RONDA_REQUIRE_ARRIVAL")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.require_arrival),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.manual_code_length == 0 {
            return Err(ConfigError::ZeroManualCodeLength);
        }
        if !(self.default_geofence_radius_m.is_finite() && self.default_geofence_radius_m > 0.0) {
            return Err(ConfigError::InvalidGeofenceRadius(
                self.default_geofence_radius_m,
            ));
        }
        Ok(())
    }
}
