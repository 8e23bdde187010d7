//! Geofence evaluation
//!
//! Great-circle (haversine) distance on a spherical Earth. Boundary points
//! count as inside. A checkpoint without coordinates is never inside.

use shared_types::{Checkpoint, Coordinate, DEFAULT_GEOFENCE_RADIUS_M};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two points, in meters.
pub fn distance_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Evaluates guard positions against checkpoint geofences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceEvaluator {
    /// Radius used when a checkpoint carries none (or a non-positive one).
    pub default_radius_m: f64,
}

impl Default for GeofenceEvaluator {
    fn default() -> Self {
        Self {
            default_radius_m: DEFAULT_GEOFENCE_RADIUS_M,
        }
    }
}

impl GeofenceEvaluator {
    pub fn new(default_radius_m: f64) -> Self {
        Self { default_radius_m }
    }

    /// Radius that applies to `checkpoint`.
    pub fn effective_radius_m(&self, checkpoint: &Checkpoint) -> f64 {
        let radius = checkpoint.geofence_radius_m;
        if radius.is_finite() && radius > 0.0 {
            radius
        } else {
            self.default_radius_m
        }
    }

    /// Distance from `point` to the checkpoint, if it has coordinates.
    pub fn distance_to(&self, point: &Coordinate, checkpoint: &Checkpoint) -> Option<f64> {
        checkpoint
            .location
            .as_ref()
            .map(|center| distance_m(point, center))
    }

    /// Whether `point` lies within the checkpoint's geofence.
    ///
    /// Non-finite input coordinates yield `false`.
    pub fn contains(&self, point: &Coordinate, checkpoint: &Checkpoint) -> bool {
        self.distance_to(point, checkpoint)
            .is_some_and(|d| d <= self.effective_radius_m(checkpoint))
    }
}

/// `contains` with the default evaluator.
pub fn within_radius(point: &Coordinate, checkpoint: &Checkpoint) -> bool {
    GeofenceEvaluator::default().contains(point, checkpoint)
}
