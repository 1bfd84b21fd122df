//! Geographic primitives: coordinates, validation, and great-circle math.
//!
//! Distances use the haversine formula on a sphere of radius
//! [`EARTH_RADIUS_KM`]. That is accurate to well under 1% at dispatch
//! radii, which is all the radius filter needs.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Mean Earth radius used for every distance and angle conversion.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Meters per kilometer.
pub const METERS_PER_KM: f64 = 1000.0;

/// A WGS84 point. Latitude first, matching how riders and captains send it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Reject non-finite or out-of-range values.
    ///
    /// `name` is used in the error message (e.g. `"pickupCoords"`).
    pub fn validate(&self, name: &str) -> Result<(), CoreError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(CoreError::Validation(format!(
                "{name}.lat must be between -90 and 90, got {}",
                self.lat
            )));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(CoreError::Validation(format!(
                "{name}.lng must be between -180 and 180, got {}",
                self.lng
            )));
        }
        Ok(())
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_meters(&self, other: &Coordinates) -> f64 {
        haversine_meters(*self, *other)
    }
}

/// Haversine distance between two points in meters.
pub fn haversine_meters(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * METERS_PER_KM * c
}

/// Convert a ground radius in meters to a central angle in radians.
pub fn radius_to_radians(radius_meters: f64) -> f64 {
    (radius_meters / METERS_PER_KM) / EARTH_RADIUS_KM
}

/// Lat/lng box that fully contains a circle.
///
/// Used as a cheap index-friendly prefilter before the exact haversine
/// check. Near the poles the longitude span widens to the full range.
/// A box crossing the antimeridian has `min_lng > max_lng` and covers
/// `[min_lng, 180] ∪ [-180, max_lng]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn around(center: Coordinates, radius_meters: f64) -> Self {
        let angle_deg = radius_to_radians(radius_meters).to_degrees();
        let min_lat = (center.lat - angle_deg).max(-90.0);
        let max_lat = (center.lat + angle_deg).min(90.0);

        let cos_lat = center.lat.to_radians().cos();
        let (min_lng, max_lng) = if cos_lat.abs() < 1e-9 || max_lat >= 90.0 || min_lat <= -90.0 {
            (-180.0, 180.0)
        } else {
            let lng_span = angle_deg / cos_lat;
            let west = center.lng - lng_span;
            let east = center.lng + lng_span;
            if lng_span >= 180.0 {
                (-180.0, 180.0)
            } else if west < -180.0 {
                (west + 360.0, east)
            } else if east > 180.0 {
                (west, east - 360.0)
            } else {
                (west, east)
            }
        };

        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    /// Whether the longitude range wraps past ±180°.
    pub fn crosses_antimeridian(&self) -> bool {
        self.min_lng > self.max_lng
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        if !(self.min_lat..=self.max_lat).contains(&point.lat) {
            return false;
        }
        if self.crosses_antimeridian() {
            point.lng >= self.min_lng || point.lng <= self.max_lng
        } else {
            (self.min_lng..=self.max_lng).contains(&point.lng)
        }
    }
}
