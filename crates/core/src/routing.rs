//! Routing and place-search seams.
//!
//! The HTTP-backed implementations live in `rideflow-maps`. The
//! straight-line provider here is used when no routing API key is
//! configured and in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geo::{haversine_meters, Coordinates};

/// Minimum characters before an autocomplete query is sent upstream.
pub const MIN_AUTOCOMPLETE_LEN: usize = 3;

/// Driving distance and time between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// One autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSuggestion {
    pub description: String,
    pub lat: f64,
    pub lng: f64,
}

#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Driving route from `origin` to `destination`.
    ///
    /// Fails with [`CoreError::Upstream`] on provider errors, timeouts or
    /// when no route exists.
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteSummary, CoreError>;
}

#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    async fn autocomplete(&self, text: &str) -> Result<Vec<PlaceSuggestion>, CoreError>;
}

/// Validates an autocomplete query and returns it trimmed.
pub fn validate_query(text: &str) -> Result<&str, CoreError> {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_AUTOCOMPLETE_LEN {
        return Err(CoreError::Validation(format!(
            "input must be at least {MIN_AUTOCOMPLETE_LEN} characters"
        )));
    }
    Ok(trimmed)
}

// ---------------------------------------------------------------------------
// Straight-line fallback
// ---------------------------------------------------------------------------

/// Ratio of typical road distance to great-circle distance in a city grid.
pub const DEFAULT_ROAD_FACTOR: f64 = 1.3;

/// Average urban driving speed in km/h.
pub const DEFAULT_AVERAGE_SPEED_KMH: f64 = 25.0;

/// Estimates routes from the haversine distance, without any network call.
#[derive(Debug, Clone, Copy)]
pub struct StraightLineRouteProvider {
    road_factor: f64,
    average_speed_kmh: f64,
}

impl StraightLineRouteProvider {
    pub fn new(road_factor: f64, average_speed_kmh: f64) -> Self {
        Self {
            road_factor,
            average_speed_kmh,
        }
    }

    pub fn estimate(&self, origin: Coordinates, destination: Coordinates) -> RouteSummary {
        let distance_meters = haversine_meters(origin, destination) * self.road_factor;
        let meters_per_second = self.average_speed_kmh * 1000.0 / 3600.0;
        RouteSummary {
            distance_meters,
            duration_seconds: distance_meters / meters_per_second,
        }
    }
}

impl Default for StraightLineRouteProvider {
    fn default() -> Self {
        Self::new(DEFAULT_ROAD_FACTOR, DEFAULT_AVERAGE_SPEED_KMH)
    }
}

#[async_trait]
impl RouteProvider for StraightLineRouteProvider {
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteSummary, CoreError> {
        origin.validate("origin")?;
        destination.validate("destination")?;
        Ok(self.estimate(origin, destination))
    }
}
