//! Radius + vehicle-type candidate search over captain locations.

use std::sync::Arc;

use crate::captain::Captain;
use crate::error::CoreError;
use crate::geo::Coordinates;
use crate::store::CaptainStore;
use crate::vehicle::VehicleType;

/// Default dispatch radius in meters.
pub const DEFAULT_SEARCH_RADIUS_METERS: f64 = 7000.0;

/// Upper bound on a search radius; anything larger is a caller bug.
pub const MAX_SEARCH_RADIUS_METERS: f64 = 100_000.0;

/// Candidate search over a [`CaptainStore`].
///
/// The store may answer with an approximate (bounding-box) match; this
/// layer keeps only captains whose haversine distance is within the radius
/// and whose vehicle type is an exact match. Output order is unspecified.
#[derive(Clone)]
pub struct GeoIndex {
    captains: Arc<dyn CaptainStore>,
}

impl GeoIndex {
    pub fn new(captains: Arc<dyn CaptainStore>) -> Self {
        Self { captains }
    }

    /// Captains within `radius_meters` of (`center_lat`, `center_lng`)
    /// driving `vehicle_type`. Empty when nobody matches.
    pub async fn find_candidates(
        &self,
        center_lng: f64,
        center_lat: f64,
        radius_meters: f64,
        vehicle_type: VehicleType,
    ) -> Result<Vec<Captain>, CoreError> {
        let center = Coordinates::new(center_lat, center_lng);
        center.validate("center")?;
        if !radius_meters.is_finite()
            || radius_meters <= 0.0
            || radius_meters > MAX_SEARCH_RADIUS_METERS
        {
            return Err(CoreError::Validation(format!(
                "radius must be in (0, {MAX_SEARCH_RADIUS_METERS}] meters, got {radius_meters}"
            )));
        }

        let found = self
            .captains
            .find_within_radius(center, radius_meters, vehicle_type)
            .await?;

        let candidates: Vec<Captain> = found
            .into_iter()
            .filter(|c| c.vehicle_type == vehicle_type)
            .filter(|c| {
                c.location
                    .is_some_and(|loc| loc.distance_meters(&center) <= radius_meters)
            })
            .collect();

        tracing::debug!(
            lat = center_lat,
            lng = center_lng,
            radius_meters,
            vehicle_type = %vehicle_type,
            count = candidates.len(),
            "Candidate search complete"
        );

        Ok(candidates)
    }
}
