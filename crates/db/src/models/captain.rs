//! Row model for the `captains` table.

use rideflow_core::captain::Captain;
use rideflow_core::error::CoreError;
use rideflow_core::geo::Coordinates;
use rideflow_core::types::{DbId, Timestamp};
use rideflow_core::vehicle::VehicleType;
use sqlx::FromRow;

/// A row from the `captains` table.
///
/// `lat` and `lng` are either both set or both null (enforced by a CHECK
/// constraint).
#[derive(Debug, Clone, FromRow)]
pub struct CaptainRow {
    pub id: DbId,
    pub name: String,
    pub vehicle_type: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub connection_id: Option<String>,
    pub location_updated_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<CaptainRow> for Captain {
    type Error = CoreError;

    fn try_from(row: CaptainRow) -> Result<Self, Self::Error> {
        let vehicle_type = row.vehicle_type.parse::<VehicleType>().map_err(|_| {
            CoreError::Store(format!(
                "captain {} has unknown vehicle_type {:?}",
                row.id, row.vehicle_type
            ))
        })?;
        let location = match (row.lat, row.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        };

        Ok(Captain {
            id: row.id,
            name: row.name,
            vehicle_type,
            location,
            connection_id: row.connection_id,
            location_updated_at: row.location_updated_at,
        })
    }
}

/// DTO for inserting a captain (seeding and tests; onboarding lives
/// elsewhere).
#[derive(Debug, Clone)]
pub struct CreateCaptain {
    pub name: String,
    pub vehicle_type: VehicleType,
    pub location: Option<Coordinates>,
}
