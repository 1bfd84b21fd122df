//! Row model for the `rides` table.

use rideflow_core::error::CoreError;
use rideflow_core::geo::Coordinates;
use rideflow_core::ride::Ride;
use rideflow_core::types::{DbId, Timestamp};
use rideflow_core::vehicle::VehicleType;
use sqlx::FromRow;

use super::status::{RideStatusCode, StatusId};

/// A row from the `rides` table.
#[derive(Debug, Clone, FromRow)]
pub struct RideRow {
    pub id: DbId,
    pub rider_id: DbId,
    pub captain_id: Option<DbId>,
    pub pickup: String,
    pub destination: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub destination_lat: f64,
    pub destination_lng: f64,
    pub vehicle_type: String,
    pub status_id: StatusId,
    pub fare: Option<f64>,
    pub distance_meters: Option<f64>,
    pub duration_seconds: Option<f64>,
    pub otp: String,
    pub otp_failed_attempts: i32,
    pub created_at: Timestamp,
    pub accepted_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl TryFrom<RideRow> for Ride {
    type Error = CoreError;

    fn try_from(row: RideRow) -> Result<Self, Self::Error> {
        let status = RideStatusCode::from_id(row.status_id)
            .ok_or_else(|| {
                CoreError::Store(format!(
                    "ride {} has unknown status_id {}",
                    row.id, row.status_id
                ))
            })?
            .into();
        let vehicle_type = row
            .vehicle_type
            .parse::<VehicleType>()
            .map_err(|_| {
                CoreError::Store(format!(
                    "ride {} has unknown vehicle_type {:?}",
                    row.id, row.vehicle_type
                ))
            })?;

        Ok(Ride {
            id: row.id,
            rider_id: row.rider_id,
            captain_id: row.captain_id,
            pickup: row.pickup,
            destination: row.destination,
            pickup_coords: Coordinates::new(row.pickup_lat, row.pickup_lng),
            destination_coords: Coordinates::new(row.destination_lat, row.destination_lng),
            vehicle_type,
            status,
            fare: row.fare,
            distance_meters: row.distance_meters,
            duration_seconds: row.duration_seconds,
            otp: row.otp,
            otp_failed_attempts: row.otp_failed_attempts,
            created_at: row.created_at,
            accepted_at: row.accepted_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}
