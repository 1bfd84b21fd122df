//! Postgres-backed implementations of the core store traits.

use async_trait::async_trait;
use rideflow_core::captain::Captain;
use rideflow_core::error::CoreError;
use rideflow_core::geo::{BoundingBox, Coordinates};
use rideflow_core::ride::{NewRide, Ride};
use rideflow_core::store::{CaptainStore, RideStore, RideTransition};
use rideflow_core::types::DbId;
use rideflow_core::vehicle::VehicleType;

use crate::repositories::{CaptainRepo, RideRepo};
use crate::DbPool;

fn store_error(e: sqlx::Error) -> CoreError {
    tracing::error!(error = %e, "Database error");
    CoreError::Store(e.to_string())
}

/// [`RideStore`] over the `rides` table.
#[derive(Clone)]
pub struct PgRideStore {
    pool: DbPool,
}

impl PgRideStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RideStore for PgRideStore {
    async fn insert(&self, ride: NewRide) -> Result<Ride, CoreError> {
        RideRepo::insert(&self.pool, &ride)
            .await
            .map_err(store_error)?
            .try_into()
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Ride>, CoreError> {
        RideRepo::find_by_id(&self.pool, id)
            .await
            .map_err(store_error)?
            .map(Ride::try_from)
            .transpose()
    }

    async fn apply_transition(
        &self,
        ride_id: DbId,
        transition: &RideTransition,
    ) -> Result<Option<Ride>, CoreError> {
        let row = match transition {
            RideTransition::Accept { captain_id } => {
                RideRepo::accept(&self.pool, ride_id, *captain_id).await
            }
            RideTransition::Start {
                captain_id,
                otp,
                max_failed_attempts,
            } => {
                RideRepo::start(&self.pool, ride_id, *captain_id, otp, *max_failed_attempts).await
            }
            RideTransition::Complete { captain_id } => {
                RideRepo::complete(&self.pool, ride_id, *captain_id).await
            }
        }
        .map_err(store_error)?;

        row.map(Ride::try_from).transpose()
    }

    async fn record_failed_otp(
        &self,
        ride_id: DbId,
        max_attempts: i32,
    ) -> Result<Option<i32>, CoreError> {
        RideRepo::record_failed_otp(&self.pool, ride_id, max_attempts)
            .await
            .map_err(store_error)
    }
}

/// [`CaptainStore`] over the `captains` table.
#[derive(Clone)]
pub struct PgCaptainStore {
    pool: DbPool,
}

impl PgCaptainStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CaptainStore for PgCaptainStore {
    async fn find_by_id(&self, id: DbId) -> Result<Option<Captain>, CoreError> {
        CaptainRepo::find_by_id(&self.pool, id)
            .await
            .map_err(store_error)?
            .map(Captain::try_from)
            .transpose()
    }

    async fn find_within_radius(
        &self,
        center: Coordinates,
        radius_meters: f64,
        vehicle_type: VehicleType,
    ) -> Result<Vec<Captain>, CoreError> {
        let bbox = BoundingBox::around(center, radius_meters);
        CaptainRepo::find_in_box(&self.pool, &bbox, vehicle_type)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(Captain::try_from)
            .collect()
    }

    async fn update_location(&self, id: DbId, location: Coordinates) -> Result<bool, CoreError> {
        CaptainRepo::update_location(&self.pool, id, location)
            .await
            .map_err(store_error)
    }

    async fn set_connection(&self, id: DbId, connection_id: &str) -> Result<bool, CoreError> {
        CaptainRepo::set_connection(&self.pool, id, connection_id)
            .await
            .map_err(store_error)
    }

    async fn clear_connection(&self, id: DbId, connection_id: &str) -> Result<bool, CoreError> {
        CaptainRepo::clear_connection(&self.pool, id, connection_id)
            .await
            .map_err(store_error)
    }
}
