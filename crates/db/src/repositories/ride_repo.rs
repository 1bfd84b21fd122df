//! Repository for the `rides` table.
//!
//! Every status change is a single conditional `UPDATE ... RETURNING`.
//! A `None` result means the row did not match the preconditions at the
//! moment of the write, so concurrent callers can never both succeed.

use rideflow_core::ride::NewRide;
use rideflow_core::types::DbId;
use sqlx::PgPool;

use crate::models::ride::RideRow;
use crate::models::status::RideStatusCode;

/// Column list for `rides` queries.
const COLUMNS: &str = "\
    id, rider_id, captain_id, pickup, destination, \
    pickup_lat, pickup_lng, destination_lat, destination_lng, \
    vehicle_type, status_id, fare, distance_meters, duration_seconds, \
    otp, otp_failed_attempts, \
    created_at, accepted_at, started_at, completed_at";

/// Provides inserts, lookups and guarded transitions for rides.
pub struct RideRepo;

impl RideRepo {
    /// Insert a ride in `requested`.
    pub async fn insert(pool: &PgPool, ride: &NewRide) -> Result<RideRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO rides (rider_id, pickup, destination, \
                 pickup_lat, pickup_lng, destination_lat, destination_lng, \
                 vehicle_type, status_id, fare, distance_meters, duration_seconds, otp) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {COLUMNS}"
        );
        let req = &ride.request;
        sqlx::query_as::<_, RideRow>(&query)
            .bind(req.rider_id)
            .bind(&req.pickup)
            .bind(&req.destination)
            .bind(req.pickup_coords.lat)
            .bind(req.pickup_coords.lng)
            .bind(req.destination_coords.lat)
            .bind(req.destination_coords.lng)
            .bind(req.vehicle_type.as_str())
            .bind(RideStatusCode::Requested.id())
            .bind(ride.fare)
            .bind(ride.distance_meters)
            .bind(ride.duration_seconds)
            .bind(&ride.otp)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RideRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rides WHERE id = $1");
        sqlx::query_as::<_, RideRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// `requested -> accepted`, assigning the captain. Only matches an
    /// unassigned ride.
    pub async fn accept(
        pool: &PgPool,
        id: DbId,
        captain_id: DbId,
    ) -> Result<Option<RideRow>, sqlx::Error> {
        let query = format!(
            "UPDATE rides \
             SET status_id = $3, captain_id = $2, accepted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4 AND captain_id IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RideRow>(&query)
            .bind(id)
            .bind(captain_id)
            .bind(RideStatusCode::Accepted.id())
            .bind(RideStatusCode::Requested.id())
            .fetch_optional(pool)
            .await
    }

    /// `accepted -> ongoing`. Matches only the assigned captain and the
    /// exact stored OTP, and clears the OTP in the same statement.
    pub async fn start(
        pool: &PgPool,
        id: DbId,
        captain_id: DbId,
        otp: &str,
        max_failed_attempts: i32,
    ) -> Result<Option<RideRow>, sqlx::Error> {
        let query = format!(
            "UPDATE rides \
             SET status_id = $3, otp = '', started_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4 AND captain_id = $2 \
               AND otp <> '' AND otp = $5 \
               AND otp_failed_attempts < $6 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RideRow>(&query)
            .bind(id)
            .bind(captain_id)
            .bind(RideStatusCode::Ongoing.id())
            .bind(RideStatusCode::Accepted.id())
            .bind(otp)
            .bind(max_failed_attempts)
            .fetch_optional(pool)
            .await
    }

    /// `ongoing -> completed` for the assigned captain.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        captain_id: DbId,
    ) -> Result<Option<RideRow>, sqlx::Error> {
        let query = format!(
            "UPDATE rides \
             SET status_id = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $4 AND captain_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RideRow>(&query)
            .bind(id)
            .bind(captain_id)
            .bind(RideStatusCode::Completed.id())
            .bind(RideStatusCode::Ongoing.id())
            .fetch_optional(pool)
            .await
    }

    /// Increment the failed-OTP counter of an `accepted` ride, returning
    /// the new value.
    pub async fn record_failed_otp(
        pool: &PgPool,
        id: DbId,
        max_attempts: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE rides \
             SET otp_failed_attempts = otp_failed_attempts + 1, updated_at = NOW() \
             WHERE id = $1 AND status_id = $2 AND otp_failed_attempts < $3 \
             RETURNING otp_failed_attempts",
        )
        .bind(id)
        .bind(RideStatusCode::Accepted.id())
        .bind(max_attempts)
        .fetch_optional(pool)
        .await
    }
}
