//! Repository for the `ride_events` table.

use rideflow_core::types::DbId;
use sqlx::PgPool;

use crate::models::ride_event::RideEventRow;

const COLUMNS: &str = "id, ride_id, event_type, actor_kind, actor_id, payload, created_at";

pub struct RideEventRepo;

impl RideEventRepo {
    /// Insert a new event row, returning the generated ID.
    pub async fn insert(
        pool: &PgPool,
        ride_id: DbId,
        event_type: &str,
        actor_kind: Option<&str>,
        actor_id: Option<DbId>,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO ride_events (ride_id, event_type, actor_kind, actor_id, payload) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(ride_id)
        .bind(event_type)
        .bind(actor_kind)
        .bind(actor_id)
        .bind(payload)
        .fetch_one(pool)
        .await
    }

    /// Events for one ride, oldest first.
    pub async fn list_for_ride(
        pool: &PgPool,
        ride_id: DbId,
    ) -> Result<Vec<RideEventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ride_events WHERE ride_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, RideEventRow>(&query)
            .bind(ride_id)
            .fetch_all(pool)
            .await
    }
}
