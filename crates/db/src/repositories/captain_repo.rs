//! Repository for the `captains` table.

use rideflow_core::geo::{BoundingBox, Coordinates};
use rideflow_core::types::DbId;
use rideflow_core::vehicle::VehicleType;
use sqlx::PgPool;

use crate::models::captain::{CaptainRow, CreateCaptain};

/// Column list for `captains` queries.
const COLUMNS: &str = "\
    id, name, vehicle_type, lat, lng, connection_id, \
    location_updated_at, created_at, updated_at";

pub struct CaptainRepo;

impl CaptainRepo {
    pub async fn create(pool: &PgPool, input: &CreateCaptain) -> Result<CaptainRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO captains (name, vehicle_type, lat, lng, location_updated_at) \
             VALUES ($1, $2, $3, $4, CASE WHEN $3 IS NULL THEN NULL ELSE NOW() END) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CaptainRow>(&query)
            .bind(&input.name)
            .bind(input.vehicle_type.as_str())
            .bind(input.location.map(|c| c.lat))
            .bind(input.location.map(|c| c.lng))
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CaptainRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM captains WHERE id = $1");
        sqlx::query_as::<_, CaptainRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Captains of `vehicle_type` inside `bbox`.
    ///
    /// Uses the `(vehicle_type, lat, lng)` index. The result is a superset
    /// of the circle; callers apply the exact distance check.
    pub async fn find_in_box(
        pool: &PgPool,
        bbox: &BoundingBox,
        vehicle_type: VehicleType,
    ) -> Result<Vec<CaptainRow>, sqlx::Error> {
        // A box across the antimeridian covers both ends of the lng range.
        let lng_clause = if bbox.crosses_antimeridian() {
            "(lng >= $4 OR lng <= $5)"
        } else {
            "lng BETWEEN $4 AND $5"
        };
        let query = format!(
            "SELECT {COLUMNS} FROM captains \
             WHERE vehicle_type = $1 \
               AND lat BETWEEN $2 AND $3 \
               AND {lng_clause}"
        );
        sqlx::query_as::<_, CaptainRow>(&query)
            .bind(vehicle_type.as_str())
            .bind(bbox.min_lat)
            .bind(bbox.max_lat)
            .bind(bbox.min_lng)
            .bind(bbox.max_lng)
            .fetch_all(pool)
            .await
    }

    /// Returns `true` if the captain exists.
    pub async fn update_location(
        pool: &PgPool,
        id: DbId,
        location: Coordinates,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE captains \
             SET lat = $2, lng = $3, location_updated_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(location.lat)
        .bind(location.lng)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_connection(
        pool: &PgPool,
        id: DbId,
        connection_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE captains SET connection_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(connection_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear `connection_id` only if it still equals `connection_id`, so a
    /// late disconnect cannot wipe a newer connection.
    pub async fn clear_connection(
        pool: &PgPool,
        id: DbId,
        connection_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE captains SET connection_id = NULL, updated_at = NOW() \
             WHERE id = $1 AND connection_id = $2",
        )
        .bind(id)
        .bind(connection_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
