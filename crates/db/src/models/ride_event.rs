//! Row model for the `ride_events` audit log.

use rideflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `ride_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RideEventRow {
    pub id: DbId,
    pub ride_id: DbId,
    /// Dot-separated event name, e.g. `"ride.confirmed"`.
    pub event_type: String,
    pub actor_kind: Option<String>,
    pub actor_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}
