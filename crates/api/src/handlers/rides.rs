//! Handlers for the `/rides` resource.
//!
//! Creation is rider-only; confirm, start and end are captain-only. Every
//! response is the OTP-free captain view except `GET /rides/{id}` for the
//! owning rider.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rideflow_core::geo::Coordinates;
use rideflow_core::ride::CreateRideInput;
use rideflow_core::types::DbId;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireCaptain, RequireRider};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /rides/{id}/start`.
#[derive(Debug, Deserialize)]
pub struct StartRideInput {
    pub otp: String,
}

/// Query of `GET /rides/fare`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareQuery {
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub destination_lat: f64,
    pub destination_lng: f64,
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/rides
///
/// Returns 201 with the ride (no OTP) and the captains it was offered to.
pub async fn create_ride(
    RequireRider(rider): RequireRider,
    State(state): State<AppState>,
    Json(input): Json<CreateRideInput>,
) -> AppResult<impl IntoResponse> {
    let created = state.engine.create_ride(rider.user_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /api/v1/rides/fare?pickupLat=&pickupLng=&destinationLat=&destinationLng=
pub async fn get_fare(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<FareQuery>,
) -> AppResult<impl IntoResponse> {
    let quote = state
        .engine
        .get_fare(
            Coordinates::new(q.pickup_lat, q.pickup_lng),
            Coordinates::new(q.destination_lat, q.destination_lng),
        )
        .await?;
    Ok(Json(DataResponse { data: quote }))
}

/// GET /api/v1/rides/{id}
pub async fn get_ride(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(ride_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let ride = state.engine.get_ride(ride_id, auth.actor()).await?;
    Ok(Json(DataResponse { data: ride }))
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// POST /api/v1/rides/{id}/confirm
pub async fn confirm_ride(
    RequireCaptain(captain): RequireCaptain,
    State(state): State<AppState>,
    Path(ride_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let ride = state.engine.confirm_ride(ride_id, captain.user_id).await?;
    Ok(Json(DataResponse { data: ride }))
}

/// POST /api/v1/rides/{id}/start
pub async fn start_ride(
    RequireCaptain(captain): RequireCaptain,
    State(state): State<AppState>,
    Path(ride_id): Path<DbId>,
    Json(input): Json<StartRideInput>,
) -> AppResult<impl IntoResponse> {
    let ride = state
        .engine
        .start_ride(ride_id, captain.user_id, &input.otp)
        .await?;
    Ok(Json(DataResponse { data: ride }))
}

/// POST /api/v1/rides/{id}/end
pub async fn end_ride(
    RequireCaptain(captain): RequireCaptain,
    State(state): State<AppState>,
    Path(ride_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let ride = state.engine.end_ride(ride_id, captain.user_id).await?;
    Ok(Json(DataResponse { data: ride }))
}
