//! Handlers for `/maps`: place autocomplete and route summaries.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use rideflow_core::error::CoreError;
use rideflow_core::geo::Coordinates;
use rideflow_core::routing::validate_query;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SuggestionsQuery {
    pub input: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceTimeQuery {
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub destination_lat: f64,
    pub destination_lng: f64,
}

/// GET /api/v1/maps/suggestions?input=
pub async fn suggestions(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<SuggestionsQuery>,
) -> AppResult<impl IntoResponse> {
    let text = validate_query(&q.input)?;
    let geocoder = state
        .geocoder
        .as_ref()
        .ok_or_else(|| CoreError::Upstream("place search is not configured".into()))?;

    let places = tokio::time::timeout(
        state.engine.settings().upstream_timeout,
        geocoder.autocomplete(text),
    )
    .await
    .map_err(|_| CoreError::Upstream("geocoding provider timed out".into()))??;

    Ok(Json(DataResponse { data: places }))
}

/// GET /api/v1/maps/distance-time?originLat=&originLng=&destinationLat=&destinationLng=
pub async fn distance_time(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<DistanceTimeQuery>,
) -> AppResult<impl IntoResponse> {
    let origin = Coordinates::new(q.origin_lat, q.origin_lng);
    let destination = Coordinates::new(q.destination_lat, q.destination_lng);
    origin.validate("origin")?;
    destination.validate("destination")?;

    let route = state.engine.route(origin, destination).await?;
    Ok(Json(DataResponse { data: route }))
}
