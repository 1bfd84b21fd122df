pub mod health;
pub mod maps;
pub mod rides;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws?token=...                   WebSocket (rider or captain)
///
/// /rides                          request a ride (rider)
/// /rides/fare                     fare quote for every vehicle class
/// /rides/{id}                     ride as seen by the caller
/// /rides/{id}/confirm             accept (captain)
/// /rides/{id}/start               start with OTP (captain)
/// /rides/{id}/end                 complete (captain)
///
/// /maps/suggestions               place autocomplete
/// /maps/distance-time             driving distance and duration
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/rides", rides::router())
        .nest("/maps", maps::router())
}
