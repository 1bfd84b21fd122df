//! Route definitions for the `/rides` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::rides;
use crate::state::AppState;

/// Routes mounted at `/rides`.
///
/// ```text
/// POST   /                -> create_ride
/// GET    /fare            -> get_fare
/// GET    /{id}            -> get_ride
/// POST   /{id}/confirm    -> confirm_ride
/// POST   /{id}/start      -> start_ride
/// POST   /{id}/end        -> end_ride
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(rides::create_ride))
        .route("/fare", get(rides::get_fare))
        .route("/{id}", get(rides::get_ride))
        .route("/{id}/confirm", post(rides::confirm_ride))
        .route("/{id}/start", post(rides::start_ride))
        .route("/{id}/end", post(rides::end_ride))
}
