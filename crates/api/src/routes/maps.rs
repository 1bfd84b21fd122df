use axum::routing::get;
use axum::Router;

use crate::handlers::maps;
use crate::state::AppState;

/// Routes mounted at `/maps`.
///
/// ```text
/// GET    /suggestions     -> suggestions
/// GET    /distance-time   -> distance_time
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/suggestions", get(maps::suggestions))
        .route("/distance-time", get(maps::distance_time))
}
