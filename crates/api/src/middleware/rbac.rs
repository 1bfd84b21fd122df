//! Role extractors. Each wraps [`AuthUser`] and rejects the other role
//! with 403.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rideflow_core::error::CoreError;
use rideflow_core::types::ActorKind;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `rider` role.
///
/// ```ignore
/// async fn rider_only(RequireRider(user): RequireRider) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireRider(pub AuthUser);

impl FromRequestParts<AppState> for RequireRider {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.kind != ActorKind::Rider {
            return Err(AppError::Core(CoreError::Forbidden(
                "Rider role required".into(),
            )));
        }
        Ok(RequireRider(user))
    }
}

/// Requires the `captain` role.
pub struct RequireCaptain(pub AuthUser);

impl FromRequestParts<AppState> for RequireCaptain {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.kind != ActorKind::Captain {
            return Err(AppError::Core(CoreError::Forbidden(
                "Captain role required".into(),
            )));
        }
        Ok(RequireCaptain(user))
    }
}
