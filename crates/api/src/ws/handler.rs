//! Authenticated WebSocket upgrade and the per-connection message loop.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use rideflow_core::error::CoreError;
use rideflow_core::geo::Coordinates;
use rideflow_core::types::{ActorKey, ActorKind};
use serde::Deserialize;
use serde_json::json;

use crate::engine::dispatcher::{frame, EVENT_ERROR, EVENT_PONG};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Inbound client events, framed as `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Periodic position report from a captain.
    UpdateLocationCaptain { location: Coordinates },
    Ping,
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Authenticated identity for a WebSocket upgrade.
///
/// Browsers cannot set headers on a WebSocket handshake, so the access
/// token travels as `?token=`.
pub struct WsAuth(pub AuthUser);

impl FromRequestParts<AppState> for WsAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Missing token query parameter".into()))
            })?;

        AuthUser::from_token(&token, state).map(WsAuth)
    }
}

/// Upgrade to a WebSocket bound to the caller's identity.
///
/// Authentication runs before the upgrade, so a bad token is a plain 401.
pub async fn ws_handler(
    WsAuth(user): WsAuth,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, user.actor()))
}

/// Drive one connection: register and join, forward outbound messages
/// from the registry channel, process inbound events, then clean up.
async fn handle_socket(socket: WebSocket, state: AppState, actor: ActorKey) {
    let conn_id = uuid::Uuid::new_v4().to_string();

    let mut rx = state.registry.add(conn_id.clone()).await;
    state.registry.join(actor, &conn_id).await;
    if actor.kind == ActorKind::Captain {
        match state.captains.set_connection(actor.id, &conn_id).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(%actor, conn_id = %conn_id, "Unknown captain joined"),
            Err(e) => tracing::error!(%actor, error = %e, "Failed to record captain connection"),
        }
    }
    tracing::info!(%actor, conn_id = %conn_id, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_text(&state, actor, &conn_id, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    state.registry.leave(&conn_id).await;
    if actor.kind == ActorKind::Captain {
        if let Err(e) = state.captains.clear_connection(actor.id, &conn_id).await {
            tracing::error!(%actor, error = %e, "Failed to clear captain connection");
        }
    }
    send_task.abort();
    tracing::info!(%actor, conn_id = %conn_id, "WebSocket disconnected");
}

async fn handle_text(state: &AppState, actor: ActorKey, conn_id: &str, text: &str) {
    let outcome = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Ping) => {
            reply(state, conn_id, EVENT_PONG, &json!({})).await;
            return;
        }
        Ok(ClientMessage::UpdateLocationCaptain { location }) => {
            if actor.kind != ActorKind::Captain {
                Err(CoreError::Forbidden("Only captains report location".into()))
            } else {
                state
                    .engine
                    .update_captain_location(actor.id, location)
                    .await
            }
        }
        Err(e) => Err(CoreError::Validation(format!("Unrecognised message: {e}"))),
    };

    if let Err(e) = outcome {
        tracing::debug!(%actor, conn_id, error = %e, "Inbound event rejected");
        reply(state, conn_id, EVENT_ERROR, &json!({ "message": e.to_string() })).await;
    }
}

async fn reply(state: &AppState, conn_id: &str, event: &str, data: &serde_json::Value) {
    match frame(event, data) {
        Ok(message) => {
            state.registry.send_to_connection(conn_id, message).await;
        }
        Err(e) => tracing::error!(error = %e, event, "Failed to serialize reply"),
    }
}
