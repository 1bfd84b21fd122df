//! Best-effort push delivery to riders and captains.
//!
//! Events are framed as `{"event": name, "data": payload}` text messages
//! and queued on the recipient's connection channel, which keeps
//! per-connection FIFO order. A recipient with no live connection is
//! skipped; nothing is retried or queued.

use std::sync::Arc;

use axum::extract::ws::Message;
use rideflow_core::types::ActorKey;
use serde::Serialize;

use crate::ws::ConnectionRegistry;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Offer of a new ride, to each candidate captain.
pub const EVENT_NEW_RIDE: &str = "new-ride";
/// A captain accepted the rider's ride.
pub const EVENT_RIDE_CONFIRMED: &str = "ride-confirmed";
pub const EVENT_RIDE_STARTED: &str = "ride-started";
pub const EVENT_RIDE_ENDED: &str = "ride-ended";
/// Reply to a client `ping`.
pub const EVENT_PONG: &str = "pong";
/// Rejected inbound message.
pub const EVENT_ERROR: &str = "error";

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    event: &'a str,
    data: &'a T,
}

/// Serialize an event into a text frame.
pub fn frame<T: Serialize>(event: &str, data: &T) -> Result<Message, serde_json::Error> {
    let text = serde_json::to_string(&Envelope { event, data })?;
    Ok(Message::Text(text.into()))
}

/// Delivers events through a [`ConnectionRegistry`].
#[derive(Clone)]
pub struct EventDispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl EventDispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Queue `event` for `actor`. Returns whether it was queued.
    pub async fn send<T: Serialize>(&self, actor: ActorKey, event: &str, data: &T) -> bool {
        let message = match frame(event, data) {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(error = %e, event, %actor, "Failed to serialize event");
                return false;
            }
        };

        let Some(sender) = self.registry.lookup(actor).await else {
            tracing::debug!(event, %actor, "No live connection, event dropped");
            return false;
        };

        if sender.send(message).is_err() {
            tracing::debug!(event, %actor, "Connection closed, event dropped");
            return false;
        }
        true
    }
}
