//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans out [`RideEvent`]s to any number of subscribers (the
//! persistence service, tests). It is shared via `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use rideflow_core::types::{ActorKey, DbId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

pub const RIDE_CREATED: &str = "ride.created";
pub const RIDE_CONFIRMED: &str = "ride.confirmed";
pub const RIDE_STARTED: &str = "ride.started";
pub const RIDE_ENDED: &str = "ride.ended";

// ---------------------------------------------------------------------------
// RideEvent
// ---------------------------------------------------------------------------

/// A lifecycle transition of one ride.
///
/// Payloads are built from captain-facing views and never carry the OTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideEvent {
    /// Dot-separated event name, e.g. `"ride.confirmed"`.
    pub event_type: String,

    pub ride_id: DbId,

    /// Who triggered the transition.
    pub actor: Option<ActorKey>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl RideEvent {
    pub fn new(event_type: impl Into<String>, ride_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            ride_id,
            actor: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_actor(mut self, actor: ActorKey) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
pub struct EventBus {
    sender: broadcast::Sender<RideEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest messages are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped silently when there are
    /// none.
    pub fn publish(&self, event: RideEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RideEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = RideEvent::new(RIDE_CONFIRMED, 42)
            .with_actor(ActorKey::captain(7))
            .with_payload(serde_json::json!({"captainId": 7}));

        bus.publish(event);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "ride.confirmed");
        assert_eq!(received.ride_id, 42);
        assert_eq!(received.actor, Some(ActorKey::captain(7)));
        assert_eq!(received.payload["captainId"], 7);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(RideEvent::new(RIDE_CREATED, 1));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.event_type, RIDE_CREATED);
        assert_eq!(e2.event_type, RIDE_CREATED);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(RideEvent::new(RIDE_ENDED, 1));
    }

    #[test]
    fn new_event_has_empty_payload_and_no_actor() {
        let event = RideEvent::new(RIDE_STARTED, 3);
        assert!(event.actor.is_none());
        assert!(event.payload.is_object());
    }
}
