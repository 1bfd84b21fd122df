//! Connection registry and event dispatcher behaviour.

use std::sync::Arc;

use axum::extract::ws::Message;
use rideflow_api::engine::dispatcher::{frame, EVENT_RIDE_STARTED};
use rideflow_api::engine::EventDispatcher;
use rideflow_api::ws::ConnectionRegistry;
use rideflow_core::types::ActorKey;
use serde_json::json;

fn text_of(msg: Message) -> serde_json::Value {
    match msg {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected text frame, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn join_maps_actor_to_connection() {
    let registry = ConnectionRegistry::new();
    let _rx = registry.add("c1".into()).await;

    assert!(registry.join(ActorKey::rider(1), "c1").await);
    assert_eq!(
        registry.connection_of(ActorKey::rider(1)).await.as_deref(),
        Some("c1")
    );
    assert_eq!(registry.actor_count().await, 1);
}

#[tokio::test]
async fn join_unknown_connection_fails() {
    let registry = ConnectionRegistry::new();
    assert!(!registry.join(ActorKey::captain(1), "missing").await);
    assert!(registry.lookup(ActorKey::captain(1)).await.is_none());
}

#[tokio::test]
async fn rider_and_captain_with_same_id_are_distinct() {
    let registry = ConnectionRegistry::new();
    let _a = registry.add("a".into()).await;
    let _b = registry.add("b".into()).await;
    registry.join(ActorKey::rider(5), "a").await;
    registry.join(ActorKey::captain(5), "b").await;

    assert_eq!(registry.connection_of(ActorKey::rider(5)).await.as_deref(), Some("a"));
    assert_eq!(registry.connection_of(ActorKey::captain(5)).await.as_deref(), Some("b"));
}

#[tokio::test]
async fn rejoin_replaces_and_stale_leave_keeps_newer_connection() {
    let registry = ConnectionRegistry::new();
    let actor = ActorKey::captain(9);
    let _old = registry.add("old".into()).await;
    let _new = registry.add("new".into()).await;

    registry.join(actor, "old").await;
    registry.join(actor, "new").await;
    assert_eq!(registry.connection_of(actor).await.as_deref(), Some("new"));

    // The old socket closing must not unmap the live one.
    assert_eq!(registry.leave("old").await, Some(actor));
    assert_eq!(registry.connection_of(actor).await.as_deref(), Some("new"));

    assert_eq!(registry.leave("new").await, Some(actor));
    assert!(registry.connection_of(actor).await.is_none());
    assert_eq!(registry.connection_count().await, 0);
}

#[tokio::test]
async fn leave_before_join_returns_none() {
    let registry = ConnectionRegistry::new();
    let _rx = registry.add("anon".into()).await;
    assert_eq!(registry.leave("anon").await, None);
    assert_eq!(registry.leave("anon").await, None);
}

#[tokio::test]
async fn ping_and_shutdown_reach_every_connection() {
    let registry = ConnectionRegistry::new();
    let mut rx1 = registry.add("c1".into()).await;
    let mut rx2 = registry.add("c2".into()).await;
    registry.join(ActorKey::rider(1), "c1").await;

    registry.ping_all().await;
    assert!(matches!(rx1.recv().await, Some(Message::Ping(_))));
    assert!(matches!(rx2.recv().await, Some(Message::Ping(_))));

    registry.shutdown_all().await;
    assert!(matches!(rx1.recv().await, Some(Message::Close(None))));
    assert!(matches!(rx2.recv().await, Some(Message::Close(None))));
    assert_eq!(registry.connection_count().await, 0);
    assert_eq!(registry.actor_count().await, 0);
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[test]
fn frame_wraps_event_and_data() {
    let msg = frame(EVENT_RIDE_STARTED, &json!({ "id": 3 })).unwrap();
    assert_eq!(
        text_of(msg),
        json!({ "event": "ride-started", "data": { "id": 3 } })
    );
}

#[tokio::test]
async fn dispatcher_delivers_in_order_to_joined_actor() {
    let registry = Arc::new(ConnectionRegistry::new());
    let dispatcher = EventDispatcher::new(Arc::clone(&registry));
    let mut rx = registry.add("c1".into()).await;
    registry.join(ActorKey::rider(1), "c1").await;

    assert!(dispatcher.send(ActorKey::rider(1), "first", &1).await);
    assert!(dispatcher.send(ActorKey::rider(1), "second", &2).await);

    assert_eq!(text_of(rx.recv().await.unwrap())["event"], "first");
    assert_eq!(text_of(rx.recv().await.unwrap())["event"], "second");
}

#[tokio::test]
async fn dispatcher_drops_events_for_offline_actors() {
    let registry = Arc::new(ConnectionRegistry::new());
    let dispatcher = EventDispatcher::new(Arc::clone(&registry));

    assert!(!dispatcher.send(ActorKey::captain(3), "new-ride", &json!({})).await);

    // A receiver that has gone away also counts as a drop.
    let rx = registry.add("gone".into()).await;
    registry.join(ActorKey::captain(3), "gone").await;
    drop(rx);
    assert!(!dispatcher.send(ActorKey::captain(3), "new-ride", &json!({})).await);
}
