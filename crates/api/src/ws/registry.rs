//! Process-local connection registry.
//!
//! Tracks every open WebSocket by connection id and maps each actor
//! (rider or captain) to at most one live connection. Both maps live
//! under one lock so join and leave are atomic with respect to each other.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use rideflow_core::types::{ActorKey, Timestamp};
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Actor that joined on this connection, if any.
    pub actor: Option<ActorKey>,
    pub sender: WsSender,
    pub connected_at: Timestamp,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<String, WsConnection>,
    actors: HashMap<ActorKey, String>,
}

/// Registry of live connections. Wrap in `Arc` and share.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new, not yet joined connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            actor: None,
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.inner.write().await.connections.insert(conn_id, conn);
        rx
    }

    /// Bind `actor` to `conn_id`, replacing any earlier connection of the
    /// same actor. Returns `false` if `conn_id` is not registered.
    pub async fn join(&self, actor: ActorKey, conn_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        let previous_actor = match inner.connections.get_mut(conn_id) {
            Some(conn) => conn.actor.replace(actor),
            None => return false,
        };

        // A connection re-joining as someone else drops its old mapping.
        if let Some(prev) = previous_actor.filter(|prev| *prev != actor) {
            if inner.actors.get(&prev).map(String::as_str) == Some(conn_id) {
                inner.actors.remove(&prev);
            }
        }

        if let Some(old_conn) = inner.actors.insert(actor, conn_id.to_string()) {
            if old_conn != conn_id {
                tracing::debug!(%actor, old_conn = %old_conn, new_conn = %conn_id, "Actor re-joined");
            }
        }
        true
    }

    /// Sender of the actor's current connection.
    pub async fn lookup(&self, actor: ActorKey) -> Option<WsSender> {
        let inner = self.inner.read().await;
        let conn_id = inner.actors.get(&actor)?;
        inner.connections.get(conn_id).map(|c| c.sender.clone())
    }

    /// Connection id currently mapped to `actor`.
    pub async fn connection_of(&self, actor: ActorKey) -> Option<String> {
        self.inner.read().await.actors.get(&actor).cloned()
    }

    /// Remove a connection.
    ///
    /// The actor mapping is only removed while it still points at
    /// `conn_id`; a stale leave after a re-join leaves the newer
    /// connection in place. Returns the actor that had joined on it.
    pub async fn leave(&self, conn_id: &str) -> Option<ActorKey> {
        let mut inner = self.inner.write().await;
        let conn = inner.connections.remove(conn_id)?;
        let actor = conn.actor?;
        if inner.actors.get(&actor).map(String::as_str) == Some(conn_id) {
            inner.actors.remove(&actor);
        }
        Some(actor)
    }

    /// Queue a message on one specific connection.
    pub async fn send_to_connection(&self, conn_id: &str, message: Message) -> bool {
        match self.inner.read().await.connections.get(conn_id) {
            Some(conn) => conn.sender.send(message).is_ok(),
            None => false,
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Number of actors with a live mapping.
    pub async fn actor_count(&self) -> usize {
        self.inner.read().await.actors.len()
    }

    /// Send a Ping frame to every connection.
    pub async fn ping_all(&self) {
        let inner = self.inner.read().await;
        for conn in inner.connections.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }

    /// Send a Close frame to every connection, then clear both maps.
    pub async fn shutdown_all(&self) {
        let mut inner = self.inner.write().await;
        let count = inner.connections.len();
        for conn in inner.connections.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        inner.connections.clear();
        inner.actors.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }
}
