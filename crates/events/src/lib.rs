//! Ride event bus and audit persistence.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`RideEvent`]: the lifecycle event envelope.
//! - [`EventPersistence`]: background service that writes every event to
//!   the `ride_events` table.

pub mod bus;
pub mod persistence;

pub use bus::{EventBus, RideEvent};
pub use persistence::EventPersistence;
