//! Ride dispatch engine.
//!
//! [`lifecycle::RideEngine`] owns the ride state machine and candidate
//! fan-out; [`dispatcher::EventDispatcher`] pushes events to actors
//! through the connection registry.

pub mod dispatcher;
pub mod lifecycle;

pub use dispatcher::EventDispatcher;
pub use lifecycle::{EngineSettings, RideEngine};
