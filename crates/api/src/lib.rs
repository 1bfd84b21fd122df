//! Rideflow API server library.
//!
//! Exposes config, state, error handling, the ride engine, routes and the
//! WebSocket registry so integration tests and the binary share them.

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
