//! Geoapify routing and place-autocomplete client.
//!
//! [`GeoapifyClient`] implements the `rideflow-core` [`RouteProvider`] and
//! [`GeocodeProvider`] seams.
//!
//! [`RouteProvider`]: rideflow_core::routing::RouteProvider
//! [`GeocodeProvider`]: rideflow_core::routing::GeocodeProvider

pub mod api;
pub mod parse;

pub use api::{GeoapifyClient, MapsApiError, DEFAULT_BASE_URL};
