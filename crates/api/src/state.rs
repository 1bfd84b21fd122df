use std::sync::Arc;

use rideflow_core::memory::{InMemoryCaptainStore, InMemoryRideStore};
use rideflow_core::routing::{GeocodeProvider, RouteProvider, StraightLineRouteProvider};
use rideflow_core::store::{CaptainStore, RideStore};
use rideflow_db::DbPool;
use rideflow_events::EventBus;

use crate::config::ServerConfig;
use crate::engine::{EventDispatcher, RideEngine};
use crate::ws::ConnectionRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database pool; `None` when running on the in-memory stores.
    pub pool: Option<DbPool>,
    pub config: Arc<ServerConfig>,
    /// Live WebSocket connections of riders and captains.
    pub registry: Arc<ConnectionRegistry>,
    pub captains: Arc<dyn CaptainStore>,
    pub engine: Arc<RideEngine>,
    /// Place search; `None` when no Geoapify key is configured.
    pub geocoder: Option<Arc<dyn GeocodeProvider>>,
    pub event_bus: Arc<EventBus>,
}

/// Store and provider implementations the state is wired from.
pub struct Backends {
    pub rides: Arc<dyn RideStore>,
    pub captains: Arc<dyn CaptainStore>,
    pub routes: Arc<dyn RouteProvider>,
    pub geocoder: Option<Arc<dyn GeocodeProvider>>,
}

impl Backends {
    /// Process-local stores with straight-line routing and no place search.
    pub fn in_memory() -> Self {
        Self {
            rides: Arc::new(InMemoryRideStore::new()),
            captains: Arc::new(InMemoryCaptainStore::new()),
            routes: Arc::new(StraightLineRouteProvider::default()),
            geocoder: None,
        }
    }
}

impl AppState {
    /// Wire the registry, dispatcher and engine around `backends`.
    pub fn new(
        config: ServerConfig,
        pool: Option<DbPool>,
        backends: Backends,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let engine = RideEngine::new(
            backends.rides,
            Arc::clone(&backends.captains),
            backends.routes,
            config.fares.clone(),
            EventDispatcher::new(Arc::clone(&registry)),
            Arc::clone(&event_bus),
            config.dispatch.into(),
        );

        Self {
            pool,
            config: Arc::new(config),
            registry,
            captains: backends.captains,
            engine: Arc::new(engine),
            geocoder: backends.geocoder,
            event_bus,
        }
    }

    /// Which store backend is active, for health output.
    pub fn store_kind(&self) -> &'static str {
        if self.pool.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }
}
