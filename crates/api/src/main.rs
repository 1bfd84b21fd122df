use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rideflow_core::routing::{GeocodeProvider, StraightLineRouteProvider};
use rideflow_db::{DbPool, PgCaptainStore, PgRideStore};
use rideflow_maps::GeoapifyClient;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rideflow_api::config::ServerConfig;
use rideflow_api::router::build_app_router;
use rideflow_api::state::{AppState, Backends};
use rideflow_api::ws;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rideflow_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Stores ---
    let pool = match &config.database_url {
        Some(url) => Some(connect_database(url).await),
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            None
        }
    };
    let mut backends = match &pool {
        Some(pool) => Backends {
            rides: Arc::new(PgRideStore::new(pool.clone())),
            captains: Arc::new(PgCaptainStore::new(pool.clone())),
            routes: Arc::new(StraightLineRouteProvider::default()),
            geocoder: None,
        },
        None => Backends::in_memory(),
    };

    // --- Map providers ---
    match &config.maps.api_key {
        Some(key) => {
            let client = Arc::new(
                GeoapifyClient::new(
                    config.maps.base_url.as_str(),
                    key.as_str(),
                    config.dispatch.upstream_timeout,
                )
                .expect("Failed to build Geoapify client"),
            );
            let geocoder: Arc<dyn GeocodeProvider> = client.clone();
            backends.routes = client;
            backends.geocoder = Some(geocoder);
            tracing::info!(base_url = %config.maps.base_url, "Geoapify provider enabled");
        }
        None => {
            tracing::warn!("GEOAPIFY_API_KEY not set, using straight-line route estimates");
        }
    }

    // --- Event bus ---
    let event_bus = Arc::new(rideflow_events::EventBus::default());
    let persistence_handle = pool.clone().map(|pool| {
        tokio::spawn(rideflow_events::EventPersistence::run(
            pool,
            event_bus.subscribe(),
        ))
    });

    // --- App state ---
    let state = AppState::new(
        config.clone(),
        pool,
        backends,
        Arc::clone(&event_bus),
    );
    let registry = Arc::clone(&state.registry);

    // --- Heartbeat ---
    let heartbeat_cancel = CancellationToken::new();
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&registry), heartbeat_cancel.clone());

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    heartbeat_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), heartbeat_handle).await;

    let ws_count = registry.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    registry.shutdown_all().await;

    // Last sender; closing the channel stops persistence.
    drop(event_bus);
    if let Some(handle) = persistence_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        tracing::info!("Event persistence shut down");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Connect, verify, and migrate. Any failure aborts startup.
async fn connect_database(url: &str) -> DbPool {
    let pool = rideflow_db::create_pool(url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    rideflow_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    rideflow_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    pool
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
