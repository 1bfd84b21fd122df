#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use rideflow_api::auth::jwt::{generate_access_token, JwtConfig};
use rideflow_api::config::{DispatchConfig, MapsConfig, ServerConfig};
use rideflow_api::router::build_app_router;
use rideflow_api::state::{AppState, Backends};
use rideflow_core::captain::Captain;
use rideflow_core::fare::FareTable;
use rideflow_core::geo::Coordinates;
use rideflow_core::memory::InMemoryCaptainStore;
use rideflow_core::ride::CreateRideInput;
use rideflow_core::types::{ActorKey, DbId};
use rideflow_core::vehicle::VehicleType;
use rideflow_events::EventBus;
use tower::ServiceExt;

pub const PICKUP: Coordinates = Coordinates {
    lat: 28.61,
    lng: 77.20,
};
pub const DESTINATION: Coordinates = Coordinates {
    lat: 28.70,
    lng: 77.10,
};

/// Build a test `ServerConfig`: in-memory stores, no Geoapify key.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry_mins: 60,
        },
        database_url: None,
        dispatch: DispatchConfig::default(),
        maps: MapsConfig {
            api_key: None,
            base_url: rideflow_maps::DEFAULT_BASE_URL.to_string(),
        },
        fares: FareTable::default(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    /// Same store the engine reads, for seeding captains.
    pub captains: Arc<InMemoryCaptainStore>,
}

/// Full app over in-memory stores, built through the production router.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let captains = Arc::new(InMemoryCaptainStore::new());
    let mut backends = Backends::in_memory();
    backends.captains = captains.clone();

    let state = AppState::new(
        config.clone(),
        None,
        backends,
        Arc::new(EventBus::default()),
    );
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        captains,
    }
}

pub fn captain_at(id: DbId, vehicle_type: VehicleType, location: Coordinates) -> Captain {
    Captain {
        id,
        name: format!("Captain {id}"),
        vehicle_type,
        location: Some(location),
        connection_id: None,
        location_updated_at: None,
    }
}

pub fn ride_input(vehicle_type: &str) -> CreateRideInput {
    CreateRideInput {
        pickup: "Connaught Place".to_string(),
        destination: "Rohini Sector 9".to_string(),
        vehicle_type: vehicle_type.to_string(),
        pickup_coords: PICKUP,
        destination_coords: DESTINATION,
    }
}

pub fn token_for(actor: ActorKey) -> String {
    generate_access_token(actor, &test_config().jwt).unwrap()
}

/// Send a request and return the status and parsed JSON body
/// (`Value::Null` for an empty body).
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn get(router: &Router, uri: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
    send(router, Method::GET, uri, token, None).await
}

pub async fn post(
    router: &Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(router, Method::POST, uri, token, Some(body)).await
}
