//! Ride engine behaviour over the in-memory stores: creation and
//! candidate search, first-confirm-wins, OTP gating, and push delivery.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use axum::extract::ws::Message;
use rideflow_api::engine::{EngineSettings, EventDispatcher, RideEngine};
use rideflow_api::ws::ConnectionRegistry;
use rideflow_core::captain::Captain;
use rideflow_core::error::CoreError;
use rideflow_core::fare::FareTable;
use rideflow_core::geo::Coordinates;
use rideflow_core::memory::{InMemoryCaptainStore, InMemoryRideStore};
use rideflow_core::ride::{CreateRideInput, RideStatus};
use rideflow_core::routing::StraightLineRouteProvider;
use rideflow_core::store::CaptainStore;
use rideflow_core::types::{ActorKey, DbId};
use rideflow_core::vehicle::VehicleType;
use rideflow_events::EventBus;
use tokio::sync::{mpsc, Mutex};

use common::{captain_at, ride_input, PICKUP};

const RIDER: DbId = 1;

/// Records every radius query, then delegates.
#[derive(Default)]
struct SpyCaptainStore {
    inner: InMemoryCaptainStore,
    queries: Mutex<Vec<(Coordinates, f64, VehicleType)>>,
}

#[async_trait]
impl CaptainStore for SpyCaptainStore {
    async fn find_by_id(&self, id: DbId) -> Result<Option<Captain>, CoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_within_radius(
        &self,
        center: Coordinates,
        radius_meters: f64,
        vehicle_type: VehicleType,
    ) -> Result<Vec<Captain>, CoreError> {
        self.queries
            .lock()
            .await
            .push((center, radius_meters, vehicle_type));
        self.inner
            .find_within_radius(center, radius_meters, vehicle_type)
            .await
    }

    async fn update_location(&self, id: DbId, location: Coordinates) -> Result<bool, CoreError> {
        self.inner.update_location(id, location).await
    }

    async fn set_connection(&self, id: DbId, connection_id: &str) -> Result<bool, CoreError> {
        self.inner.set_connection(id, connection_id).await
    }

    async fn clear_connection(&self, id: DbId, connection_id: &str) -> Result<bool, CoreError> {
        self.inner.clear_connection(id, connection_id).await
    }
}

struct Harness {
    engine: Arc<RideEngine>,
    registry: Arc<ConnectionRegistry>,
    captains: Arc<SpyCaptainStore>,
}

fn harness() -> Harness {
    let registry = Arc::new(ConnectionRegistry::new());
    let captains = Arc::new(SpyCaptainStore::default());
    let engine = RideEngine::new(
        Arc::new(InMemoryRideStore::new()),
        captains.clone(),
        Arc::new(StraightLineRouteProvider::default()),
        FareTable::default(),
        EventDispatcher::new(Arc::clone(&registry)),
        Arc::new(EventBus::default()),
        EngineSettings::default(),
    );
    Harness {
        engine: Arc::new(engine),
        registry,
        captains,
    }
}

impl Harness {
    async fn add_captain(&self, id: DbId, vehicle_type: VehicleType, location: Coordinates) {
        self.captains
            .inner
            .upsert(captain_at(id, vehicle_type, location))
            .await;
    }

    async fn connect(&self, actor: ActorKey) -> mpsc::UnboundedReceiver<Message> {
        let conn_id = format!("conn-{actor}");
        let rx = self.registry.add(conn_id.clone()).await;
        assert!(self.registry.join(actor, &conn_id).await);
        rx
    }

    /// A ride already accepted by `captain_id`, returning its id and OTP.
    async fn accepted_ride(&self, captain_id: DbId) -> (DbId, String) {
        self.add_captain(captain_id, VehicleType::Car, PICKUP).await;
        let created = self
            .engine
            .create_ride(RIDER, &ride_input("Car"))
            .await
            .unwrap();
        let ride_id = created.ride.id;
        self.engine.confirm_ride(ride_id, captain_id).await.unwrap();
        let view = self
            .engine
            .get_ride(ride_id, ActorKey::rider(RIDER))
            .await
            .unwrap();
        (ride_id, view.otp.expect("rider sees the OTP while accepted"))
    }
}

/// Next text frame, parsed.
async fn next_event(rx: &mut mpsc::UnboundedReceiver<Message>) -> serde_json::Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("channel closed");
    match msg {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected text frame, got {other:?}"),
    }
}

fn wrong_otp(otp: &str) -> String {
    otp.chars()
        .map(|c| if c == '9' { '0' } else { char::from(c as u8 + 1) })
        .collect()
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_ride_is_requested_with_six_digit_otp_and_fare() {
    let h = harness();

    let created = h
        .engine
        .create_ride(RIDER, &ride_input("Car"))
        .await
        .unwrap();

    assert_eq!(created.ride.status, RideStatus::Requested);
    assert_eq!(created.ride.vehicle_type, VehicleType::Car);
    assert!(created.ride.otp.is_none(), "creation response is OTP-free");
    assert!(created.ride.fare.is_some_and(|f| f > 0.0));

    let rider_view = h
        .engine
        .get_ride(created.ride.id, ActorKey::rider(RIDER))
        .await
        .unwrap();
    // Not yet accepted, so the rider view does not carry it either.
    assert!(rider_view.otp.is_none());

    let queries = h.captains.queries.lock().await;
    assert_eq!(queries.len(), 1);
    let (center, radius, vehicle_type) = queries[0];
    assert_eq!(center, PICKUP);
    assert_eq!(radius, 7000.0);
    assert_eq!(vehicle_type, VehicleType::Car);
}

#[tokio::test]
async fn create_ride_offers_only_nearby_matching_captains() {
    let h = harness();
    h.add_captain(10, VehicleType::Car, Coordinates::new(28.62, 77.21))
        .await;
    h.add_captain(11, VehicleType::Auto, Coordinates::new(28.62, 77.21))
        .await;
    h.add_captain(12, VehicleType::Car, Coordinates::new(28.90, 77.50))
        .await;
    let mut near = h.connect(ActorKey::captain(10)).await;
    let mut other_type = h.connect(ActorKey::captain(11)).await;

    let created = h
        .engine
        .create_ride(RIDER, &ride_input("Car"))
        .await
        .unwrap();

    let ids: Vec<DbId> = created.candidates.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![10]);

    let event = next_event(&mut near).await;
    assert_eq!(event["event"], "new-ride");
    assert_eq!(event["data"]["id"], created.ride.id);
    assert!(event["data"].get("otp").is_none());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(other_type.try_recv().is_err());
}

#[tokio::test]
async fn create_ride_finds_captains_across_the_antimeridian() {
    let h = harness();
    h.add_captain(13, VehicleType::Car, Coordinates::new(0.0, -179.99))
        .await;
    h.add_captain(14, VehicleType::Car, Coordinates::new(0.0, 179.0))
        .await;

    let input = CreateRideInput {
        pickup_coords: Coordinates::new(0.0, 179.99),
        destination_coords: Coordinates::new(0.05, 179.95),
        ..ride_input("Car")
    };
    let created = h.engine.create_ride(RIDER, &input).await.unwrap();

    let ids: Vec<DbId> = created.candidates.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![13]);
}

#[tokio::test]
async fn create_ride_with_no_captains_still_succeeds() {
    let h = harness();
    let created = h
        .engine
        .create_ride(RIDER, &ride_input("Motorcycle"))
        .await
        .unwrap();
    assert!(created.candidates.is_empty());
    assert_eq!(created.ride.status, RideStatus::Requested);
}

#[tokio::test]
async fn create_ride_rejects_unknown_vehicle_type() {
    let h = harness();
    let result = h.engine.create_ride(RIDER, &ride_input("Bus")).await;
    assert_matches!(result, Err(CoreError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Confirm
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_confirms_have_exactly_one_winner() {
    let h = harness();
    h.add_captain(20, VehicleType::Car, PICKUP).await;
    h.add_captain(21, VehicleType::Car, PICKUP).await;
    let ride_id = h
        .engine
        .create_ride(RIDER, &ride_input("Car"))
        .await
        .unwrap()
        .ride
        .id;

    let a = tokio::spawn({
        let engine = Arc::clone(&h.engine);
        async move { engine.confirm_ride(ride_id, 20).await }
    });
    let b = tokio::spawn({
        let engine = Arc::clone(&h.engine);
        async move { engine.confirm_ride(ride_id, 21).await }
    });
    let results = [(20, a.await.unwrap()), (21, b.await.unwrap())];

    let winners: Vec<DbId> = results
        .iter()
        .filter(|(_, r)| r.is_ok())
        .map(|(id, _)| *id)
        .collect();
    assert_eq!(winners.len(), 1);
    for (_, result) in &results {
        if let Err(e) = result {
            assert_matches!(e, CoreError::AlreadyConfirmed { ride_id: id } if *id == ride_id);
        }
    }

    let ride = h
        .engine
        .get_ride(ride_id, ActorKey::rider(RIDER))
        .await
        .unwrap();
    assert_eq!(ride.status, RideStatus::Accepted);
    assert_eq!(ride.captain_id, Some(winners[0]));
}

#[tokio::test]
async fn confirm_notifies_rider_with_otp_and_captain() {
    let h = harness();
    h.add_captain(30, VehicleType::Car, PICKUP).await;
    let mut rider = h.connect(ActorKey::rider(RIDER)).await;
    let ride_id = h
        .engine
        .create_ride(RIDER, &ride_input("Car"))
        .await
        .unwrap()
        .ride
        .id;

    let view = h.engine.confirm_ride(ride_id, 30).await.unwrap();
    assert!(view.otp.is_none(), "captain response never carries the OTP");

    let event = next_event(&mut rider).await;
    assert_eq!(event["event"], "ride-confirmed");
    assert_eq!(event["data"]["ride"]["status"], "accepted");
    assert_eq!(event["data"]["ride"]["otp"].as_str().map(str::len), Some(6));
    assert_eq!(event["data"]["captain"]["id"], 30);
}

#[tokio::test]
async fn confirm_rejects_mismatched_vehicle_and_unknown_captain() {
    let h = harness();
    h.add_captain(40, VehicleType::Auto, PICKUP).await;
    let ride_id = h
        .engine
        .create_ride(RIDER, &ride_input("Car"))
        .await
        .unwrap()
        .ride
        .id;

    assert_matches!(
        h.engine.confirm_ride(ride_id, 40).await,
        Err(CoreError::Forbidden(_))
    );
    assert_matches!(
        h.engine.confirm_ride(ride_id, 999).await,
        Err(CoreError::NotFound { entity: "Captain", .. })
    );
    assert_matches!(
        h.engine.confirm_ride(12345, 40).await,
        Err(CoreError::NotFound { entity: "Ride", .. })
    );
}

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_with_correct_otp_moves_to_ongoing_and_drops_otp() {
    let h = harness();
    let (ride_id, otp) = h.accepted_ride(50).await;

    let view = h.engine.start_ride(ride_id, 50, &otp).await.unwrap();
    assert_eq!(view.status, RideStatus::Ongoing);
    assert!(view.otp.is_none());

    let rider_view = h
        .engine
        .get_ride(ride_id, ActorKey::rider(RIDER))
        .await
        .unwrap();
    assert!(rider_view.otp.is_none());
    assert!(rider_view.started_at.is_some());
}

#[tokio::test]
async fn start_with_wrong_otp_stays_accepted() {
    let h = harness();
    let (ride_id, otp) = h.accepted_ride(51).await;

    let result = h.engine.start_ride(ride_id, 51, &wrong_otp(&otp)).await;
    assert_matches!(result, Err(CoreError::InvalidOtp { .. }));

    let ride = h
        .engine
        .get_ride(ride_id, ActorKey::rider(RIDER))
        .await
        .unwrap();
    assert_eq!(ride.status, RideStatus::Accepted);
    assert_eq!(ride.otp.as_deref(), Some(otp.as_str()));
}

#[tokio::test]
async fn start_by_other_captain_is_forbidden() {
    let h = harness();
    let (ride_id, otp) = h.accepted_ride(52).await;
    h.add_captain(53, VehicleType::Car, PICKUP).await;

    assert_matches!(
        h.engine.start_ride(ride_id, 53, &otp).await,
        Err(CoreError::Forbidden(_))
    );
}

#[tokio::test]
async fn start_locks_after_too_many_wrong_otps() {
    let h = harness();
    let (ride_id, otp) = h.accepted_ride(54).await;
    let max = EngineSettings::default().max_otp_attempts;

    for _ in 0..max {
        assert_matches!(
            h.engine.start_ride(ride_id, 54, &wrong_otp(&otp)).await,
            Err(CoreError::InvalidOtp { .. })
        );
    }
    assert_matches!(
        h.engine.start_ride(ride_id, 54, &otp).await,
        Err(CoreError::TooManyOtpAttempts { .. })
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_wrong_otps_never_exceed_attempt_cap() {
    let h = harness();
    let (ride_id, otp) = h.accepted_ride(56).await;
    let max = EngineSettings::default().max_otp_attempts;
    let guess = wrong_otp(&otp);

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let engine = Arc::clone(&h.engine);
            let guess = guess.clone();
            tokio::spawn(async move { engine.start_ride(ride_id, 56, &guess).await })
        })
        .collect();

    let mut invalid = 0;
    let mut locked = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Err(CoreError::InvalidOtp { .. }) => invalid += 1,
            Err(CoreError::TooManyOtpAttempts { .. }) => locked += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(invalid, max);
    assert_eq!(locked, 50 - max);

    assert_matches!(
        h.engine.start_ride(ride_id, 56, &otp).await,
        Err(CoreError::TooManyOtpAttempts { .. })
    );
    let view = h
        .engine
        .get_ride(ride_id, ActorKey::rider(RIDER))
        .await
        .unwrap();
    assert_eq!(view.status, RideStatus::Accepted);
}

#[tokio::test]
async fn start_twice_is_invalid_state() {
    let h = harness();
    let (ride_id, otp) = h.accepted_ride(55).await;
    h.engine.start_ride(ride_id, 55, &otp).await.unwrap();

    assert_matches!(
        h.engine.start_ride(ride_id, 55, &otp).await,
        Err(CoreError::InvalidState {
            actual: RideStatus::Ongoing,
            ..
        })
    );
}

// ---------------------------------------------------------------------------
// End
// ---------------------------------------------------------------------------

#[tokio::test]
async fn end_completes_ongoing_ride_and_notifies_rider() {
    let h = harness();
    let (ride_id, otp) = h.accepted_ride(60).await;
    h.engine.start_ride(ride_id, 60, &otp).await.unwrap();
    let mut rider = h.connect(ActorKey::rider(RIDER)).await;

    let view = h.engine.end_ride(ride_id, 60).await.unwrap();
    assert_eq!(view.status, RideStatus::Completed);
    assert!(view.completed_at.is_some());

    let event = next_event(&mut rider).await;
    assert_eq!(event["event"], "ride-ended");
    assert_eq!(event["data"]["status"], "completed");
    assert!(event["data"].get("otp").is_none());
}

#[tokio::test]
async fn end_before_start_is_invalid_state() {
    let h = harness();
    let (ride_id, _) = h.accepted_ride(61).await;

    assert_matches!(
        h.engine.end_ride(ride_id, 61).await,
        Err(CoreError::InvalidState {
            expected: RideStatus::Ongoing,
            actual: RideStatus::Accepted,
            ..
        })
    );
}

#[tokio::test]
async fn end_by_other_captain_is_forbidden() {
    let h = harness();
    let (ride_id, otp) = h.accepted_ride(62).await;
    h.engine.start_ride(ride_id, 62, &otp).await.unwrap();

    assert_matches!(
        h.engine.end_ride(ride_id, 63).await,
        Err(CoreError::Forbidden(_))
    );
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_ride_is_limited_to_participants() {
    let h = harness();
    let (ride_id, _) = h.accepted_ride(70).await;

    let captain_view = h
        .engine
        .get_ride(ride_id, ActorKey::captain(70))
        .await
        .unwrap();
    assert!(captain_view.otp.is_none());

    assert_matches!(
        h.engine.get_ride(ride_id, ActorKey::rider(RIDER + 1)).await,
        Err(CoreError::Forbidden(_))
    );
    assert_matches!(
        h.engine.get_ride(ride_id, ActorKey::captain(71)).await,
        Err(CoreError::Forbidden(_))
    );
}

#[tokio::test]
async fn fare_quote_covers_every_vehicle_class() {
    let h = harness();
    let quote = h
        .engine
        .get_fare(PICKUP, common::DESTINATION)
        .await
        .unwrap();
    assert!(quote.distance_meters > 0.0);
    for vt in VehicleType::ALL {
        assert!(quote.fares[&vt] > 0.0);
    }
}

#[tokio::test]
async fn location_update_requires_known_captain_and_valid_point() {
    let h = harness();
    h.add_captain(80, VehicleType::Car, PICKUP).await;

    h.engine
        .update_captain_location(80, Coordinates::new(28.65, 77.15))
        .await
        .unwrap();
    let captain = h.captains.find_by_id(80).await.unwrap().unwrap();
    assert_eq!(captain.location, Some(Coordinates::new(28.65, 77.15)));

    assert_matches!(
        h.engine
            .update_captain_location(81, Coordinates::new(28.65, 77.15))
            .await,
        Err(CoreError::NotFound { .. })
    );
    assert_matches!(
        h.engine
            .update_captain_location(80, Coordinates::new(95.0, 77.15))
            .await,
        Err(CoreError::Validation(_))
    );
}
