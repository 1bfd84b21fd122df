//! Ride lifecycle: create, confirm, start, end.
//!
//! Every transition is one conditional write through
//! [`RideStore::apply_transition`]. Preconditions are checked first so
//! callers get a precise error, but correctness rests on the conditional
//! write alone: if another request changed the ride in between, the write
//! matches nothing and the ride is re-read to report why.
//!
//! Push notifications and bus events are sent after the write commits and
//! never affect the result.

use std::sync::Arc;
use std::time::Duration;

use rideflow_core::captain::{Captain, CaptainSummary};
use rideflow_core::error::CoreError;
use rideflow_core::fare::{FareQuote, FareTable};
use rideflow_core::geo::Coordinates;
use rideflow_core::geo_index::GeoIndex;
use rideflow_core::otp::{generate_otp, otp_matches};
use rideflow_core::ride::{CreateRideInput, NewRide, Ride, RideStatus, RideView};
use rideflow_core::routing::{RouteProvider, RouteSummary};
use rideflow_core::store::{CaptainStore, RideStore, RideTransition};
use rideflow_core::types::{ActorKey, ActorKind, DbId};
use rideflow_events::bus::{RIDE_CONFIRMED, RIDE_CREATED, RIDE_ENDED, RIDE_STARTED};
use rideflow_events::{EventBus, RideEvent};
use serde::Serialize;
use serde_json::json;

use super::dispatcher::{
    EventDispatcher, EVENT_NEW_RIDE, EVENT_RIDE_CONFIRMED, EVENT_RIDE_ENDED, EVENT_RIDE_STARTED,
};
use crate::config::DispatchConfig;

/// Engine tuning, taken from [`DispatchConfig`].
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub dispatch_radius_meters: f64,
    pub max_otp_attempts: i32,
    pub upstream_timeout: Duration,
}

impl From<DispatchConfig> for EngineSettings {
    fn from(config: DispatchConfig) -> Self {
        Self {
            dispatch_radius_meters: config.radius_meters,
            max_otp_attempts: config.max_otp_attempts,
            upstream_timeout: config.upstream_timeout,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        DispatchConfig::default().into()
    }
}

/// Response to a successful ride request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRide {
    /// The new ride, without the OTP.
    pub ride: RideView,
    /// Captains the offer was fanned out to.
    pub candidates: Vec<CaptainSummary>,
}

/// Payload of `ride-confirmed`, sent to the rider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideConfirmed {
    /// Rider-facing view; carries the OTP to read out at pickup.
    pub ride: RideView,
    pub captain: CaptainSummary,
}

pub struct RideEngine {
    rides: Arc<dyn RideStore>,
    captains: Arc<dyn CaptainStore>,
    geo: GeoIndex,
    routes: Arc<dyn RouteProvider>,
    fares: FareTable,
    dispatcher: EventDispatcher,
    event_bus: Arc<EventBus>,
    settings: EngineSettings,
}

impl RideEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rides: Arc<dyn RideStore>,
        captains: Arc<dyn CaptainStore>,
        routes: Arc<dyn RouteProvider>,
        fares: FareTable,
        dispatcher: EventDispatcher,
        event_bus: Arc<EventBus>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            geo: GeoIndex::new(Arc::clone(&captains)),
            rides,
            captains,
            routes,
            fares,
            dispatcher,
            event_bus,
            settings,
        }
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Create a ride in `requested` and offer it to nearby captains.
    ///
    /// A routing failure leaves the fare unset, and a failed candidate
    /// search yields no candidates; neither aborts creation.
    pub async fn create_ride(
        &self,
        rider_id: DbId,
        input: &CreateRideInput,
    ) -> Result<CreatedRide, CoreError> {
        let request = input.validate(rider_id)?;

        let (fare, distance_meters, duration_seconds) = match self
            .route(request.pickup_coords, request.destination_coords)
            .await
        {
            Ok(route) => (
                Some(self.fares.estimate(
                    route.distance_meters,
                    route.duration_seconds,
                    request.vehicle_type,
                )),
                Some(route.distance_meters),
                Some(route.duration_seconds),
            ),
            Err(e) => {
                tracing::warn!(error = %e, rider_id, "Fare estimate unavailable, creating ride without fare");
                (None, None, None)
            }
        };

        let ride = self
            .rides
            .insert(NewRide {
                otp: generate_otp(),
                fare,
                distance_meters,
                duration_seconds,
                request,
            })
            .await?;

        let candidates = match self
            .geo
            .find_candidates(
                ride.pickup_coords.lng,
                ride.pickup_coords.lat,
                self.settings.dispatch_radius_meters,
                ride.vehicle_type,
            )
            .await
        {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, ride_id = ride.id, "Candidate search failed");
                Vec::new()
            }
        };

        let offer = ride.captain_view();
        self.fan_out(&offer, &candidates);

        tracing::info!(
            ride_id = ride.id,
            rider_id,
            vehicle_type = %ride.vehicle_type,
            fare = ?ride.fare,
            candidates = candidates.len(),
            "Ride requested"
        );
        self.event_bus.publish(
            RideEvent::new(RIDE_CREATED, ride.id)
                .with_actor(ActorKey::rider(rider_id))
                .with_payload(json!({
                    "vehicleType": ride.vehicle_type,
                    "fare": ride.fare,
                    "candidates": candidates.len(),
                })),
        );

        Ok(CreatedRide {
            ride: offer,
            candidates: candidates.iter().map(Captain::summary).collect(),
        })
    }

    /// Push `new-ride` to every candidate on a background task.
    fn fan_out(&self, offer: &RideView, candidates: &[Captain]) {
        if candidates.is_empty() {
            return;
        }
        let dispatcher = self.dispatcher.clone();
        let offer = offer.clone();
        let captain_ids: Vec<DbId> = candidates.iter().map(|c| c.id).collect();

        tokio::spawn(async move {
            let mut delivered = 0usize;
            for captain_id in &captain_ids {
                if dispatcher
                    .send(ActorKey::captain(*captain_id), EVENT_NEW_RIDE, &offer)
                    .await
                {
                    delivered += 1;
                }
            }
            tracing::debug!(
                ride_id = offer.id,
                offered = captain_ids.len(),
                delivered,
                "Ride offer fan-out complete"
            );
        });
    }

    // -----------------------------------------------------------------------
    // Confirm
    // -----------------------------------------------------------------------

    /// Assign `captain_id` to a `requested` ride. First confirm wins.
    pub async fn confirm_ride(
        &self,
        ride_id: DbId,
        captain_id: DbId,
    ) -> Result<RideView, CoreError> {
        let ride = self.find_ride(ride_id).await?;
        let captain = self
            .captains
            .find_by_id(captain_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Captain",
                id: captain_id,
            })?;

        if captain.vehicle_type != ride.vehicle_type {
            return Err(CoreError::Forbidden(format!(
                "Ride {ride_id} needs a {} captain",
                ride.vehicle_type
            )));
        }
        if ride.status != RideStatus::Requested {
            return Err(CoreError::AlreadyConfirmed { ride_id });
        }

        let Some(ride) = self
            .rides
            .apply_transition(ride_id, &RideTransition::Accept { captain_id })
            .await?
        else {
            tracing::info!(ride_id, captain_id, "Confirm lost the race");
            return Err(CoreError::AlreadyConfirmed { ride_id });
        };

        tracing::info!(ride_id, captain_id, rider_id = ride.rider_id, "Ride confirmed");

        let captain_summary = captain.summary();
        self.dispatcher
            .send(
                ActorKey::rider(ride.rider_id),
                EVENT_RIDE_CONFIRMED,
                &RideConfirmed {
                    ride: ride.rider_view(),
                    captain: captain_summary.clone(),
                },
            )
            .await;
        self.event_bus.publish(
            RideEvent::new(RIDE_CONFIRMED, ride_id)
                .with_actor(ActorKey::captain(captain_id))
                .with_payload(json!({ "captain": captain_summary })),
        );

        Ok(ride.captain_view())
    }

    // -----------------------------------------------------------------------
    // Start
    // -----------------------------------------------------------------------

    /// Move an `accepted` ride to `ongoing` once the captain supplies the
    /// rider's OTP.
    pub async fn start_ride(
        &self,
        ride_id: DbId,
        captain_id: DbId,
        otp: &str,
    ) -> Result<RideView, CoreError> {
        let ride = self.find_ride(ride_id).await?;
        ensure_assigned(&ride, captain_id)?;
        ensure_status(&ride, RideStatus::Accepted)?;

        let max_attempts = self.settings.max_otp_attempts;
        if ride.otp_failed_attempts >= max_attempts {
            return Err(CoreError::TooManyOtpAttempts { ride_id });
        }

        // The store enforces the cap again, so concurrent guesses cannot
        // push the counter past it.
        let supplied = otp.trim();
        if !otp_matches(&ride.otp, supplied) {
            let Some(attempts) = self.rides.record_failed_otp(ride_id, max_attempts).await? else {
                return Err(self.explain_rejected(ride_id, captain_id, RideStatus::Accepted).await);
            };
            tracing::warn!(ride_id, captain_id, attempts, "Invalid OTP");
            return Err(CoreError::InvalidOtp { ride_id });
        }

        let transition = RideTransition::Start {
            captain_id,
            otp: supplied.to_string(),
            max_failed_attempts: max_attempts,
        };
        let Some(ride) = self.rides.apply_transition(ride_id, &transition).await? else {
            return Err(self.explain_rejected(ride_id, captain_id, RideStatus::Accepted).await);
        };

        tracing::info!(ride_id, captain_id, "Ride started");

        self.dispatcher
            .send(
                ActorKey::rider(ride.rider_id),
                EVENT_RIDE_STARTED,
                &ride.rider_view(),
            )
            .await;
        self.event_bus.publish(
            RideEvent::new(RIDE_STARTED, ride_id).with_actor(ActorKey::captain(captain_id)),
        );

        Ok(ride.captain_view())
    }

    // -----------------------------------------------------------------------
    // End
    // -----------------------------------------------------------------------

    pub async fn end_ride(&self, ride_id: DbId, captain_id: DbId) -> Result<RideView, CoreError> {
        let ride = self.find_ride(ride_id).await?;
        ensure_assigned(&ride, captain_id)?;
        ensure_status(&ride, RideStatus::Ongoing)?;

        let Some(ride) = self
            .rides
            .apply_transition(ride_id, &RideTransition::Complete { captain_id })
            .await?
        else {
            return Err(self.explain_rejected(ride_id, captain_id, RideStatus::Ongoing).await);
        };

        tracing::info!(ride_id, captain_id, fare = ?ride.fare, "Ride completed");

        self.dispatcher
            .send(
                ActorKey::rider(ride.rider_id),
                EVENT_RIDE_ENDED,
                &ride.rider_view(),
            )
            .await;
        self.event_bus.publish(
            RideEvent::new(RIDE_ENDED, ride_id)
                .with_actor(ActorKey::captain(captain_id))
                .with_payload(json!({ "fare": ride.fare })),
        );

        Ok(ride.captain_view())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Fares for every vehicle class between two points.
    pub async fn get_fare(
        &self,
        pickup: Coordinates,
        destination: Coordinates,
    ) -> Result<FareQuote, CoreError> {
        pickup.validate("pickup")?;
        destination.validate("destination")?;
        let route = self.route(pickup, destination).await?;
        Ok(self
            .fares
            .quote(route.distance_meters, route.duration_seconds))
    }

    /// Driving distance and time, bounded by the upstream timeout.
    pub async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteSummary, CoreError> {
        tokio::time::timeout(
            self.settings.upstream_timeout,
            self.routes.route(origin, destination),
        )
        .await
        .map_err(|_| CoreError::Upstream("routing provider timed out".into()))?
    }

    /// The ride as seen by `actor`: riders get their own rides with the
    /// OTP while accepted, captains only rides assigned to them.
    pub async fn get_ride(&self, ride_id: DbId, actor: ActorKey) -> Result<RideView, CoreError> {
        let ride = self.find_ride(ride_id).await?;
        match actor.kind {
            ActorKind::Rider if ride.rider_id == actor.id => Ok(ride.rider_view()),
            ActorKind::Captain if ride.captain_id == Some(actor.id) => Ok(ride.captain_view()),
            _ => Err(CoreError::Forbidden(format!(
                "Ride {ride_id} does not belong to {actor}"
            ))),
        }
    }

    // -----------------------------------------------------------------------
    // Captain presence
    // -----------------------------------------------------------------------

    pub async fn update_captain_location(
        &self,
        captain_id: DbId,
        location: Coordinates,
    ) -> Result<(), CoreError> {
        location.validate("location")?;
        if !self.captains.update_location(captain_id, location).await? {
            return Err(CoreError::NotFound {
                entity: "Captain",
                id: captain_id,
            });
        }
        tracing::trace!(captain_id, lat = location.lat, lng = location.lng, "Captain moved");
        Ok(())
    }

    // ---- private helpers ----

    async fn find_ride(&self, ride_id: DbId) -> Result<Ride, CoreError> {
        self.rides
            .find_by_id(ride_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Ride",
                id: ride_id,
            })
    }

    /// Work out why a conditional write matched nothing.
    async fn explain_rejected(
        &self,
        ride_id: DbId,
        captain_id: DbId,
        expected: RideStatus,
    ) -> CoreError {
        let ride = match self.find_ride(ride_id).await {
            Ok(ride) => ride,
            Err(e) => return e,
        };
        if let Err(e) = ensure_assigned(&ride, captain_id) {
            return e;
        }
        if let Err(e) = ensure_status(&ride, expected) {
            return e;
        }
        if expected == RideStatus::Accepted
            && ride.otp_failed_attempts >= self.settings.max_otp_attempts
        {
            return CoreError::TooManyOtpAttempts { ride_id };
        }
        CoreError::InvalidOtp { ride_id }
    }
}

fn ensure_assigned(ride: &Ride, captain_id: DbId) -> Result<(), CoreError> {
    if ride.captain_id != Some(captain_id) {
        return Err(CoreError::Forbidden(format!(
            "Ride {} is not assigned to captain {captain_id}",
            ride.id
        )));
    }
    Ok(())
}

fn ensure_status(ride: &Ride, expected: RideStatus) -> Result<(), CoreError> {
    if ride.status != expected {
        return Err(CoreError::InvalidState {
            ride_id: ride.id,
            expected,
            actual: ride.status,
        });
    }
    Ok(())
}
