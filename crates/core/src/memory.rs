//! Process-local store implementations.
//!
//! Used when no database is configured and throughout the test suites.
//! Each conditional update runs inside a single mutex critical section, so
//! it gives the same first-writer-wins guarantee as the Postgres
//! conditional `UPDATE`. The lock is never held across an `.await` on
//! anything other than the lock itself.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::captain::Captain;
use crate::error::CoreError;
use crate::geo::{BoundingBox, Coordinates};
use crate::ride::{NewRide, Ride, RideStatus};
use crate::store::{CaptainStore, RideStore, RideTransition};
use crate::types::DbId;
use crate::vehicle::VehicleType;

// ---------------------------------------------------------------------------
// Rides
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RideTable {
    next_id: DbId,
    rows: HashMap<DbId, Ride>,
}

/// In-memory [`RideStore`].
#[derive(Default)]
pub struct InMemoryRideStore {
    inner: Mutex<RideTable>,
}

impl InMemoryRideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RideStore for InMemoryRideStore {
    async fn insert(&self, ride: NewRide) -> Result<Ride, CoreError> {
        let mut table = self.inner.lock().await;
        table.next_id += 1;
        let id = table.next_id;

        let request = ride.request;
        let row = Ride {
            id,
            rider_id: request.rider_id,
            captain_id: None,
            pickup: request.pickup,
            destination: request.destination,
            pickup_coords: request.pickup_coords,
            destination_coords: request.destination_coords,
            vehicle_type: request.vehicle_type,
            status: RideStatus::Requested,
            fare: ride.fare,
            distance_meters: ride.distance_meters,
            duration_seconds: ride.duration_seconds,
            otp: ride.otp,
            otp_failed_attempts: 0,
            created_at: Utc::now(),
            accepted_at: None,
            started_at: None,
            completed_at: None,
        };
        table.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Ride>, CoreError> {
        Ok(self.inner.lock().await.rows.get(&id).cloned())
    }

    async fn apply_transition(
        &self,
        ride_id: DbId,
        transition: &RideTransition,
    ) -> Result<Option<Ride>, CoreError> {
        let mut table = self.inner.lock().await;
        let Some(ride) = table.rows.get_mut(&ride_id) else {
            return Ok(None);
        };
        if !transition.is_applicable_to(ride) {
            return Ok(None);
        }

        let now = Utc::now();
        ride.status = transition.to_status();
        match transition {
            RideTransition::Accept { captain_id } => {
                ride.captain_id = Some(*captain_id);
                ride.accepted_at = Some(now);
            }
            RideTransition::Start { .. } => {
                ride.otp.clear();
                ride.started_at = Some(now);
            }
            RideTransition::Complete { .. } => {
                ride.completed_at = Some(now);
            }
        }
        Ok(Some(ride.clone()))
    }

    async fn record_failed_otp(
        &self,
        ride_id: DbId,
        max_attempts: i32,
    ) -> Result<Option<i32>, CoreError> {
        let mut table = self.inner.lock().await;
        match table.rows.get_mut(&ride_id) {
            Some(ride)
                if ride.status == RideStatus::Accepted
                    && ride.otp_failed_attempts < max_attempts =>
            {
                ride.otp_failed_attempts += 1;
                Ok(Some(ride.otp_failed_attempts))
            }
            _ => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Captains
// ---------------------------------------------------------------------------

/// In-memory [`CaptainStore`].
#[derive(Default)]
pub struct InMemoryCaptainStore {
    rows: Mutex<HashMap<DbId, Captain>>,
}

impl InMemoryCaptainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a captain record.
    pub async fn upsert(&self, captain: Captain) {
        self.rows.lock().await.insert(captain.id, captain);
    }
}

#[async_trait]
impl CaptainStore for InMemoryCaptainStore {
    async fn find_by_id(&self, id: DbId) -> Result<Option<Captain>, CoreError> {
        Ok(self.rows.lock().await.get(&id).cloned())
    }

    async fn find_within_radius(
        &self,
        center: Coordinates,
        radius_meters: f64,
        vehicle_type: VehicleType,
    ) -> Result<Vec<Captain>, CoreError> {
        let bbox = BoundingBox::around(center, radius_meters);
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .filter(|c| c.vehicle_type == vehicle_type)
            .filter(|c| {
                c.location.is_some_and(|loc| {
                    bbox.contains(loc) && loc.distance_meters(&center) <= radius_meters
                })
            })
            .cloned()
            .collect())
    }

    async fn update_location(&self, id: DbId, location: Coordinates) -> Result<bool, CoreError> {
        let mut rows = self.rows.lock().await;
        match rows.get_mut(&id) {
            Some(captain) => {
                captain.location = Some(location);
                captain.location_updated_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_connection(&self, id: DbId, connection_id: &str) -> Result<bool, CoreError> {
        let mut rows = self.rows.lock().await;
        match rows.get_mut(&id) {
            Some(captain) => {
                captain.connection_id = Some(connection_id.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_connection(&self, id: DbId, connection_id: &str) -> Result<bool, CoreError> {
        let mut rows = self.rows.lock().await;
        match rows.get_mut(&id) {
            Some(captain) if captain.connection_id.as_deref() == Some(connection_id) => {
                captain.connection_id = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
