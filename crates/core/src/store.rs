//! Storage seams for rides and captains.
//!
//! The lifecycle engine only talks to these traits. Every status change goes
//! through [`RideStore::apply_transition`], which must check the
//! transition's preconditions and write the new state as one atomic unit
//! (a conditional `UPDATE` in Postgres, a single critical section in the
//! in-memory store). Two callers racing on the same ride can therefore never
//! both observe success.

use async_trait::async_trait;

use crate::captain::Captain;
use crate::error::CoreError;
use crate::geo::Coordinates;
use crate::ride::{NewRide, Ride, RideStatus};
use crate::types::DbId;
use crate::vehicle::VehicleType;

/// A single forward step of the ride state machine, with the facts the
/// store must match before applying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RideTransition {
    /// `requested -> accepted`; sets the captain.
    Accept { captain_id: DbId },
    /// `accepted -> ongoing`; requires the assigned captain, the exact
    /// stored OTP and fewer than `max_failed_attempts` wrong guesses so far.
    /// Clears the OTP.
    Start {
        captain_id: DbId,
        otp: String,
        max_failed_attempts: i32,
    },
    /// `ongoing -> completed`; requires the assigned captain.
    Complete { captain_id: DbId },
}

impl RideTransition {
    pub fn from_status(&self) -> RideStatus {
        match self {
            Self::Accept { .. } => RideStatus::Requested,
            Self::Start { .. } => RideStatus::Accepted,
            Self::Complete { .. } => RideStatus::Ongoing,
        }
    }

    pub fn to_status(&self) -> RideStatus {
        match self {
            Self::Accept { .. } => RideStatus::Accepted,
            Self::Start { .. } => RideStatus::Ongoing,
            Self::Complete { .. } => RideStatus::Completed,
        }
    }

    pub fn captain_id(&self) -> DbId {
        match self {
            Self::Accept { captain_id }
            | Self::Start { captain_id, .. }
            | Self::Complete { captain_id } => *captain_id,
        }
    }

    /// Whether `ride` currently satisfies every precondition.
    pub fn is_applicable_to(&self, ride: &Ride) -> bool {
        if ride.status != self.from_status() {
            return false;
        }
        match self {
            Self::Accept { .. } => ride.captain_id.is_none(),
            Self::Start {
                captain_id,
                otp,
                max_failed_attempts,
            } => {
                ride.captain_id == Some(*captain_id)
                    && ride.otp_failed_attempts < *max_failed_attempts
                    && !ride.otp.is_empty()
                    && ride.otp == *otp
            }
            Self::Complete { captain_id } => ride.captain_id == Some(*captain_id),
        }
    }
}

#[async_trait]
pub trait RideStore: Send + Sync {
    /// Insert a new ride in `requested`.
    async fn insert(&self, ride: NewRide) -> Result<Ride, CoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<Ride>, CoreError>;

    /// Atomically apply `transition` if its preconditions hold.
    ///
    /// Returns the updated ride, or `None` when the ride is missing or any
    /// precondition failed. Never partially applies.
    async fn apply_transition(
        &self,
        ride_id: DbId,
        transition: &RideTransition,
    ) -> Result<Option<Ride>, CoreError>;

    /// Atomically bump the failed-OTP counter of an `accepted` ride whose
    /// count is still below `max_attempts`.
    ///
    /// Returns the new count, or `None` if the ride is no longer `accepted`
    /// or the counter already reached `max_attempts`.
    async fn record_failed_otp(
        &self,
        ride_id: DbId,
        max_attempts: i32,
    ) -> Result<Option<i32>, CoreError>;
}

#[async_trait]
pub trait CaptainStore: Send + Sync {
    async fn find_by_id(&self, id: DbId) -> Result<Option<Captain>, CoreError>;

    /// Captains of `vehicle_type` with a known location within
    /// `radius_meters` of `center`.
    ///
    /// Implementations may return a superset (e.g. a bounding-box match);
    /// [`GeoIndex`](crate::geo_index::GeoIndex) applies the exact distance
    /// check.
    async fn find_within_radius(
        &self,
        center: Coordinates,
        radius_meters: f64,
        vehicle_type: VehicleType,
    ) -> Result<Vec<Captain>, CoreError>;

    /// Returns `false` if the captain does not exist.
    async fn update_location(&self, id: DbId, location: Coordinates) -> Result<bool, CoreError>;

    /// Record the captain's live connection id. Returns `false` if the
    /// captain does not exist.
    async fn set_connection(&self, id: DbId, connection_id: &str) -> Result<bool, CoreError>;

    /// Clear the connection id, but only if it still equals
    /// `connection_id`. Returns whether anything was cleared.
    async fn clear_connection(&self, id: DbId, connection_id: &str) -> Result<bool, CoreError>;
}
