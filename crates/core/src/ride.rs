//! Ride entity, status machine, creation input, and redacted views.
//!
//! [`Ride`] is the stored record and deliberately does not implement
//! `Serialize`: the OTP must only leave the process through
//! [`Ride::rider_view`], and only while the ride is `accepted`. Every
//! captain-facing payload goes through [`Ride::captain_view`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geo::Coordinates;
use crate::types::{DbId, Timestamp};
use crate::vehicle::VehicleType;

/// Minimum length of the pickup/destination labels after trimming.
pub const MIN_LABEL_LEN: usize = 3;

/// Maximum length of the pickup/destination labels.
pub const MAX_LABEL_LEN: usize = 500;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Ride lifecycle: `requested -> accepted -> ongoing -> completed`.
///
/// Transitions only move forward, one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Requested,
    Accepted,
    Ongoing,
    Completed,
}

impl RideStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Accepted => "accepted",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
        }
    }

    /// The only status this one may move to, if any.
    pub fn next(self) -> Option<RideStatus> {
        match self {
            Self::Requested => Some(Self::Accepted),
            Self::Accepted => Some(Self::Ongoing),
            Self::Ongoing => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Whether a ride in this status has an assigned captain.
    pub fn has_captain(self) -> bool {
        !matches!(self, Self::Requested)
    }

    /// Whether a ride in this status still holds its pickup OTP.
    pub fn holds_otp(self) -> bool {
        matches!(self, Self::Requested | Self::Accepted)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A stored ride.
#[derive(Clone, PartialEq)]
pub struct Ride {
    pub id: DbId,
    pub rider_id: DbId,
    pub captain_id: Option<DbId>,
    pub pickup: String,
    pub destination: String,
    pub pickup_coords: Coordinates,
    pub destination_coords: Coordinates,
    pub vehicle_type: VehicleType,
    pub status: RideStatus,
    pub fare: Option<f64>,
    pub distance_meters: Option<f64>,
    pub duration_seconds: Option<f64>,
    /// Empty once the ride has started.
    pub otp: String,
    pub otp_failed_attempts: i32,
    pub created_at: Timestamp,
    pub accepted_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl fmt::Debug for Ride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ride")
            .field("id", &self.id)
            .field("rider_id", &self.rider_id)
            .field("captain_id", &self.captain_id)
            .field("vehicle_type", &self.vehicle_type)
            .field("status", &self.status)
            .field("fare", &self.fare)
            .field("otp", &if self.otp.is_empty() { "" } else { "<redacted>" })
            .finish_non_exhaustive()
    }
}

impl Ride {
    /// View for captains and for any channel other than the owning rider.
    /// Never carries the OTP.
    pub fn captain_view(&self) -> RideView {
        self.view(None)
    }

    /// View for the rider who requested the ride.
    ///
    /// Carries the OTP only while the ride is `accepted`, which is when the
    /// rider needs it to hand to the arriving captain.
    pub fn rider_view(&self) -> RideView {
        let otp = (self.status == RideStatus::Accepted && !self.otp.is_empty())
            .then(|| self.otp.clone());
        self.view(otp)
    }

    fn view(&self, otp: Option<String>) -> RideView {
        RideView {
            id: self.id,
            rider_id: self.rider_id,
            captain_id: self.captain_id,
            pickup: self.pickup.clone(),
            destination: self.destination.clone(),
            pickup_coords: self.pickup_coords,
            destination_coords: self.destination_coords,
            vehicle_type: self.vehicle_type,
            status: self.status,
            fare: self.fare,
            distance_meters: self.distance_meters,
            duration_seconds: self.duration_seconds,
            otp,
            created_at: self.created_at,
            accepted_at: self.accepted_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }

    /// Whether the captain/OTP fields agree with the status.
    pub fn is_consistent(&self) -> bool {
        self.captain_id.is_some() == self.status.has_captain()
            && (!self.otp.is_empty()) == self.status.holds_otp()
    }
}

/// Serializable ride payload used in responses and pushed events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideView {
    pub id: DbId,
    pub rider_id: DbId,
    pub captain_id: Option<DbId>,
    pub pickup: String,
    pub destination: String,
    pub pickup_coords: Coordinates,
    pub destination_coords: Coordinates,
    pub vehicle_type: VehicleType,
    pub status: RideStatus,
    pub fare: Option<f64>,
    pub distance_meters: Option<f64>,
    pub duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
    pub created_at: Timestamp,
    pub accepted_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Rider-supplied request body for a new ride.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRideInput {
    pub pickup: String,
    pub destination: String,
    pub vehicle_type: String,
    pub pickup_coords: Coordinates,
    pub destination_coords: Coordinates,
}

/// A validated ride request, ready to be priced and inserted.
#[derive(Debug, Clone)]
pub struct RideRequest {
    pub rider_id: DbId,
    pub pickup: String,
    pub destination: String,
    pub vehicle_type: VehicleType,
    pub pickup_coords: Coordinates,
    pub destination_coords: Coordinates,
}

impl CreateRideInput {
    pub fn validate(&self, rider_id: DbId) -> Result<RideRequest, CoreError> {
        let pickup = validate_label(&self.pickup, "pickup")?;
        let destination = validate_label(&self.destination, "destination")?;
        let vehicle_type = self.vehicle_type.parse::<VehicleType>()?;
        self.pickup_coords.validate("pickupCoords")?;
        self.destination_coords.validate("destinationCoords")?;

        Ok(RideRequest {
            rider_id,
            pickup,
            destination,
            vehicle_type,
            pickup_coords: self.pickup_coords,
            destination_coords: self.destination_coords,
        })
    }
}

fn validate_label(value: &str, name: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < MIN_LABEL_LEN {
        return Err(CoreError::Validation(format!(
            "{name} must be at least {MIN_LABEL_LEN} characters"
        )));
    }
    if len > MAX_LABEL_LEN {
        return Err(CoreError::Validation(format!(
            "{name} must be at most {MAX_LABEL_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Everything the store needs to insert a ride in `requested`.
#[derive(Debug, Clone)]
pub struct NewRide {
    pub request: RideRequest,
    pub otp: String,
    pub fare: Option<f64>,
    pub distance_meters: Option<f64>,
    pub duration_seconds: Option<f64>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ride(status: RideStatus) -> Ride {
        let has_captain = status.has_captain();
        Ride {
            id: 1,
            rider_id: 10,
            captain_id: has_captain.then_some(20),
            pickup: "Connaught Place".into(),
            destination: "Rohini Sector 9".into(),
            pickup_coords: Coordinates::new(28.61, 77.20),
            destination_coords: Coordinates::new(28.70, 77.10),
            vehicle_type: VehicleType::Car,
            status,
            fare: Some(250.0),
            distance_meters: Some(14_000.0),
            duration_seconds: Some(1_800.0),
            otp: if status.holds_otp() { "123456".into() } else { String::new() },
            otp_failed_attempts: 0,
            created_at: chrono::Utc::now(),
            accepted_at: None,
            started_at: None,
            completed_at: None,
        }
    }

    fn input() -> CreateRideInput {
        CreateRideInput {
            pickup: "Connaught Place".into(),
            destination: "Rohini Sector 9".into(),
            vehicle_type: "Car".into(),
            pickup_coords: Coordinates::new(28.61, 77.20),
            destination_coords: Coordinates::new(28.70, 77.10),
        }
    }

    #[test]
    fn status_moves_forward_one_step() {
        assert_eq!(RideStatus::Requested.next(), Some(RideStatus::Accepted));
        assert_eq!(RideStatus::Accepted.next(), Some(RideStatus::Ongoing));
        assert_eq!(RideStatus::Ongoing.next(), Some(RideStatus::Completed));
        assert_eq!(RideStatus::Completed.next(), None);
    }

    #[test]
    fn captain_view_never_has_otp() {
        for status in [
            RideStatus::Requested,
            RideStatus::Accepted,
            RideStatus::Ongoing,
            RideStatus::Completed,
        ] {
            let json = serde_json::to_value(ride(status).captain_view()).unwrap();
            assert!(json.get("otp").is_none(), "{status}: {json}");
        }
    }

    #[test]
    fn rider_view_has_otp_only_when_accepted() {
        assert_eq!(
            ride(RideStatus::Accepted).rider_view().otp.as_deref(),
            Some("123456")
        );
        assert!(ride(RideStatus::Requested).rider_view().otp.is_none());
        assert!(ride(RideStatus::Ongoing).rider_view().otp.is_none());
        assert!(ride(RideStatus::Completed).rider_view().otp.is_none());
    }

    #[test]
    fn debug_output_redacts_otp() {
        let rendered = format!("{:?}", ride(RideStatus::Accepted));
        assert!(!rendered.contains("123456"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn view_uses_camel_case_keys() {
        let json = serde_json::to_value(ride(RideStatus::Accepted).captain_view()).unwrap();
        assert_eq!(json["vehicleType"], "Car");
        assert_eq!(json["status"], "accepted");
        assert_eq!(json["pickupCoords"]["lat"], 28.61);
        assert_eq!(json["captainId"], 20);
    }

    #[test]
    fn consistency_tracks_captain_and_otp() {
        assert!(ride(RideStatus::Requested).is_consistent());
        assert!(ride(RideStatus::Ongoing).is_consistent());

        let mut broken = ride(RideStatus::Requested);
        broken.captain_id = Some(99);
        assert!(!broken.is_consistent());

        let mut leaked = ride(RideStatus::Completed);
        leaked.otp = "654321".into();
        assert!(!leaked.is_consistent());
    }

    #[test]
    fn valid_input_passes() {
        let req = input().validate(7).unwrap();
        assert_eq!(req.rider_id, 7);
        assert_eq!(req.vehicle_type, VehicleType::Car);
    }

    #[test]
    fn short_labels_are_rejected() {
        let mut bad = input();
        bad.pickup = "  ab ".into();
        assert!(bad.validate(7).is_err());
    }

    #[test]
    fn unknown_vehicle_type_is_rejected() {
        let mut bad = input();
        bad.vehicle_type = "Helicopter".into();
        assert!(matches!(bad.validate(7), Err(CoreError::Validation(_))));
    }

    #[test]
    fn bad_coordinates_are_rejected() {
        let mut bad = input();
        bad.destination_coords = Coordinates::new(28.70, 200.0);
        let err = bad.validate(7).unwrap_err();
        assert!(err.to_string().contains("destinationCoords"));
    }

    #[test]
    fn input_deserializes_from_camel_case() {
        let json = serde_json::json!({
            "pickup": "Connaught Place",
            "destination": "Rohini",
            "vehicleType": "Auto",
            "pickupCoords": { "lat": 28.61, "lng": 77.20 },
            "destinationCoords": { "lat": 28.70, "lng": 77.10 }
        });
        let parsed: CreateRideInput = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.vehicle_type, "Auto");
    }
}
