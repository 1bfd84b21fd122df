//! Captain (driver) records as seen by dispatch.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;
use crate::types::{DbId, Timestamp};
use crate::vehicle::VehicleType;

/// A captain account. Onboarding happens elsewhere; dispatch only reads
/// these and updates location and connection state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Captain {
    pub id: DbId,
    pub name: String,
    pub vehicle_type: VehicleType,
    /// Last reported position. `None` until the first location update.
    pub location: Option<Coordinates>,
    /// Connection id of the live push connection, `None` while offline.
    pub connection_id: Option<String>,
    pub location_updated_at: Option<Timestamp>,
}

impl Captain {
    pub fn is_online(&self) -> bool {
        self.connection_id.is_some()
    }

    pub fn summary(&self) -> CaptainSummary {
        CaptainSummary {
            id: self.id,
            name: self.name.clone(),
            vehicle_type: self.vehicle_type,
            location: self.location,
        }
    }
}

/// Public captain details shared with riders and listed as candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptainSummary {
    pub id: DbId,
    pub name: String,
    pub vehicle_type: VehicleType,
    pub location: Option<Coordinates>,
}
