//! Status enums mapping to SMALLINT lookup tables.
//!
//! Each variant's discriminant matches the seed row in the corresponding
//! `*_statuses` table.

use rideflow_core::ride::RideStatus;

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by its database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Row values of `ride_statuses`.
    RideStatusCode {
        Requested = 1,
        Accepted = 2,
        Ongoing = 3,
        Completed = 4,
    }
}

impl From<RideStatus> for RideStatusCode {
    fn from(status: RideStatus) -> Self {
        match status {
            RideStatus::Requested => Self::Requested,
            RideStatus::Accepted => Self::Accepted,
            RideStatus::Ongoing => Self::Ongoing,
            RideStatus::Completed => Self::Completed,
        }
    }
}

impl From<RideStatusCode> for RideStatus {
    fn from(code: RideStatusCode) -> Self {
        match code {
            RideStatusCode::Requested => Self::Requested,
            RideStatusCode::Accepted => Self::Accepted,
            RideStatusCode::Ongoing => Self::Ongoing,
            RideStatusCode::Completed => Self::Completed,
        }
    }
}
