use crate::ride::RideStatus;
use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The ride is not in the status the operation requires.
    #[error("Ride {ride_id} is {actual}, expected {expected}")]
    InvalidState {
        ride_id: DbId,
        expected: RideStatus,
        actual: RideStatus,
    },

    /// Another captain already confirmed the ride. Final; do not retry.
    #[error("Ride {ride_id} has already been confirmed")]
    AlreadyConfirmed { ride_id: DbId },

    #[error("Invalid OTP for ride {ride_id}")]
    InvalidOtp { ride_id: DbId },

    #[error("Too many OTP attempts for ride {ride_id}")]
    TooManyOtpAttempts { ride_id: DbId },

    /// Routing or geocoding provider failure, timeout, or malformed payload.
    #[error("Upstream provider error: {0}")]
    Upstream(String),

    /// Backing store failure.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
