//! One-time pickup codes.

use rand::Rng;

/// Number of digits in a pickup OTP.
pub const OTP_LENGTH: usize = 6;

/// Generate a fresh zero-padded 6-digit code.
pub fn generate_otp() -> String {
    let value: u32 = rand::rng().random_range(0..1_000_000);
    format!("{value:0width$}", width = OTP_LENGTH)
}

/// Exact comparison after trimming surrounding whitespace from the
/// supplied code. An empty stored code never matches.
pub fn otp_matches(stored: &str, supplied: &str) -> bool {
    !stored.is_empty() && stored == supplied.trim()
}
