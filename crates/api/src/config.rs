use std::str::FromStr;
use std::time::Duration;

use rideflow_core::fare::{
    FareRate, FareTable, DEFAULT_AUTO_RATE, DEFAULT_CAR_RATE, DEFAULT_MOTORCYCLE_RATE,
};
use rideflow_core::geo_index::DEFAULT_SEARCH_RADIUS_METERS;
use rideflow_maps::DEFAULT_BASE_URL;

use crate::auth::jwt::JwtConfig;

/// Default failed-OTP budget per ride.
pub const DEFAULT_MAX_OTP_ATTEMPTS: i32 = 5;

/// Default bound on routing/geocoding calls, in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    /// Postgres URL. `None` runs on the in-memory stores.
    pub database_url: Option<String>,
    pub dispatch: DispatchConfig,
    pub maps: MapsConfig,
    pub fares: FareTable,
}

/// Ride engine tuning.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Candidate search radius for new rides.
    pub radius_meters: f64,
    /// Failed OTP attempts allowed before start is locked.
    pub max_otp_attempts: i32,
    /// Bound on every routing provider call.
    pub upstream_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            radius_meters: DEFAULT_SEARCH_RADIUS_METERS,
            max_otp_attempts: DEFAULT_MAX_OTP_ATTEMPTS,
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }
}

/// Geoapify settings. Without an API key, routes fall back to a
/// straight-line estimate and place search is unavailable.
#[derive(Debug, Clone)]
pub struct MapsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                       |
    /// |-----------------------------|-------------------------------|
    /// | `HOST`                      | `0.0.0.0`                     |
    /// | `PORT`                      | `3000`                        |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`       |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                          |
    /// | `DATABASE_URL`              | unset (in-memory stores)      |
    /// | `DISPATCH_RADIUS_METERS`    | `7000`                        |
    /// | `MAX_OTP_ATTEMPTS`          | `5`                           |
    /// | `UPSTREAM_TIMEOUT_SECS`     | `10`                          |
    /// | `GEOAPIFY_API_KEY`          | unset                         |
    /// | `GEOAPIFY_BASE_URL`         | `https://api.geoapify.com/v1` |
    /// | `FARE_<CLASS>_BASE`         | per class                     |
    /// | `FARE_<CLASS>_PER_KM`       | per class                     |
    /// | `FARE_<CLASS>_PER_MIN`      | per class                     |
    ///
    /// `<CLASS>` is `AUTO`, `CAR` or `MOTORCYCLE`.
    ///
    /// # Panics
    ///
    /// Panics on any unparseable value so misconfiguration fails at
    /// startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 30);
        let jwt = JwtConfig::from_env();
        let database_url = non_empty_var("DATABASE_URL");

        let radius_meters: f64 = env_or("DISPATCH_RADIUS_METERS", DEFAULT_SEARCH_RADIUS_METERS);
        assert!(
            radius_meters.is_finite() && radius_meters > 0.0,
            "DISPATCH_RADIUS_METERS must be positive"
        );
        let max_otp_attempts: i32 = env_or("MAX_OTP_ATTEMPTS", DEFAULT_MAX_OTP_ATTEMPTS);
        assert!(max_otp_attempts > 0, "MAX_OTP_ATTEMPTS must be positive");
        let upstream_timeout =
            Duration::from_secs(env_or("UPSTREAM_TIMEOUT_SECS", DEFAULT_UPSTREAM_TIMEOUT_SECS));

        let maps = MapsConfig {
            api_key: non_empty_var("GEOAPIFY_API_KEY"),
            base_url: std::env::var("GEOAPIFY_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.into()),
        };

        let fares = FareTable::new(
            fare_rate_from_env("AUTO", DEFAULT_AUTO_RATE),
            fare_rate_from_env("CAR", DEFAULT_CAR_RATE),
            fare_rate_from_env("MOTORCYCLE", DEFAULT_MOTORCYCLE_RATE),
        )
        .unwrap_or_else(|e| panic!("Invalid fare configuration: {e}"));

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            database_url,
            dispatch: DispatchConfig {
                radius_meters,
                max_otp_attempts,
                upstream_timeout,
            },
            maps,
            fares,
        }
    }
}

fn fare_rate_from_env(class: &str, default: FareRate) -> FareRate {
    FareRate::new(
        env_or(&format!("FARE_{class}_BASE"), default.base_fare),
        env_or(&format!("FARE_{class}_PER_KM"), default.per_km),
        env_or(&format!("FARE_{class}_PER_MIN"), default.per_minute),
    )
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse `name` if set, otherwise return `default`. Panics on a bad value.
fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} is invalid ({raw:?}): {e}")),
        Err(_) => default,
    }
}
