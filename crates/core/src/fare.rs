//! Fare estimation: constants, rate table, and pure pricing logic.
//!
//! `fare = base + per_km * km + per_minute * minutes`, rounded to the
//! nearest whole currency unit. Rates are configuration; the defaults below
//! are used when nothing overrides them.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::CoreError;
use crate::geo::METERS_PER_KM;
use crate::vehicle::VehicleType;

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Seconds per minute (60.0).
pub const SECS_PER_MINUTE: f64 = 60.0;

// ---------------------------------------------------------------------------
// Rates
// ---------------------------------------------------------------------------

/// Pricing parameters for a single vehicle class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FareRate {
    pub base_fare: f64,
    pub per_km: f64,
    pub per_minute: f64,
}

impl FareRate {
    pub const fn new(base_fare: f64, per_km: f64, per_minute: f64) -> Self {
        Self {
            base_fare,
            per_km,
            per_minute,
        }
    }

    fn validate(&self, vehicle_type: VehicleType) -> Result<(), CoreError> {
        for (name, value) in [
            ("base_fare", self.base_fare),
            ("per_km", self.per_km),
            ("per_minute", self.per_minute),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::Validation(format!(
                    "{vehicle_type} {name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

pub const DEFAULT_AUTO_RATE: FareRate = FareRate::new(30.0, 10.0, 2.0);
pub const DEFAULT_CAR_RATE: FareRate = FareRate::new(50.0, 15.0, 3.0);
pub const DEFAULT_MOTORCYCLE_RATE: FareRate = FareRate::new(20.0, 8.0, 1.5);

/// Rate table keyed by vehicle class. Always holds a rate for every class.
#[derive(Debug, Clone)]
pub struct FareTable {
    rates: HashMap<VehicleType, FareRate>,
}

impl FareTable {
    /// Build a table from one rate per class, rejecting negative rates.
    pub fn new(auto: FareRate, car: FareRate, motorcycle: FareRate) -> Result<Self, CoreError> {
        let rates = HashMap::from([
            (VehicleType::Auto, auto),
            (VehicleType::Car, car),
            (VehicleType::Motorcycle, motorcycle),
        ]);
        for (vt, rate) in &rates {
            rate.validate(*vt)?;
        }
        Ok(Self { rates })
    }

    pub fn rate(&self, vehicle_type: VehicleType) -> FareRate {
        self.rates
            .get(&vehicle_type)
            .copied()
            .unwrap_or(DEFAULT_CAR_RATE)
    }

    /// Price a trip for one vehicle class.
    ///
    /// Negative or non-finite distance/duration count as zero.
    pub fn estimate(
        &self,
        distance_meters: f64,
        duration_seconds: f64,
        vehicle_type: VehicleType,
    ) -> f64 {
        let rate = self.rate(vehicle_type);
        let km = sanitize(distance_meters) / METERS_PER_KM;
        let minutes = sanitize(duration_seconds) / SECS_PER_MINUTE;
        (rate.base_fare + rate.per_km * km + rate.per_minute * minutes).round()
    }

    /// Price a trip for every vehicle class.
    pub fn quote(&self, distance_meters: f64, duration_seconds: f64) -> FareQuote {
        let fares = VehicleType::ALL
            .into_iter()
            .map(|vt| (vt, self.estimate(distance_meters, duration_seconds, vt)))
            .collect();
        FareQuote {
            distance_meters,
            duration_seconds,
            fares,
        }
    }
}

impl Default for FareTable {
    fn default() -> Self {
        Self {
            rates: HashMap::from([
                (VehicleType::Auto, DEFAULT_AUTO_RATE),
                (VehicleType::Car, DEFAULT_CAR_RATE),
                (VehicleType::Motorcycle, DEFAULT_MOTORCYCLE_RATE),
            ]),
        }
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Fares for every vehicle class for one route.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FareQuote {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub fares: HashMap<VehicleType, f64>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
