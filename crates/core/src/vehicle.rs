//! Vehicle classes a ride can request and a captain can drive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Vehicle class. Serialized with the capitalised names clients send
/// (`"Auto"`, `"Car"`, `"Motorcycle"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    Auto,
    Car,
    Motorcycle,
}

impl VehicleType {
    /// Every vehicle class, in display order.
    pub const ALL: [VehicleType; 3] = [Self::Auto, Self::Car, Self::Motorcycle];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Car => "Car",
            Self::Motorcycle => "Motorcycle",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Auto" => Ok(Self::Auto),
            "Car" => Ok(Self::Car),
            "Motorcycle" => Ok(Self::Motorcycle),
            other => Err(CoreError::Validation(format!(
                "Invalid vehicle type '{other}'. Must be one of: Auto, Car, Motorcycle"
            ))),
        }
    }
}
