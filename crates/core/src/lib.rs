//! Domain types and rules for ride dispatch: rides and their state
//! machine, captains, geography, fares, OTPs, and the storage seams the
//! engine is written against.

pub mod captain;
pub mod error;
pub mod fare;
pub mod geo;
pub mod geo_index;
pub mod memory;
pub mod otp;
pub mod ride;
pub mod routing;
pub mod store;
pub mod types;
pub mod vehicle;
