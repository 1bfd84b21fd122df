pub mod captain;
pub mod ride;
pub mod ride_event;
pub mod status;
