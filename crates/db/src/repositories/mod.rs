//! Zero-sized repositories over `&PgPool`.

pub mod captain_repo;
pub mod ride_event_repo;
pub mod ride_repo;

pub use captain_repo::CaptainRepo;
pub use ride_event_repo::RideEventRepo;
pub use ride_repo::RideRepo;
