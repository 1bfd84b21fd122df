//! Durable ride event persistence.
//!
//! [`EventPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and writes every [`RideEvent`] to `ride_events`. It runs as a background
//! task and exits when the bus is dropped.

use rideflow_core::types::DbId;
use rideflow_db::repositories::RideEventRepo;
use rideflow_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::RideEvent;

pub struct EventPersistence;

impl EventPersistence {
    /// Run the persistence loop until the channel closes.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<RideEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = Self::persist(&pool, &event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            ride_id = event.ride_id,
                            "Failed to persist ride event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Event persistence lagged, some ride events were not persisted"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, persistence shutting down");
                    break;
                }
            }
        }
    }

    async fn persist(pool: &DbPool, event: &RideEvent) -> Result<DbId, sqlx::Error> {
        RideEventRepo::insert(
            pool,
            event.ride_id,
            &event.event_type,
            event.actor.map(|a| a.kind.as_str()),
            event.actor.map(|a| a.id),
            &event.payload,
        )
        .await
    }
}
