//! Durable event persistence service.
//!
//! [`EventPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and writes every received [`SessionEvent`] to the `session_events` table.
//! It runs as a long-lived background task and exits when the bus is dropped.

use pullup_core::types::DbId;
use pullup_db::repositories::SessionEventRepo;
use pullup_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::SessionEvent;

/// Background service that persists session events to the database.
pub struct EventPersistence;

impl EventPersistence {
    /// Run the persistence loop until the channel closes.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<SessionEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = Self::persist(&pool, &event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            user_id = event.user_id,
                            "Failed to persist event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Event persistence lagged, some events were not persisted"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, persistence shutting down");
                    break;
                }
            }
        }
    }

    async fn persist(pool: &DbPool, event: &SessionEvent) -> Result<DbId, sqlx::Error> {
        SessionEventRepo::insert(
            pool,
            event.user_id,
            event.session_id,
            &event.event_type,
            &event.payload,
        )
        .await
    }
}
