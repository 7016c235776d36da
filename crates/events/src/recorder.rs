//! [`EventRecorder`] that publishes onto the [`EventBus`].

use std::sync::Arc;

use async_trait::async_trait;
use pullup_core::store::{EventRecorder, RecordError};
use pullup_core::types::DbId;

use crate::bus::{EventBus, SessionEvent};

#[derive(Clone)]
pub struct BusEventRecorder {
    bus: Arc<EventBus>,
}

impl BusEventRecorder {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl EventRecorder for BusEventRecorder {
    /// Fails when nothing is subscribed, since the event would be lost.
    async fn append(
        &self,
        user_id: DbId,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), RecordError> {
        let delivered = self
            .bus
            .publish(SessionEvent::new(user_id, event_type, payload));
        if delivered == 0 {
            return Err(RecordError(format!(
                "no subscribers on the event bus; {event_type} dropped"
            )));
        }
        Ok(())
    }
}
