use async_trait::async_trait;
use fleetx_shared::EventEnvelope;

use crate::booking::Booking;

/// A lifecycle event carrying the full booking snapshot
pub type BookingEvent = EventEnvelope<Booking>;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Event encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Publish to {topic} failed: {reason}")]
    Transport { topic: String, reason: String },
}

/// Outbound channel for lifecycle events. The engine only ever publishes
/// after the corresponding transition has committed.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, event: &BookingEvent) -> Result<(), PublishError>;
}
