use fleetx_core::BookingEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

/// Logs every lifecycle event seen on the in-process bus until it closes
pub async fn log_events(mut events: broadcast::Receiver<BookingEvent>) {
    info!("Event log listening on the in-process bus");

    loop {
        match events.recv().await {
            Ok(event) => info!(
                "[{}] {} booking {} is {}",
                event.topic, event.action, event.payload.id, event.payload.status
            ),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event log fell behind, skipped {} event(s)", skipped)
            }
            Err(RecvError::Closed) => {
                info!("Event bus closed");
                break;
            }
        }
    }
}
