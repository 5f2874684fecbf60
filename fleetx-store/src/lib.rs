pub mod app_config;
pub mod events;
pub mod memory;

pub use events::{BroadcastPublisher, FanoutPublisher, RecordingPublisher};
#[cfg(feature = "kafka")]
pub use events::EventProducer;
pub use memory::{InMemoryBookingRepository, InMemoryFleet};
