pub mod models;
pub mod pii;

pub use models::events::{BookingAction, EventEnvelope, Topic};
pub use pii::Masked;
