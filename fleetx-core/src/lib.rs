pub mod booking;
pub mod clock;
pub mod notify;
pub mod repository;
pub mod vehicle;
pub mod window;

pub use booking::{
    Assignment, Booking, BookingRequest, BookingStatus, DriverRejection, RejectedBy, Rejection,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use notify::{BookingEvent, PublishError, Publisher};
pub use repository::{
    BookingRepository, FleetDirectory, RepositoryError, RepositoryResult, UserDirectory,
};
pub use vehicle::{Role, UserAccount, Vehicle, VehicleStatus};
pub use window::TimeWindow;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
