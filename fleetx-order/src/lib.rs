pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod locks;
pub mod queries;

pub use dispatcher::{Collaborators, DispatchCoordinator};
pub use error::DispatchError;
pub use lifecycle::TransitionError;
pub use locks::KeyedLocks;
pub use queries::BookingStatistics;
