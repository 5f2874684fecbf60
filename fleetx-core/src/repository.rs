use async_trait::async_trait;
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};
use crate::vehicle::{UserAccount, Vehicle, VehicleStatus};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Record already exists: {0}")]
    Duplicate(Uuid),

    #[error("Record not found: {0}")]
    Missing(Uuid),

    #[error("Version conflict on {id}: expected {expected}, found {found}")]
    VersionConflict { id: Uuid, expected: u64, found: u64 },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository trait for booking records
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert_booking(&self, booking: &Booking) -> RepositoryResult<()>;

    async fn get_booking(&self, id: Uuid) -> RepositoryResult<Option<Booking>>;

    /// Compare-and-swap on `version`. Succeeds only if the stored version equals
    /// `expected_version`; returns the stored copy with its version bumped.
    async fn update_booking(
        &self,
        booking: &Booking,
        expected_version: u64,
    ) -> RepositoryResult<Booking>;

    async fn list_bookings(&self) -> RepositoryResult<Vec<Booking>>;

    async fn list_by_status(&self, status: BookingStatus) -> RepositoryResult<Vec<Booking>>;

    async fn list_by_customer(&self, customer_id: Uuid) -> RepositoryResult<Vec<Booking>>;

    /// Bookings a driver holds or held
    async fn list_by_driver(&self, driver_id: Uuid) -> RepositoryResult<Vec<Booking>>;

    /// CONFIRMED bookings assigned to the vehicle, and nothing else
    async fn list_confirmed_for_vehicle(&self, vehicle_id: Uuid) -> RepositoryResult<Vec<Booking>>;
}

/// Narrow read/write view of the fleet-management collaborator
#[async_trait]
pub trait FleetDirectory: Send + Sync {
    async fn get_vehicle(&self, id: Uuid) -> RepositoryResult<Option<Vehicle>>;

    async fn list_vehicles(&self) -> RepositoryResult<Vec<Vehicle>>;

    async fn vehicles_for_driver(&self, driver_id: Uuid) -> RepositoryResult<Vec<Vehicle>>;

    async fn set_vehicle_status(
        &self,
        vehicle_id: Uuid,
        status: VehicleStatus,
    ) -> RepositoryResult<()>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: Uuid) -> RepositoryResult<Option<UserAccount>>;
}
