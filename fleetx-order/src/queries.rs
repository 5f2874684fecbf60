use fleetx_core::{Booking, BookingStatus, Role};
use fleetx_store::app_config::DriverRejectionPolicy;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dispatcher::DispatchCoordinator;
use crate::error::DispatchError;

/// Booking counts per status, for the manager dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookingStatistics {
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub rejected: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl BookingStatistics {
    pub fn tally<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> Self {
        let mut stats = Self::default();
        for booking in bookings {
            stats.total += 1;
            match booking.status {
                BookingStatus::Pending => stats.pending += 1,
                BookingStatus::Confirmed => stats.confirmed += 1,
                BookingStatus::Rejected => stats.rejected += 1,
                BookingStatus::Completed => stats.completed += 1,
                BookingStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}

// Read paths. None of these take locks or change state.
impl DispatchCoordinator {
    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, DispatchError> {
        self.inner.load(booking_id).await
    }

    /// PENDING bookings the driver could take: their vehicle's class, not
    /// vetoed by a manager, nobody assigned yet
    pub async fn list_pending_for_driver(&self, driver_id: Uuid) -> Result<Vec<Booking>, DispatchError> {
        let inner = &self.inner;
        inner.require_role(driver_id, "driver", &[Role::Driver]).await?;

        let vehicles = inner.fleet.vehicles_for_driver(driver_id).await?;
        let vehicle = match vehicles.as_slice() {
            [vehicle] => vehicle,
            [] => {
                debug!("Driver {} has no vehicle, nothing to offer", driver_id);
                return Ok(Vec::new());
            }
            many => {
                warn!(
                    "Driver {} is assigned {} vehicles, not offering bookings",
                    driver_id,
                    many.len()
                );
                return Ok(Vec::new());
            }
        };

        let exclude_declined = inner.policy == DriverRejectionPolicy::Exclude;
        let pending = inner.bookings.list_by_status(BookingStatus::Pending).await?;
        Ok(pending
            .into_iter()
            .filter(|b| b.matches_class(&vehicle.vehicle_class))
            .filter(|b| !b.is_manager_rejected())
            .filter(|b| b.assignment.is_none())
            .filter(|b| !(exclude_declined && b.was_declined_by(driver_id)))
            .collect())
    }

    pub async fn list_bookings_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<Booking>, DispatchError> {
        Ok(self.inner.bookings.list_by_customer(customer_id).await?)
    }

    pub async fn list_all_bookings(&self) -> Result<Vec<Booking>, DispatchError> {
        Ok(self.inner.bookings.list_bookings().await?)
    }

    pub async fn list_bookings_by_status(
        &self,
        status: BookingStatus,
    ) -> Result<Vec<Booking>, DispatchError> {
        Ok(self.inner.bookings.list_by_status(status).await?)
    }

    /// Status given as text, any case. Unknown names are a validation error.
    pub async fn list_bookings_by_status_name(
        &self,
        status: &str,
    ) -> Result<Vec<Booking>, DispatchError> {
        let status: BookingStatus = status.parse()?;
        self.list_bookings_by_status(status).await
    }

    /// Everything the driver holds or has held
    pub async fn list_bookings_for_driver(&self, driver_id: Uuid) -> Result<Vec<Booking>, DispatchError> {
        self.inner
            .require_role(driver_id, "driver", &[Role::Driver])
            .await?;
        Ok(self.inner.bookings.list_by_driver(driver_id).await?)
    }

    pub async fn list_confirmed_for_driver(
        &self,
        driver_id: Uuid,
    ) -> Result<Vec<Booking>, DispatchError> {
        let held = self.list_bookings_for_driver(driver_id).await?;
        Ok(held
            .into_iter()
            .filter(|b| b.status == BookingStatus::Confirmed)
            .filter(|b| b.assigned_driver_id() == Some(driver_id))
            .collect())
    }

    pub async fn list_confirmed_for_vehicle(
        &self,
        vehicle_id: Uuid,
    ) -> Result<Vec<Booking>, DispatchError> {
        Ok(self.inner.bookings.list_confirmed_for_vehicle(vehicle_id).await?)
    }

    pub async fn statistics(&self) -> Result<BookingStatistics, DispatchError> {
        let all = self.inner.bookings.list_bookings().await?;
        Ok(BookingStatistics::tally(&all))
    }
}
