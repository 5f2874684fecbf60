use fleetx_core::{Booking, BookingRepository, BookingStatus, RepositoryResult, TimeWindow};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Decides whether a vehicle is free over a window.
///
/// Only CONFIRMED bookings occupy a vehicle. PENDING, CANCELLED, REJECTED and
/// COMPLETED bookings never block, even if the store hands them back.
#[derive(Clone)]
pub struct AvailabilityResolver {
    bookings: Arc<dyn BookingRepository>,
}

impl AvailabilityResolver {
    pub fn new(bookings: Arc<dyn BookingRepository>) -> Self {
        Self { bookings }
    }

    /// True if a CONFIRMED booking on `vehicle_id` overlaps `window`
    pub async fn has_conflict(&self, vehicle_id: Uuid, window: &TimeWindow) -> RepositoryResult<bool> {
        Ok(!self.conflicting_bookings(vehicle_id, window, None).await?.is_empty())
    }

    pub async fn is_available(&self, vehicle_id: Uuid, window: &TimeWindow) -> RepositoryResult<bool> {
        Ok(!self.has_conflict(vehicle_id, window).await?)
    }

    /// CONFIRMED bookings on `vehicle_id` overlapping `window`, skipping `exclude`
    pub async fn conflicting_bookings(
        &self,
        vehicle_id: Uuid,
        window: &TimeWindow,
        exclude: Option<Uuid>,
    ) -> RepositoryResult<Vec<Booking>> {
        let confirmed = self.bookings.list_confirmed_for_vehicle(vehicle_id).await?;

        let conflicts: Vec<Booking> = confirmed
            .into_iter()
            .filter(|b| b.status == BookingStatus::Confirmed)
            .filter(|b| b.assigned_vehicle_id() == Some(vehicle_id))
            .filter(|b| Some(b.id) != exclude)
            .filter(|b| b.window.overlaps(window))
            .collect();

        if !conflicts.is_empty() {
            debug!(
                "Vehicle {} has {} confirmed booking(s) overlapping {} - {}",
                vehicle_id,
                conflicts.len(),
                window.start(),
                window.end()
            );
        }

        Ok(conflicts)
    }
}
