use async_trait::async_trait;
use fleetx_core::{
    Booking, BookingRepository, BookingStatus, FleetDirectory, RepositoryError, RepositoryResult,
    UserAccount, UserDirectory, Vehicle, VehicleStatus,
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::app_config::FleetSeed;

/// Booking table held in process memory. `update_booking` is a true
/// compare-and-swap: the version check and the write happen under one write lock.
#[derive(Default)]
pub struct InMemoryBookingRepository {
    rows: RwLock<HashMap<Uuid, Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn select<F>(&self, predicate: F) -> Vec<Booking>
    where
        F: Fn(&Booking) -> bool,
    {
        let rows = self.rows.read().await;
        let mut selected: Vec<Booking> = rows.values().filter(|b| predicate(b)).cloned().collect();
        selected.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        selected
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert_booking(&self, booking: &Booking) -> RepositoryResult<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&booking.id) {
            return Err(RepositoryError::Duplicate(booking.id));
        }
        rows.insert(booking.id, booking.clone());
        debug!("Stored booking {}", booking.id);
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> RepositoryResult<Option<Booking>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn update_booking(
        &self,
        booking: &Booking,
        expected_version: u64,
    ) -> RepositoryResult<Booking> {
        let mut rows = self.rows.write().await;
        let stored = rows
            .get_mut(&booking.id)
            .ok_or(RepositoryError::Missing(booking.id))?;

        if stored.version != expected_version {
            return Err(RepositoryError::VersionConflict {
                id: booking.id,
                expected: expected_version,
                found: stored.version,
            });
        }

        let mut next = booking.clone();
        next.version = expected_version + 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn list_bookings(&self) -> RepositoryResult<Vec<Booking>> {
        Ok(self.select(|_| true).await)
    }

    async fn list_by_status(&self, status: BookingStatus) -> RepositoryResult<Vec<Booking>> {
        Ok(self.select(|b| b.status == status).await)
    }

    async fn list_by_customer(&self, customer_id: Uuid) -> RepositoryResult<Vec<Booking>> {
        Ok(self.select(|b| b.customer_id == customer_id).await)
    }

    async fn list_by_driver(&self, driver_id: Uuid) -> RepositoryResult<Vec<Booking>> {
        Ok(self.select(|b| b.served_by(driver_id)).await)
    }

    async fn list_confirmed_for_vehicle(&self, vehicle_id: Uuid) -> RepositoryResult<Vec<Booking>> {
        Ok(self
            .select(|b| {
                b.status == BookingStatus::Confirmed && b.assigned_vehicle_id() == Some(vehicle_id)
            })
            .await)
    }
}

/// Vehicles and user accounts owned by the fleet-management side
#[derive(Default)]
pub struct InMemoryFleet {
    vehicles: RwLock<BTreeMap<Uuid, Vehicle>>,
    users: RwLock<HashMap<Uuid, UserAccount>>,
}

impl InMemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(seed: &FleetSeed) -> Self {
        let vehicles = seed.vehicles.iter().map(|v| (v.id, v.clone())).collect();
        let users = seed.users.iter().map(|u| (u.id, u.clone())).collect();
        info!(
            "Seeded fleet with {} vehicle(s) and {} user(s)",
            seed.vehicles.len(),
            seed.users.len()
        );
        Self {
            vehicles: RwLock::new(vehicles),
            users: RwLock::new(users),
        }
    }

    pub async fn add_vehicle(&self, vehicle: Vehicle) {
        self.vehicles.write().await.insert(vehicle.id, vehicle);
    }

    pub async fn add_user(&self, user: UserAccount) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl FleetDirectory for InMemoryFleet {
    async fn get_vehicle(&self, id: Uuid) -> RepositoryResult<Option<Vehicle>> {
        Ok(self.vehicles.read().await.get(&id).cloned())
    }

    /// Ordered by vehicle id
    async fn list_vehicles(&self) -> RepositoryResult<Vec<Vehicle>> {
        Ok(self.vehicles.read().await.values().cloned().collect())
    }

    async fn vehicles_for_driver(&self, driver_id: Uuid) -> RepositoryResult<Vec<Vehicle>> {
        Ok(self
            .vehicles
            .read()
            .await
            .values()
            .filter(|v| v.assigned_driver_id == Some(driver_id))
            .cloned()
            .collect())
    }

    async fn set_vehicle_status(
        &self,
        vehicle_id: Uuid,
        status: VehicleStatus,
    ) -> RepositoryResult<()> {
        let mut vehicles = self.vehicles.write().await;
        let vehicle = vehicles
            .get_mut(&vehicle_id)
            .ok_or(RepositoryError::Missing(vehicle_id))?;
        vehicle.status = status;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryFleet {
    async fn get_user(&self, id: Uuid) -> RepositoryResult<Option<UserAccount>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}
