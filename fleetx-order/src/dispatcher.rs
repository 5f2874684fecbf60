use fleetx_catalog::{AvailabilityResolver, PricingEngine};
use fleetx_core::{
    Booking, BookingRepository, BookingRequest, Clock, FleetDirectory, Publisher, Role,
    TimeWindow, UserAccount, UserDirectory, Vehicle, VehicleStatus,
};
use fleetx_shared::{BookingAction, EventEnvelope, Topic};
use fleetx_store::app_config::{DispatchConfig, DriverRejectionPolicy};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::DispatchError;
use crate::lifecycle;
use crate::locks::KeyedLocks;

/// Everything the coordinator reads from, writes to, or publishes on
#[derive(Clone)]
pub struct Collaborators {
    pub bookings: Arc<dyn BookingRepository>,
    pub fleet: Arc<dyn FleetDirectory>,
    pub users: Arc<dyn UserDirectory>,
    pub publisher: Arc<dyn Publisher>,
    pub clock: Arc<dyn Clock>,
}

/// The only writer of booking status.
///
/// Every status change on a booking runs under that booking's lock, so the
/// precondition check and the write are one step. Accepting, cancelling and
/// completing also hold the vehicle's lock (always taken after the booking's),
/// which keeps two overlapping confirmations off the same vehicle. The locked
/// section runs on its own task: a caller that gives up waiting cannot cut a
/// transition in half. Events go out only after the write has committed.
#[derive(Clone)]
pub struct DispatchCoordinator {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) bookings: Arc<dyn BookingRepository>,
    pub(crate) fleet: Arc<dyn FleetDirectory>,
    pub(crate) users: Arc<dyn UserDirectory>,
    pub(crate) publisher: Arc<dyn Publisher>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) pricing: PricingEngine,
    pub(crate) availability: AvailabilityResolver,
    pub(crate) policy: DriverRejectionPolicy,
    booking_locks: KeyedLocks<Uuid>,
    vehicle_locks: KeyedLocks<Uuid>,
}

impl DispatchCoordinator {
    pub fn new(collaborators: Collaborators, pricing: PricingEngine, config: &DispatchConfig) -> Self {
        let availability = AvailabilityResolver::new(Arc::clone(&collaborators.bookings));
        Self {
            inner: Arc::new(Inner {
                bookings: collaborators.bookings,
                fleet: collaborators.fleet,
                users: collaborators.users,
                publisher: collaborators.publisher,
                clock: collaborators.clock,
                pricing,
                availability,
                policy: config.driver_rejection_policy,
                booking_locks: KeyedLocks::new(),
                vehicle_locks: KeyedLocks::new(),
            }),
        }
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.inner.pricing
    }

    pub fn availability(&self) -> &AvailabilityResolver {
        &self.inner.availability
    }

    /// CreateBooking: validate, price, persist PENDING, then announce to the
    /// class's driver pool and to managers
    pub async fn create_booking(&self, request: BookingRequest) -> Result<Booking, DispatchError> {
        let window = lifecycle::validate(&request)?;
        self.run(move |inner| async move { inner.create(request, window).await })
            .await
    }

    /// CancelBooking: owner only, from PENDING or CONFIRMED
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Booking, DispatchError> {
        self.run(move |inner| async move { inner.cancel(booking_id, customer_id).await })
            .await
    }

    /// ManagerReject: PENDING -> REJECTED, permanently vetoing acceptance.
    /// Repeating it on a manager-rejected booking returns the booking unchanged.
    pub async fn manager_reject(
        &self,
        booking_id: Uuid,
        manager_id: Uuid,
        reason: impl Into<String>,
    ) -> Result<Booking, DispatchError> {
        let reason = reason.into();
        self.run(move |inner| async move { inner.manager_reject(booking_id, manager_id, reason).await })
            .await
    }

    /// DriverAccept: the race-safe PENDING -> CONFIRMED step
    pub async fn driver_accept(
        &self,
        booking_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Booking, DispatchError> {
        self.run(move |inner| async move { inner.driver_accept(booking_id, driver_id).await })
            .await
    }

    /// DriverReject: records the refusal, status stays PENDING
    pub async fn driver_reject(
        &self,
        booking_id: Uuid,
        driver_id: Uuid,
        reason: impl Into<String>,
    ) -> Result<Booking, DispatchError> {
        let reason = reason.into();
        self.run(move |inner| async move { inner.driver_reject(booking_id, driver_id, reason).await })
            .await
    }

    /// CompleteBooking: CONFIRMED -> COMPLETED once the window is over
    pub async fn complete_booking(&self, booking_id: Uuid) -> Result<Booking, DispatchError> {
        self.run(move |inner| async move { inner.complete(booking_id).await })
            .await
    }

    async fn run<T, F, Fut>(&self, op: F) -> Result<T, DispatchError>
    where
        F: FnOnce(Arc<Inner>) -> Fut,
        Fut: Future<Output = Result<T, DispatchError>> + Send + 'static,
        T: Send + 'static,
    {
        tokio::spawn(op(Arc::clone(&self.inner)))
            .await
            .map_err(|e| DispatchError::Internal(format!("dispatch task failed: {}", e)))?
    }
}

impl Inner {
    async fn create(
        &self,
        request: BookingRequest,
        window: TimeWindow,
    ) -> Result<Booking, DispatchError> {
        self.require_user(request.customer_id, "customer").await?;

        let now = self.clock.now();
        let price = self
            .pricing
            .quote(&request.vehicle_class, &window, request.is_ev.unwrap_or(false));
        let booking = lifecycle::open(Uuid::new_v4(), request, window, price, now);

        self.bookings.insert_booking(&booking).await?;
        info!(
            "Booking {} created for customer {}: {} at {:.2}, status {}",
            booking.id, booking.customer_id, booking.vehicle_class, booking.price, booking.status
        );

        self.announce(
            &booking,
            BookingAction::Created,
            vec![Topic::driver_pool(&booking.vehicle_class), Topic::Managers],
        )
        .await;
        Ok(booking)
    }

    async fn cancel(&self, booking_id: Uuid, customer_id: Uuid) -> Result<Booking, DispatchError> {
        let _booking_guard = self.booking_locks.lock(booking_id).await;
        let mut booking = self.load(booking_id).await?;

        let released = lifecycle::cancel(&mut booking, customer_id, self.clock.now())
            .inspect_err(|e| debug!("Cancel of booking {} refused: {}", booking_id, e))?;

        let _vehicle_guard = match released {
            Some(assignment) => Some(self.vehicle_locks.lock(assignment.vehicle_id).await),
            None => None,
        };

        let committed = self.commit(&booking).await?;
        info!("Booking {} cancelled by customer {}", booking_id, customer_id);

        if let Some(assignment) = released {
            self.release_vehicle(assignment.vehicle_id).await;
        }

        self.announce(
            &committed,
            BookingAction::Cancelled,
            vec![
                Topic::driver_pool(&committed.vehicle_class),
                Topic::Customer(committed.customer_id),
                Topic::Managers,
            ],
        )
        .await;
        if released.is_some() {
            self.announce(&committed, BookingAction::VehicleReleased, vec![Topic::Fleet])
                .await;
        }
        Ok(committed)
    }

    async fn manager_reject(
        &self,
        booking_id: Uuid,
        manager_id: Uuid,
        reason: String,
    ) -> Result<Booking, DispatchError> {
        self.require_role(manager_id, "manager", &[Role::Manager, Role::Admin])
            .await?;

        let _booking_guard = self.booking_locks.lock(booking_id).await;
        let mut booking = self.load(booking_id).await?;

        let changed = lifecycle::manager_reject(&mut booking, manager_id, &reason, self.clock.now())
            .inspect_err(|e| debug!("Manager reject of booking {} refused: {}", booking_id, e))?;
        if !changed {
            debug!("Booking {} already rejected by a manager", booking_id);
            return Ok(booking);
        }

        let committed = self.commit(&booking).await?;
        info!("Booking {} rejected by manager {}: {}", booking_id, manager_id, reason);

        self.announce(
            &committed,
            BookingAction::ManagerRejected,
            vec![
                Topic::driver_pool(&committed.vehicle_class),
                Topic::Customer(committed.customer_id),
                Topic::Managers,
            ],
        )
        .await;
        Ok(committed)
    }

    async fn driver_accept(&self, booking_id: Uuid, driver_id: Uuid) -> Result<Booking, DispatchError> {
        self.require_role(driver_id, "driver", &[Role::Driver]).await?;
        let vehicle = self.driver_vehicle(driver_id).await?;

        // Preconditions that are already broken fail before contending for locks
        let snapshot = self.load(booking_id).await?;
        let mut probe = snapshot.clone();
        lifecycle::confirm(&mut probe, driver_id, &vehicle, snapshot.updated_at).inspect_err(|e| {
            debug!("Driver {} cannot accept booking {}: {}", driver_id, booking_id, e)
        })?;

        let _booking_guard = self.booking_locks.lock(booking_id).await;
        let _vehicle_guard = self.vehicle_locks.lock(vehicle.id).await;

        let mut booking = self.load(booking_id).await?;
        if let Err(e) = lifecycle::confirm(&mut booking, driver_id, &vehicle, self.clock.now()) {
            warn!(
                "Booking {} changed while driver {} was accepting: {}",
                booking_id, driver_id, e
            );
            return Err(DispatchError::Conflict(format!(
                "booking {} changed before commit: {}",
                booking_id, e
            )));
        }

        let clashes = self
            .availability
            .conflicting_bookings(vehicle.id, &booking.window, Some(booking_id))
            .await?;
        if let Some(clash) = clashes.first() {
            warn!(
                "Vehicle {} is already booked by {} over the window of booking {}",
                vehicle.id, clash.id, booking_id
            );
            return Err(DispatchError::Conflict(format!(
                "vehicle {} already booked for an overlapping window",
                vehicle.id
            )));
        }

        let committed = self.commit(&booking).await?;
        info!(
            "Booking {} confirmed: driver {} with vehicle {}",
            booking_id, driver_id, vehicle.id
        );

        self.set_vehicle_status(vehicle.id, VehicleStatus::InUse).await;
        self.announce(
            &committed,
            BookingAction::DriverAccepted,
            vec![
                Topic::driver_pool(&committed.vehicle_class),
                Topic::Customer(committed.customer_id),
                Topic::Managers,
            ],
        )
        .await;
        Ok(committed)
    }

    async fn driver_reject(
        &self,
        booking_id: Uuid,
        driver_id: Uuid,
        reason: String,
    ) -> Result<Booking, DispatchError> {
        self.require_role(driver_id, "driver", &[Role::Driver]).await?;

        let _booking_guard = self.booking_locks.lock(booking_id).await;
        let mut booking = self.load(booking_id).await?;

        lifecycle::record_driver_rejection(&mut booking, driver_id, &reason, self.clock.now())
            .inspect_err(|e| debug!("Driver reject of booking {} refused: {}", booking_id, e))?;

        let committed = self.commit(&booking).await?;
        info!(
            "Driver {} declined booking {} ({}), still {}",
            driver_id, booking_id, reason, committed.status
        );

        self.announce(&committed, BookingAction::DriverRejected, vec![Topic::Managers])
            .await;
        Ok(committed)
    }

    async fn complete(&self, booking_id: Uuid) -> Result<Booking, DispatchError> {
        let _booking_guard = self.booking_locks.lock(booking_id).await;
        let mut booking = self.load(booking_id).await?;

        let released = lifecycle::complete(&mut booking, self.clock.now())
            .inspect_err(|e| debug!("Completion of booking {} refused: {}", booking_id, e))?;

        let _vehicle_guard = self.vehicle_locks.lock(released.vehicle_id).await;
        let committed = self.commit(&booking).await?;
        info!("Booking {} completed", booking_id);

        self.release_vehicle(released.vehicle_id).await;
        self.announce(
            &committed,
            BookingAction::Completed,
            vec![Topic::Customer(committed.customer_id), Topic::Managers],
        )
        .await;
        self.announce(&committed, BookingAction::VehicleReleased, vec![Topic::Fleet])
            .await;
        Ok(committed)
    }

    pub(crate) async fn load(&self, booking_id: Uuid) -> Result<Booking, DispatchError> {
        self.bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| DispatchError::not_found("booking", booking_id))
    }

    pub(crate) async fn require_user(
        &self,
        user_id: Uuid,
        entity: &'static str,
    ) -> Result<UserAccount, DispatchError> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| DispatchError::not_found(entity, user_id))
    }

    pub(crate) async fn require_role(
        &self,
        user_id: Uuid,
        entity: &'static str,
        allowed: &[Role],
    ) -> Result<UserAccount, DispatchError> {
        let user = self.require_user(user_id, entity).await?;
        if !allowed.contains(&user.role) {
            return Err(DispatchError::Authorization(format!(
                "user {} is not a {}",
                user_id, entity
            )));
        }
        Ok(user)
    }

    /// The one vehicle a driver operates
    async fn driver_vehicle(&self, driver_id: Uuid) -> Result<Vehicle, DispatchError> {
        let mut vehicles = self.fleet.vehicles_for_driver(driver_id).await?;
        match vehicles.len() {
            1 => Ok(vehicles.remove(0)),
            0 => Err(DispatchError::InvalidTransition(format!(
                "driver {} has no assigned vehicle",
                driver_id
            ))),
            n => Err(DispatchError::InvalidTransition(format!(
                "driver {} has {} assigned vehicles",
                driver_id, n
            ))),
        }
    }

    async fn commit(&self, booking: &Booking) -> Result<Booking, DispatchError> {
        Ok(self.bookings.update_booking(booking, booking.version).await?)
    }

    /// Back to available unless another confirmed booking still holds the vehicle
    async fn release_vehicle(&self, vehicle_id: Uuid) {
        match self.bookings.list_confirmed_for_vehicle(vehicle_id).await {
            Ok(remaining) if !remaining.is_empty() => {
                debug!(
                    "Vehicle {} stays in use for {} other booking(s)",
                    vehicle_id,
                    remaining.len()
                );
            }
            Ok(_) => self.set_vehicle_status(vehicle_id, VehicleStatus::Available).await,
            Err(e) => error!("Could not check bookings of vehicle {}: {}", vehicle_id, e),
        }
    }

    async fn set_vehicle_status(&self, vehicle_id: Uuid, status: VehicleStatus) {
        if let Err(e) = self.fleet.set_vehicle_status(vehicle_id, status).await {
            error!("Failed to mark vehicle {} as {}: {}", vehicle_id, status, e);
        }
    }

    /// Publish failures are logged and swallowed; the transition has already committed
    async fn announce(&self, booking: &Booking, action: BookingAction, topics: Vec<Topic>) {
        let now = self.clock.now();
        for topic in topics {
            let event = EventEnvelope::new(topic, action, booking.clone(), now);
            if let Err(e) = self.publisher.publish(&event).await {
                error!(
                    "Failed to publish {} for booking {} on {}: {}",
                    action, booking.id, event.topic, e
                );
            }
        }
    }
}
