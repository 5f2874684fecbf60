//! Booking state machine.
//!
//! ```text
//! PENDING -> CONFIRMED -> COMPLETED
//! PENDING -> CANCELLED
//! PENDING -> REJECTED
//! CONFIRMED -> CANCELLED
//! ```
//!
//! Every function here is pure: it inspects a booking, checks the transition's
//! preconditions and mutates the booking in place. Persisting, locking and
//! publishing belong to the dispatcher.

use chrono::{DateTime, Utc};
use fleetx_core::{
    Assignment, Booking, BookingRequest, BookingStatus, CoreError, CoreResult, DriverRejection,
    RejectedBy, Rejection, TimeWindow, Vehicle,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Booking was rejected by manager")]
    ManagerVetoed,

    #[error("Vehicle class {vehicle_class} does not match requested class {requested}")]
    ClassMismatch {
        requested: String,
        vehicle_class: String,
    },

    #[error("Booking window is still open until {0}")]
    WindowOpen(DateTime<Utc>),

    #[error("Customer {0} does not own this booking")]
    NotOwner(Uuid),
}

/// Checks a create request and returns its window
pub fn validate(request: &BookingRequest) -> CoreResult<TimeWindow> {
    if request.vehicle_class.trim().is_empty() {
        return Err(CoreError::ValidationError("vehicleType is required".to_string()));
    }
    if request.seats == Some(0) {
        return Err(CoreError::ValidationError("seats must be at least 1".to_string()));
    }
    TimeWindow::new(request.start_time, request.end_time)
}

/// create: a fresh PENDING booking with nobody assigned
pub fn open(
    id: Uuid,
    request: BookingRequest,
    window: TimeWindow,
    price: f64,
    now: DateTime<Utc>,
) -> Booking {
    Booking {
        id,
        customer_id: request.customer_id,
        vehicle_class: request.vehicle_class.trim().to_string(),
        is_ev: request.is_ev,
        seats: request.seats,
        pickup_location: request.pickup_location.into(),
        dropoff_location: request.dropoff_location.into(),
        window,
        price,
        status: BookingStatus::Pending,
        assignment: None,
        released_assignment: None,
        rejection: None,
        driver_rejections: Vec::new(),
        version: 0,
        created_at: now,
        updated_at: now,
    }
}

/// driverAccept: PENDING -> CONFIRMED with the driver's vehicle assigned.
/// Vehicle availability is checked by the caller, under its vehicle lock.
pub fn confirm(
    booking: &mut Booking,
    driver_id: Uuid,
    vehicle: &Vehicle,
    now: DateTime<Utc>,
) -> Result<(), TransitionError> {
    if booking.is_manager_rejected() {
        return Err(TransitionError::ManagerVetoed);
    }
    ensure_transition(booking, BookingStatus::Confirmed)?;
    if !booking.matches_class(&vehicle.vehicle_class) {
        return Err(TransitionError::ClassMismatch {
            requested: booking.vehicle_class.clone(),
            vehicle_class: vehicle.vehicle_class.clone(),
        });
    }

    booking.assignment = Some(Assignment {
        driver_id,
        vehicle_id: vehicle.id,
        assigned_at: now,
    });
    apply(booking, BookingStatus::Confirmed, now);
    Ok(())
}

/// managerReject: PENDING -> REJECTED.
/// Returns `false` when the booking already carries a manager rejection and nothing changed.
pub fn manager_reject(
    booking: &mut Booking,
    manager_id: Uuid,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<bool, TransitionError> {
    if booking.status == BookingStatus::Rejected && booking.is_manager_rejected() {
        return Ok(false);
    }
    ensure_transition(booking, BookingStatus::Rejected)?;

    booking.rejection = Some(Rejection {
        rejected_by: RejectedBy::Manager,
        actor_id: manager_id,
        reason: reason.to_string(),
        rejected_at: now,
    });
    apply(booking, BookingStatus::Rejected, now);
    Ok(true)
}

/// driverReject: only from PENDING, and the status stays PENDING so sibling
/// drivers of the same class can still take it. The refusal is kept for audit.
pub fn record_driver_rejection(
    booking: &mut Booking,
    driver_id: Uuid,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), TransitionError> {
    if booking.status != BookingStatus::Pending {
        return Err(TransitionError::InvalidTransition {
            from: booking.status,
            to: BookingStatus::Pending,
        });
    }

    booking.driver_rejections.push(DriverRejection {
        driver_id,
        reason: reason.to_string(),
        rejected_at: now,
    });
    booking.rejection = Some(Rejection {
        rejected_by: RejectedBy::Driver,
        actor_id: driver_id,
        reason: reason.to_string(),
        rejected_at: now,
    });
    booking.updated_at = now;
    Ok(())
}

/// customerCancel: PENDING|CONFIRMED -> CANCELLED, owner only.
/// Returns the assignment that was released, if the booking was CONFIRMED.
pub fn cancel(
    booking: &mut Booking,
    customer_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<Assignment>, TransitionError> {
    if booking.customer_id != customer_id {
        return Err(TransitionError::NotOwner(customer_id));
    }
    ensure_transition(booking, BookingStatus::Cancelled)?;

    let released = release(booking);
    apply(booking, BookingStatus::Cancelled, now);
    Ok(released)
}

/// complete: CONFIRMED -> COMPLETED once the window has elapsed
pub fn complete(booking: &mut Booking, now: DateTime<Utc>) -> Result<Assignment, TransitionError> {
    ensure_transition(booking, BookingStatus::Completed)?;
    if !booking.window.has_elapsed(now) {
        return Err(TransitionError::WindowOpen(booking.window.end()));
    }

    let released = release(booking).ok_or(TransitionError::InvalidTransition {
        from: booking.status,
        to: BookingStatus::Completed,
    })?;
    apply(booking, BookingStatus::Completed, now);
    Ok(released)
}

fn ensure_transition(booking: &Booking, to: BookingStatus) -> Result<(), TransitionError> {
    if booking.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(TransitionError::InvalidTransition {
            from: booking.status,
            to,
        })
    }
}

fn release(booking: &mut Booking) -> Option<Assignment> {
    let released = booking.assignment.take();
    if released.is_some() {
        booking.released_assignment = released;
    }
    released
}

fn apply(booking: &mut Booking, status: BookingStatus, now: DateTime<Utc>) {
    booking.status = status;
    booking.updated_at = now;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap()
    }

    fn request(class: &str) -> BookingRequest {
        BookingRequest {
            customer_id: Uuid::from_u128(1),
            vehicle_class: class.to_string(),
            is_ev: Some(false),
            seats: Some(4),
            pickup_location: "Central Station".to_string(),
            dropoff_location: "Airport T2".to_string(),
            start_time: t0(),
            end_time: t0() + Duration::hours(2),
        }
    }

    fn pending(class: &str) -> Booking {
        let req = request(class);
        let window = validate(&req).unwrap();
        open(Uuid::from_u128(100), req, window, 30.0, t0() - Duration::hours(1))
    }

    fn suv(id: u128) -> Vehicle {
        Vehicle::new(Uuid::from_u128(id), "X5", "suv")
    }

    #[test]
    fn test_open_creates_unassigned_pending() {
        let booking = pending("SUV");
        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(booking.assignment.is_none());
        assert!(booking.rejection.is_none());
        assert!(booking.assignment_is_consistent());
    }

    #[test]
    fn test_validate_rejects_bad_requests() {
        let mut inverted = request("SUV");
        inverted.end_time = inverted.start_time - Duration::minutes(5);
        assert!(validate(&inverted).is_err());

        let mut equal = request("SUV");
        equal.end_time = equal.start_time;
        assert!(validate(&equal).is_err());

        assert!(validate(&request("  ")).is_err());

        let mut no_seats = request("Van");
        no_seats.seats = Some(0);
        assert!(validate(&no_seats).is_err());
    }

    #[test]
    fn test_confirm_assigns_driver_and_vehicle() {
        let mut booking = pending("SUV");
        confirm(&mut booking, Uuid::from_u128(7), &suv(70), t0()).unwrap();

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.assigned_driver_id(), Some(Uuid::from_u128(7)));
        assert_eq!(booking.assigned_vehicle_id(), Some(Uuid::from_u128(70)));
        assert!(booking.assignment_is_consistent());
    }

    #[test]
    fn test_confirm_requires_matching_class() {
        let mut booking = pending("Van");
        let err = confirm(&mut booking, Uuid::from_u128(7), &suv(70), t0()).unwrap_err();
        assert!(matches!(err, TransitionError::ClassMismatch { .. }));
        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(booking.assignment.is_none());
    }

    #[test]
    fn test_manager_veto_blocks_confirm_and_is_idempotent() {
        let mut booking = pending("SUV");
        assert!(manager_reject(&mut booking, Uuid::from_u128(3), "fraud check", t0()).unwrap());
        let after_first = booking.clone();

        assert!(!manager_reject(&mut booking, Uuid::from_u128(3), "again", t0()).unwrap());
        assert_eq!(booking.rejection, after_first.rejection);
        assert_eq!(booking.status, BookingStatus::Rejected);

        let err = confirm(&mut booking, Uuid::from_u128(7), &suv(70), t0()).unwrap_err();
        assert_eq!(err, TransitionError::ManagerVetoed);
        assert_eq!(booking.status, BookingStatus::Rejected);
    }

    #[test]
    fn test_manager_cannot_reject_confirmed() {
        let mut booking = pending("SUV");
        confirm(&mut booking, Uuid::from_u128(7), &suv(70), t0()).unwrap();
        let err = manager_reject(&mut booking, Uuid::from_u128(3), "late", t0()).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidTransition {
                from: BookingStatus::Confirmed,
                to: BookingStatus::Rejected
            }
        );
    }

    #[test]
    fn test_driver_rejection_keeps_booking_pending() {
        let mut booking = pending("SUV");
        record_driver_rejection(&mut booking, Uuid::from_u128(8), "too far", t0()).unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(booking.was_declined_by(Uuid::from_u128(8)));
        assert!(!booking.is_manager_rejected());
        assert_eq!(booking.rejected_by(), Some(RejectedBy::Driver));

        // A sibling driver can still take it
        confirm(&mut booking, Uuid::from_u128(9), &suv(71), t0()).unwrap();
        assert_eq!(booking.assigned_driver_id(), Some(Uuid::from_u128(9)));
    }

    #[test]
    fn test_cancel_checks_owner_and_releases_assignment() {
        let mut booking = pending("SUV");
        confirm(&mut booking, Uuid::from_u128(7), &suv(70), t0()).unwrap();

        let err = cancel(&mut booking, Uuid::from_u128(2), t0()).unwrap_err();
        assert_eq!(err, TransitionError::NotOwner(Uuid::from_u128(2)));
        assert_eq!(booking.status, BookingStatus::Confirmed);

        let released = cancel(&mut booking, Uuid::from_u128(1), t0()).unwrap();
        assert_eq!(released.map(|a| a.vehicle_id), Some(Uuid::from_u128(70)));
        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert!(booking.assignment.is_none());
        assert!(booking.served_by(Uuid::from_u128(7)));
        assert!(booking.assignment_is_consistent());

        assert!(cancel(&mut booking, Uuid::from_u128(1), t0()).is_err());
    }

    #[test]
    fn test_complete_waits_for_window_end() {
        let mut booking = pending("SUV");
        confirm(&mut booking, Uuid::from_u128(7), &suv(70), t0()).unwrap();

        let early = complete(&mut booking, t0() + Duration::minutes(30)).unwrap_err();
        assert_eq!(early, TransitionError::WindowOpen(t0() + Duration::hours(2)));

        complete(&mut booking, t0() + Duration::hours(2)).unwrap();
        assert_eq!(booking.status, BookingStatus::Completed);
        assert!(booking.assignment_is_consistent());
    }

    #[test]
    fn test_terminal_states_refuse_everything() {
        let mut booking = pending("SUV");
        cancel(&mut booking, Uuid::from_u128(1), t0()).unwrap();

        assert!(confirm(&mut booking, Uuid::from_u128(7), &suv(70), t0()).is_err());
        assert!(manager_reject(&mut booking, Uuid::from_u128(3), "x", t0()).is_err());
        assert!(record_driver_rejection(&mut booking, Uuid::from_u128(7), "x", t0()).is_err());
        assert!(complete(&mut booking, t0() + Duration::days(1)).is_err());
    }
}
