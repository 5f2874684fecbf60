use chrono::{DateTime, Utc};
use fleetx_shared::Masked;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::window::TimeWindow;
use crate::CoreError;

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    Rejected,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
        BookingStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Rejected => "REJECTED",
        }
    }

    /// No transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Cancelled | BookingStatus::Completed | BookingStatus::Rejected
        )
    }

    /// The closed transition table
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Pending, Rejected)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::ValidationError(format!("Unknown booking status: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectedBy {
    Manager,
    Driver,
}

/// Most recent rejection recorded on the booking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rejection {
    pub rejected_by: RejectedBy,
    pub actor_id: Uuid,
    pub reason: String,
    pub rejected_at: DateTime<Utc>,
}

/// Audit entry for a driver who declined a pending booking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverRejection {
    pub driver_id: Uuid,
    pub reason: String,
    pub rejected_at: DateTime<Utc>,
}

/// Driver and vehicle committed to a booking. Both are set together or not at all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}

/// A customer's request to use a vehicle class over a time window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub vehicle_class: String,
    pub is_ev: Option<bool>,
    pub seats: Option<u32>,
    pub pickup_location: Masked<String>,
    pub dropoff_location: Masked<String>,
    #[serde(flatten)]
    pub window: TimeWindow,
    pub price: f64,
    pub status: BookingStatus,
    /// Live commitment, present only while CONFIRMED
    pub assignment: Option<Assignment>,
    /// The commitment a cancelled or completed booking held
    pub released_assignment: Option<Assignment>,
    pub rejection: Option<Rejection>,
    #[serde(default)]
    pub driver_rejections: Vec<DriverRejection>,
    /// Bumped by the repository on every successful update
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn assigned_driver_id(&self) -> Option<Uuid> {
        self.assignment.map(|a| a.driver_id)
    }

    pub fn assigned_vehicle_id(&self) -> Option<Uuid> {
        self.assignment.map(|a| a.vehicle_id)
    }

    pub fn rejected_by(&self) -> Option<RejectedBy> {
        self.rejection.as_ref().map(|r| r.rejected_by)
    }

    /// A manager veto permanently blocks driver acceptance
    pub fn is_manager_rejected(&self) -> bool {
        self.rejected_by() == Some(RejectedBy::Manager)
    }

    pub fn was_declined_by(&self, driver_id: Uuid) -> bool {
        self.driver_rejections.iter().any(|r| r.driver_id == driver_id)
    }

    pub fn matches_class(&self, vehicle_class: &str) -> bool {
        self.vehicle_class.trim().eq_ignore_ascii_case(vehicle_class.trim())
    }

    /// Driver who holds or held this booking
    pub fn served_by(&self, driver_id: Uuid) -> bool {
        self.assignment
            .or(self.released_assignment)
            .is_some_and(|a| a.driver_id == driver_id)
    }

    /// CONFIRMED if and only if a driver/vehicle pair is assigned
    pub fn assignment_is_consistent(&self) -> bool {
        (self.status == BookingStatus::Confirmed) == self.assignment.is_some()
    }
}

/// Input of `CreateBooking`
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub customer_id: Uuid,
    pub vehicle_class: String,
    pub is_ev: Option<bool>,
    pub seats: Option<u32>,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!("confirmed".parse::<BookingStatus>().unwrap(), BookingStatus::Confirmed);
        assert_eq!(" Pending ".parse::<BookingStatus>().unwrap(), BookingStatus::Pending);
        assert!("ARCHIVED".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_transition_table_is_closed() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(!Confirmed.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Completed));

        for terminal in [Cancelled, Completed, Rejected] {
            assert!(terminal.is_terminal());
            for next in BookingStatus::ALL {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(!Confirmed.is_terminal());
    }
}
