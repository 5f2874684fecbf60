use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The `action` tag carried by every booking lifecycle event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingAction {
    Created,
    ManagerRejected,
    DriverAccepted,
    DriverRejected,
    Cancelled,
    VehicleReleased,
    Completed,
}

impl BookingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::Created => "CREATED",
            BookingAction::ManagerRejected => "MANAGER_REJECTED",
            BookingAction::DriverAccepted => "DRIVER_ACCEPTED",
            BookingAction::DriverRejected => "DRIVER_REJECTED",
            BookingAction::Cancelled => "CANCELLED",
            BookingAction::VehicleReleased => "VEHICLE_RELEASED",
            BookingAction::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for BookingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fan-out channel an event is published on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum Topic {
    /// Drivers subscribe by vehicle class. The class is stored upper-cased.
    DriverPool(String),
    Managers,
    Customer(Uuid),
    Fleet,
}

impl Topic {
    pub fn driver_pool(vehicle_class: &str) -> Self {
        Topic::DriverPool(vehicle_class.trim().to_uppercase())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::DriverPool(class) => write!(f, "bookings.requests.{}", class),
            Topic::Managers => f.write_str("bookings.manager"),
            Topic::Customer(id) => write!(f, "bookings.customer.{}", id),
            Topic::Fleet => f.write_str("fleet.vehicles"),
        }
    }
}

/// A payload stamped with where and why it was published
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    pub event_id: Uuid,
    pub topic: Topic,
    pub action: BookingAction,
    pub published_at: DateTime<Utc>,
    pub payload: T,
}

impl<T> EventEnvelope<T> {
    pub fn new(topic: Topic, action: BookingAction, payload: T, published_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            topic,
            action,
            published_at,
            payload,
        }
    }
}
