use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Operational status of a vehicle as seen by the fleet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    #[default]
    Available,
    InUse,
    Maintenance,
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VehicleStatus::Available => "AVAILABLE",
            VehicleStatus::InUse => "IN_USE",
            VehicleStatus::Maintenance => "MAINTENANCE",
        };
        f.write_str(name)
    }
}

/// A fleet vehicle. Telemetry fields only feed recommendation ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    pub name: String,
    pub vehicle_class: String,
    #[serde(default)]
    pub is_ev: bool,
    #[serde(default)]
    pub status: VehicleStatus,
    #[serde(default)]
    pub assigned_driver_id: Option<Uuid>,
    #[serde(default)]
    pub battery_level: Option<f64>,
    #[serde(default)]
    pub fuel_level: Option<f64>,
    #[serde(default)]
    pub mileage: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Vehicle {
    pub fn new(id: Uuid, name: impl Into<String>, vehicle_class: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            vehicle_class: vehicle_class.into(),
            is_ev: false,
            status: VehicleStatus::Available,
            assigned_driver_id: None,
            battery_level: None,
            fuel_level: None,
            mileage: None,
            last_updated: None,
        }
    }

    pub fn matches_class(&self, vehicle_class: &str) -> bool {
        self.vehicle_class.trim().eq_ignore_ascii_case(vehicle_class.trim())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Driver,
    Manager,
    Admin,
}

/// Identity as resolved by the user directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAccount {
    pub id: Uuid,
    pub display_name: String,
    pub role: Role,
}

impl UserAccount {
    pub fn new(id: Uuid, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role,
        }
    }
}
