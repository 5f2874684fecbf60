use chrono::{DateTime, Utc};
use fleetx_core::{Vehicle, VehicleStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Input of `Recommend`
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationQuery {
    pub customer_id: Uuid,
    pub vehicle_class: Option<String>,
    /// `Some(true)` keeps only EVs; `None`/`Some(false)` applies no filter
    pub ev_only: Option<bool>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub limit: Option<usize>,
}

/// A candidate vehicle with its match score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedVehicle {
    pub vehicle_id: Uuid,
    pub name: String,
    pub vehicle_class: String,
    pub is_ev: bool,
    pub status: VehicleStatus,
    pub battery_level: Option<f64>,
    pub fuel_level: Option<f64>,
    pub match_score: f64,
}

impl RankedVehicle {
    pub fn from_vehicle(vehicle: Vehicle, match_score: f64) -> Self {
        Self {
            vehicle_id: vehicle.id,
            name: vehicle.name,
            vehicle_class: vehicle.vehicle_class,
            is_ev: vehicle.is_ev,
            status: vehicle.status,
            battery_level: vehicle.battery_level,
            fuel_level: vehicle.fuel_level,
            match_score,
        }
    }
}
