use crate::models::{RankedVehicle, RecommendationQuery};
use fleetx_catalog::AvailabilityResolver;
use fleetx_core::{CoreError, FleetDirectory, RepositoryError, TimeWindow, Vehicle};
use fleetx_store::app_config::RankingConfig;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum RankingError {
    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Rule-based vehicle recommendation
pub struct VehicleRanker {
    config: RankingConfig,
    fleet: Arc<dyn FleetDirectory>,
    availability: AvailabilityResolver,
}

impl VehicleRanker {
    pub fn new(
        config: RankingConfig,
        fleet: Arc<dyn FleetDirectory>,
        availability: AvailabilityResolver,
    ) -> Self {
        Self { config, fleet, availability }
    }

    /// Filter by class and EV, drop vehicles with a confirmed overlap, then rank
    pub async fn recommend(&self, query: &RecommendationQuery) -> Result<Vec<RankedVehicle>, RankingError> {
        let window = TimeWindow::new(query.start_time, query.end_time)?;
        let limit = query.limit.unwrap_or(self.config.default_limit);

        let class_filter = query
            .vehicle_class
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let ev_only = query.ev_only.unwrap_or(false);

        let mut candidates = Vec::new();
        for vehicle in self.fleet.list_vehicles().await? {
            if let Some(class) = class_filter {
                if !vehicle.matches_class(class) {
                    continue;
                }
            }
            if ev_only && !vehicle.is_ev {
                continue;
            }
            if self.availability.has_conflict(vehicle.id, &window).await? {
                continue;
            }
            candidates.push(vehicle);
        }

        debug!(
            "Recommending for customer {}: {} candidate(s), limit {}",
            query.customer_id,
            candidates.len(),
            limit
        );

        Ok(self.rank(candidates, limit))
    }

    /// Sort by score descending, ties by ascending vehicle id, then truncate
    pub fn rank(&self, candidates: Vec<Vehicle>, limit: usize) -> Vec<RankedVehicle> {
        let mut ranked: Vec<RankedVehicle> = candidates
            .into_iter()
            .map(|v| {
                let score = self.score(&v);
                RankedVehicle::from_vehicle(v, score)
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.match_score
                .total_cmp(&a.match_score)
                .then_with(|| a.vehicle_id.cmp(&b.vehicle_id))
        });
        ranked.truncate(limit);
        ranked
    }

    /// Vehicle condition score in `[0, 1]`. Never decreases as battery or fuel rise.
    pub fn score(&self, vehicle: &Vehicle) -> f64 {
        let mut score = self.config.base_score;

        if vehicle.battery_level.unwrap_or(0.0) > self.config.battery_threshold {
            score += self.config.battery_bonus;
        }
        if vehicle.fuel_level.unwrap_or(0.0) > self.config.fuel_threshold {
            score += self.config.fuel_bonus;
        }
        if vehicle.is_ev {
            score += self.config.ev_bonus;
        }

        score.clamp(0.0, 1.0)
    }
}
