use fleetx_catalog::PricingEngine;
use fleetx_core::{BookingEvent, BookingRepository, Clock, Publisher, SystemClock};
use fleetx_offer::{RankedVehicle, RankingError, RecommendationQuery, VehicleRanker};
use fleetx_order::{Collaborators, DispatchCoordinator};
use fleetx_store::app_config::Config;
use fleetx_store::{BroadcastPublisher, FanoutPublisher, InMemoryBookingRepository, InMemoryFleet};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use crate::error::StartupError;

/// Everything a transport adapter needs to drive the engine
#[derive(Clone)]
pub struct EngineState {
    pub dispatch: DispatchCoordinator,
    pub ranker: Arc<VehicleRanker>,
    pub fleet: Arc<InMemoryFleet>,
    pub bus: Arc<BroadcastPublisher>,
}

impl EngineState {
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, StartupError> {
        let bookings: Arc<dyn BookingRepository> = Arc::new(InMemoryBookingRepository::new());
        let fleet = Arc::new(InMemoryFleet::seeded(&config.fleet));
        let bus = Arc::new(BroadcastPublisher::new(config.dispatch.event_buffer));
        let publisher = outbound(config, Arc::clone(&bus))?;

        let dispatch = DispatchCoordinator::new(
            Collaborators {
                bookings,
                fleet: fleet.clone(),
                users: fleet.clone(),
                publisher,
                clock,
            },
            PricingEngine::new(config.pricing.clone()),
            &config.dispatch,
        );
        let ranker = Arc::new(VehicleRanker::new(
            config.ranking.clone(),
            fleet.clone(),
            dispatch.availability().clone(),
        ));

        info!(
            "Dispatch engine ready, driver rejection policy {:?}",
            config.dispatch.driver_rejection_policy
        );

        Ok(Self {
            dispatch,
            ranker,
            fleet,
            bus,
        })
    }

    /// Every event published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.bus.subscribe()
    }

    /// Recommend: read-only, ranks free vehicles for a window
    pub async fn recommend(
        &self,
        query: &RecommendationQuery,
    ) -> Result<Vec<RankedVehicle>, RankingError> {
        self.ranker.recommend(query).await
    }
}

/// The in-process bus always receives events; Kafka joins when configured
fn outbound(config: &Config, bus: Arc<BroadcastPublisher>) -> Result<Arc<dyn Publisher>, StartupError> {
    let bus: Arc<dyn Publisher> = bus;
    let fanout = FanoutPublisher::new(vec![bus]);

    #[cfg(feature = "kafka")]
    let fanout = match &config.kafka {
        Some(kafka) => {
            let producer = fleetx_store::EventProducer::new(&kafka.brokers, &kafka.topic_prefix)
                .map_err(|e| StartupError::Kafka(e.to_string()))?;
            info!("Publishing events to Kafka at {}", kafka.brokers);
            fanout.with(Arc::new(producer))
        }
        None => fanout,
    };

    #[cfg(not(feature = "kafka"))]
    if config.kafka.is_some() {
        tracing::warn!("Kafka is configured but this build lacks the kafka feature; events stay in process");
    }

    Ok(Arc::new(fanout))
}
