use anyhow::Context;
use fleetx_engine::{worker, EngineState};
use fleetx_store::app_config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleetx_engine=debug,fleetx_order=debug,fleetx_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!(
        "Starting fleetx dispatch engine with {} vehicle(s)",
        config.fleet.vehicles.len()
    );

    let state = EngineState::from_config(&config)?;
    let event_log = tokio::spawn(worker::log_events(state.subscribe()));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");

    drop(state);
    event_log.abort();
    Ok(())
}
