use fleetx_catalog::PricingConfig;
use fleetx_core::{UserAccount, Vehicle};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub kafka: Option<KafkaConfig>,
    #[serde(default)]
    pub fleet: FleetSeed,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RankingConfig {
    pub base_score: f64,
    pub battery_threshold: f64,
    pub battery_bonus: f64,
    pub fuel_threshold: f64,
    pub fuel_bonus: f64,
    pub ev_bonus: f64,
    pub default_limit: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            base_score: 0.5,
            battery_threshold: 80.0,
            battery_bonus: 0.2,
            fuel_threshold: 70.0,
            fuel_bonus: 0.2,
            ev_bonus: 0.1,
            default_limit: 5,
        }
    }
}

/// What a driver's refusal does to their own pending list
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DriverRejectionPolicy {
    /// Hide the booking from drivers who already declined it
    #[default]
    Exclude,
    /// Keep offering it on every poll
    Reoffer,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DispatchConfig {
    pub driver_rejection_policy: DriverRejectionPolicy,
    /// Capacity of the in-process event bus
    pub event_buffer: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            driver_rejection_policy: DriverRejectionPolicy::default(),
            event_buffer: 256,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
}

fn default_topic_prefix() -> String {
    "fleetx".to_string()
}

/// Users and vehicles loaded into the in-memory directories at startup
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FleetSeed {
    #[serde(default)]
    pub users: Vec<UserAccount>,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default").required(false))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `FLEETX__DISPATCH__EVENT_BUFFER=64`
            .add_source(config::Environment::with_prefix("FLEETX").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
