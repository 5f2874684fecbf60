use chrono::Duration;
use fleetx_core::TimeWindow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Hourly rate for classes missing from `class_rates`
    pub default_hourly_rate: f64,

    /// Added once per booking when an EV is requested
    pub ev_surcharge: f64,

    /// Hourly rate per vehicle class; keys are matched case-insensitively
    pub class_rates: HashMap<String, f64>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_hourly_rate: 10.0,
            ev_surcharge: 2.0,
            class_rates: {
                let mut m = HashMap::new();
                m.insert("SUV".to_string(), 15.0);
                m.insert("VAN".to_string(), 12.0);
                m.insert("TRUCK".to_string(), 18.0);
                m.insert("PREMIUM".to_string(), 25.0);
                m.insert("BIKE".to_string(), 5.0);
                m
            },
        }
    }
}

/// Rental price calculator. Pure: no I/O, no clock.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    default_hourly_rate: f64,
    ev_surcharge: f64,
    class_rates: HashMap<String, f64>,
}

impl PricingEngine {
    /// Configured class rates override the built-in table per class;
    /// classes left out keep their built-in rate.
    pub fn new(config: PricingConfig) -> Self {
        let mut class_rates: HashMap<String, f64> = PricingConfig::default()
            .class_rates
            .into_iter()
            .map(|(class, rate)| (normalize(&class), rate))
            .collect();
        class_rates.extend(
            config
                .class_rates
                .into_iter()
                .map(|(class, rate)| (normalize(&class), rate)),
        );

        Self {
            default_hourly_rate: config.default_hourly_rate,
            ev_surcharge: config.ev_surcharge,
            class_rates,
        }
    }

    pub fn hourly_rate(&self, vehicle_class: &str) -> f64 {
        self.class_rates
            .get(&normalize(vehicle_class))
            .copied()
            .unwrap_or(self.default_hourly_rate)
    }

    /// Whole hours, rounded up, never less than one
    pub fn billable_hours(window: &TimeWindow) -> i64 {
        let duration = window.duration();
        let whole = duration.num_hours();
        let hours = if duration > Duration::hours(whole) {
            whole + 1
        } else {
            whole
        };
        hours.max(1)
    }

    /// Price for renting `vehicle_class` over `window`
    pub fn quote(&self, vehicle_class: &str, window: &TimeWindow, is_ev: bool) -> f64 {
        let hours = Self::billable_hours(window) as f64;
        let surcharge = if is_ev { self.ev_surcharge } else { 0.0 };

        (self.hourly_rate(vehicle_class) * hours + surcharge).max(0.0)
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

fn normalize(vehicle_class: &str) -> String {
    vehicle_class.trim().to_uppercase()
}
