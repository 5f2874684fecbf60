pub mod availability;
pub mod pricing;

pub use availability::AvailabilityResolver;
pub use pricing::{PricingConfig, PricingEngine};
