pub mod models;
pub mod ranker;

pub use models::{RankedVehicle, RecommendationQuery};
pub use ranker::{RankingError, VehicleRanker};
