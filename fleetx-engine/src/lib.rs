pub mod error;
pub mod state;
pub mod worker;

pub use error::StartupError;
pub use state::EngineState;
