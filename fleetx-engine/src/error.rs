#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Kafka producer setup failed: {0}")]
    Kafka(String),
}
