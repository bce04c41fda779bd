use rdkafka::error::KafkaError;
use thiserror::Error;

/// Failures that keep a session from ever reaching the consume loop.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create a consumer for broker {broker}")]
    ClientCreation {
        broker: String,
        #[source]
        source: KafkaError,
    },
    #[error("failed to subscribe to {topics:?}")]
    Subscription {
        topics: Vec<String>,
        #[source]
        source: KafkaError,
    },
    #[error("failed to install signal handlers")]
    Signals(#[from] std::io::Error),
}
