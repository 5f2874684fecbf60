use async_trait::async_trait;
use fleetx_core::{BookingEvent, PublishError, Publisher};
use fleetx_shared::Topic;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, error};

/// In-process fan-out bus. Driver, customer and manager listeners subscribe
/// and filter on `event.topic`.
#[derive(Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<BookingEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl Publisher for BroadcastPublisher {
    async fn publish(&self, event: &BookingEvent) -> Result<(), PublishError> {
        match self.tx.send(event.clone()) {
            Ok(listeners) => debug!("{} {} delivered to {} listener(s)", event.topic, event.action, listeners),
            // Nobody listening is not a failure
            Err(_) => debug!("{} {} dropped, no listeners", event.topic, event.action),
        }
        Ok(())
    }
}

/// Keeps every event it is handed, in publish order
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<BookingEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BookingEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn on(&self, topic: &Topic) -> Vec<BookingEvent> {
        self.events()
            .into_iter()
            .filter(|e| &e.topic == topic)
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, event: &BookingEvent) -> Result<(), PublishError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

/// Hands each event to every inner publisher. One sink failing does not stop the others;
/// the first error is returned once all have been tried.
#[derive(Clone, Default)]
pub struct FanoutPublisher {
    sinks: Vec<Arc<dyn Publisher>>,
}

impl FanoutPublisher {
    pub fn new(sinks: Vec<Arc<dyn Publisher>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn Publisher>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl Publisher for FanoutPublisher {
    async fn publish(&self, event: &BookingEvent) -> Result<(), PublishError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.publish(event).await {
                error!("Failed to publish {} on {}: {}", event.action, event.topic, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(feature = "kafka")]
pub use kafka::EventProducer;

#[cfg(feature = "kafka")]
mod kafka {
    use super::*;
    use rdkafka::config::ClientConfig;
    use rdkafka::producer::{FutureProducer, FutureRecord};
    use rdkafka::util::Timeout;
    use std::time::Duration;
    use tracing::info;

    /// Publishes lifecycle events to Kafka, one Kafka topic per fan-out channel
    #[derive(Clone)]
    pub struct EventProducer {
        producer: FutureProducer,
        topic_prefix: String,
    }

    impl EventProducer {
        pub fn new(brokers: &str, topic_prefix: &str) -> Result<Self, rdkafka::error::KafkaError> {
            let producer: FutureProducer = ClientConfig::new()
                .set("bootstrap.servers", brokers)
                .set("message.timeout.ms", "5000")
                .create()?;

            Ok(Self {
                producer,
                topic_prefix: topic_prefix.to_string(),
            })
        }

        fn kafka_topic(&self, topic: &Topic) -> String {
            format!("{}.{}", self.topic_prefix, topic)
        }
    }

    #[async_trait]
    impl Publisher for EventProducer {
        async fn publish(&self, event: &BookingEvent) -> Result<(), PublishError> {
            let topic = self.kafka_topic(&event.topic);
            let key = event.payload.id.to_string();
            let payload = serde_json::to_string(event)?;

            let record = FutureRecord::to(&topic).key(&key).payload(&payload);

            match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
                Ok(delivery) => {
                    info!(
                        "Sent {} to {}/{}: partition {} offset {}",
                        event.action, topic, key, delivery.partition, delivery.offset
                    );
                    Ok(())
                }
                Err((e, _msg)) => {
                    error!("Failed to send message to {}: {}", topic, e);
                    Err(PublishError::Transport {
                        topic,
                        reason: e.to_string(),
                    })
                }
            }
        }
    }
}
