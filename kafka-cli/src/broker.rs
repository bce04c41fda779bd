use std::time::Duration;

use async_trait::async_trait;
use rdkafka::consumer::{BaseConsumer, Consumer, ConsumerContext, Rebalance, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::ClientContext;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::StartupError;
use crate::event::{BrokerError, InboundEvent, ReceivedMessage};

/// The operations the consume loop needs from a broker connection.
#[async_trait]
pub trait BrokerClient: Send {
    fn subscribe(&mut self, topics: &[String]) -> Result<(), StartupError>;

    /// Waits at most `timeout` for the next event. `None` means nothing arrived in time.
    async fn poll(&mut self, timeout: Duration) -> Option<InboundEvent>;

    /// Releases the connection. Must tolerate being called more than once.
    fn close(&mut self);
}

/// Forwards client level errors and rebalance notices, which librdkafka reports through
/// callbacks rather than the message queue, so that `poll` can hand them out in order.
pub struct CliConsumerContext {
    notices: mpsc::UnboundedSender<InboundEvent>,
}

impl CliConsumerContext {
    fn forward(&self, event: InboundEvent) {
        // Receiver only goes away once the broker is closed
        if self.notices.send(event).is_err() {
            debug!("dropping broker notice after close");
        }
    }
}

impl ClientContext for CliConsumerContext {
    fn error(&self, error: KafkaError, reason: &str) {
        let mut broker_error = BrokerError::from(&error);
        broker_error.description = reason.to_string();
        self.forward(InboundEvent::Error(broker_error));
    }
}

impl ConsumerContext for CliConsumerContext {
    fn post_rebalance(&self, _base_consumer: &BaseConsumer<Self>, rebalance: &Rebalance) {
        info!("Post-rebalance event: {:?}", rebalance);
        self.forward(InboundEvent::Other(format!("{:?}", rebalance)));
    }
}

pub struct KafkaBroker {
    consumer: Option<StreamConsumer<CliConsumerContext>>,
    notices: mpsc::UnboundedReceiver<InboundEvent>,
}

impl KafkaBroker {
    pub fn connect(config: &SessionConfig) -> Result<Self, StartupError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let context = CliConsumerContext { notices: tx };

        let consumer: StreamConsumer<CliConsumerContext> = config
            .client_config()
            .create_with_context(context)
            .map_err(|source| StartupError::ClientCreation {
                broker: config.broker.clone(),
                source,
            })?;

        info!(
            broker = %config.broker,
            group_id = %config.group_id,
            "created kafka consumer"
        );

        Ok(Self {
            consumer: Some(consumer),
            notices: rx,
        })
    }
}

#[async_trait]
impl BrokerClient for KafkaBroker {
    fn subscribe(&mut self, topics: &[String]) -> Result<(), StartupError> {
        let subscription_error = |source| StartupError::Subscription {
            topics: topics.to_vec(),
            source,
        };

        let Some(consumer) = self.consumer.as_ref() else {
            return Err(subscription_error(KafkaError::Subscription(
                "consumer already closed".to_string(),
            )));
        };

        let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
        consumer.subscribe(&topic_refs).map_err(subscription_error)?;

        info!(topics = ?topics, "subscribed");
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> Option<InboundEvent> {
        let consumer = self.consumer.as_ref()?;
        if let Ok(notice) = self.notices.try_recv() {
            return Some(notice);
        }

        match tokio::time::timeout(timeout, consumer.recv()).await {
            Ok(Ok(message)) => Some(InboundEvent::Message(ReceivedMessage::from_borrowed(
                &message,
            ))),
            Ok(Err(e)) => Some(InboundEvent::Error(BrokerError::from(&e))),
            // Callbacks may have fired while we waited
            Err(_) => self.notices.try_recv().ok(),
        }
    }

    fn close(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            consumer.unsubscribe();
            drop(consumer);
            info!("kafka consumer closed");
        }
    }
}

/// Owns a broker client and releases it exactly once, on the normal path through
/// [`BrokerConnection::release`] or on drop for every other path.
pub struct BrokerConnection<B: BrokerClient> {
    client: B,
    released: bool,
}

impl<B: BrokerClient> BrokerConnection<B> {
    pub fn new(client: B) -> Self {
        Self {
            client,
            released: false,
        }
    }

    pub fn subscribe(&mut self, topics: &[String]) -> Result<(), StartupError> {
        self.client.subscribe(topics)
    }

    pub async fn poll(&mut self, timeout: Duration) -> Option<InboundEvent> {
        if self.released {
            warn!("poll on a released broker connection");
            return None;
        }
        self.client.poll(timeout).await
    }

    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.client.close();
        }
    }
}

impl<B: BrokerClient> Drop for BrokerConnection<B> {
    fn drop(&mut self) {
        self.release();
    }
}
