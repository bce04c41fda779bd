use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::error::KafkaError;

use crate::broker::BrokerClient;
use crate::error::StartupError;
use crate::event::{InboundEvent, ReceivedMessage};
use crate::signals::{ShutdownTrigger, TerminationSignal};

pub fn message(topic: &str, payload: &str) -> InboundEvent {
    InboundEvent::Message(ReceivedMessage {
        topic: topic.to_string(),
        partition: 0,
        offset: 0,
        payload: payload.as_bytes().to_vec(),
        headers: None,
    })
}

/// Scripted broker: each poll pops the next entry, `None` entries simulate an idle poll.
/// Once the script runs dry every poll is idle.
pub struct FakeBroker {
    script: VecDeque<Option<InboundEvent>>,
    polls: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    subscribed: Arc<Mutex<Option<Vec<String>>>>,
    fail_subscribe: bool,
    fire_after: Option<(usize, ShutdownTrigger, TerminationSignal)>,
}

impl FakeBroker {
    pub fn new(script: Vec<Option<InboundEvent>>) -> Self {
        Self {
            script: script.into(),
            polls: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
            subscribed: Arc::new(Mutex::new(None)),
            fail_subscribe: false,
            fire_after: None,
        }
    }

    /// Fires `signal` right after the `polls`-th poll returns.
    pub fn fire_after_polls(
        mut self,
        polls: usize,
        trigger: ShutdownTrigger,
        signal: TerminationSignal,
    ) -> Self {
        self.fire_after = Some((polls, trigger, signal));
        self
    }

    pub fn failing_subscribe(mut self) -> Self {
        self.fail_subscribe = true;
        self
    }

    pub fn poll_count(&self) -> Arc<AtomicUsize> {
        self.polls.clone()
    }

    pub fn close_count(&self) -> Arc<AtomicUsize> {
        self.closes.clone()
    }

    pub fn subscription(&self) -> Arc<Mutex<Option<Vec<String>>>> {
        self.subscribed.clone()
    }
}

#[async_trait]
impl BrokerClient for FakeBroker {
    fn subscribe(&mut self, topics: &[String]) -> Result<(), StartupError> {
        if self.fail_subscribe {
            return Err(StartupError::Subscription {
                topics: topics.to_vec(),
                source: KafkaError::Subscription("scripted failure".to_string()),
            });
        }
        *self.subscribed.lock().unwrap() = Some(topics.to_vec());
        Ok(())
    }

    async fn poll(&mut self, _timeout: Duration) -> Option<InboundEvent> {
        let count = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        let event = self.script.pop_front().flatten();

        if let Some((after, trigger, signal)) = &self.fire_after {
            if count == *after {
                trigger.fire(*signal);
            }
        }

        event
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
