use std::io::Write;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::broker::{BrokerClient, BrokerConnection};
use crate::event::InboundEvent;
use crate::report::EventReporter;
use crate::signals::{ShutdownToken, TerminationSignal};

/// Upper bound on how long one cycle waits for the broker, and so on shutdown latency.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Signal(TerminationSignal),
    BrokersDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

impl LoopState {
    /// State after handling `event`. Only an all-brokers-down error stops the loop.
    pub fn after(event: &InboundEvent) -> LoopState {
        match event {
            InboundEvent::Error(error) if error.is_fatal() => {
                LoopState::Stopped(StopReason::BrokersDown)
            }
            InboundEvent::Message(_) | InboundEvent::Error(_) | InboundEvent::Other(_) => {
                LoopState::Running
            }
        }
    }
}

pub struct ConsumerLoop<B: BrokerClient, O, E> {
    connection: BrokerConnection<B>,
    reporter: EventReporter<O, E>,
    shutdown: ShutdownToken,
    poll_timeout: Duration,
}

impl<B, O, E> ConsumerLoop<B, O, E>
where
    B: BrokerClient,
    O: Write,
    E: Write,
{
    pub fn new(
        connection: BrokerConnection<B>,
        reporter: EventReporter<O, E>,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            connection,
            reporter,
            shutdown,
            poll_timeout: POLL_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Consumes until a termination signal or the loss of every broker, then releases the
    /// connection. Hands the reporter back so callers can keep writing to the same sinks.
    pub async fn run(mut self) -> (StopReason, EventReporter<O, E>) {
        info!("Starting consumer loop");
        let mut state = LoopState::Running;

        let reason = loop {
            if let LoopState::Stopped(reason) = state {
                break reason;
            }

            // Signals are checked before every poll so a busy topic cannot delay shutdown
            if let Some(signal) = self.shutdown.try_take() {
                self.reporter.caught_signal(signal);
                state = LoopState::Stopped(StopReason::Signal(signal));
                continue;
            }

            let Some(event) = self.connection.poll(self.poll_timeout).await else {
                continue;
            };

            self.reporter.report(&event);
            state = LoopState::after(&event);

            match (&event, state) {
                (InboundEvent::Error(error), LoopState::Stopped(_)) => {
                    warn!("All brokers down: {} - stopping", error);
                }
                (InboundEvent::Error(error), LoopState::Running) => {
                    debug!("Transient broker error: {}", error);
                }
                (InboundEvent::Message(_) | InboundEvent::Other(_), _) => {}
            }
        };
        info!(reason = ?reason, "Consumer loop stopped");

        self.reporter.closing();
        self.connection.release();

        let ConsumerLoop { reporter, .. } = self;
        (reason, reporter)
    }
}
