use std::error::Error as _;
use std::io::{self, Stderr, Stdout, Write};

use tracing::warn;

use crate::config::SessionConfig;
use crate::error::StartupError;
use crate::event::{BrokerError, InboundEvent, MessageHeader, ReceivedMessage};
use crate::signals::TerminationSignal;

/// Human readable output. Messages and notices go to `out`, errors to `err`.
pub struct EventReporter<O, E> {
    out: O,
    err: E,
    verbose: bool,
}

impl EventReporter<Stdout, Stderr> {
    pub fn stdio(verbose: bool) -> Self {
        Self::new(io::stdout(), io::stderr(), verbose)
    }
}

impl<O: Write, E: Write> EventReporter<O, E> {
    pub fn new(out: O, err: E, verbose: bool) -> Self {
        Self { out, err, verbose }
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }

    pub fn report(&mut self, event: &InboundEvent) {
        match event {
            InboundEvent::Message(message) => self.message(message),
            InboundEvent::Error(error) => self.error(error),
            InboundEvent::Other(notice) => {
                let res = writeln!(self.out, "Ignored {}", notice);
                log_write_failure(res);
            }
        }
    }

    fn message(&mut self, message: &ReceivedMessage) {
        let res = writeln!(
            self.out,
            "Received message on {}:\n{}.",
            message.locator(),
            String::from_utf8_lossy(&message.payload)
        );
        log_write_failure(res);

        if let (true, Some(headers)) = (self.verbose, &message.headers) {
            let res = writeln!(self.out, "With headers: {}.", format_headers(headers));
            log_write_failure(res);
        }
    }

    fn error(&mut self, error: &BrokerError) {
        let res = writeln!(self.err, "Error: {}.", error);
        log_write_failure(res);
    }

    pub fn consumer_created(&mut self, config: &SessionConfig) {
        let res = writeln!(
            self.out,
            "Successfully created consumer for broker: {} with group: {}.",
            config.broker, config.group_id
        );
        log_write_failure(res);
    }

    pub fn subscribed(&mut self, config: &SessionConfig) {
        if !self.verbose {
            return;
        }
        let res = writeln!(
            self.out,
            "Subscribed topic: {} with group: {}.",
            config.topic, config.group_id
        );
        log_write_failure(res);
    }

    pub fn caught_signal(&mut self, signal: TerminationSignal) {
        let res = writeln!(self.out, "Caught signal {}: terminating.", signal);
        log_write_failure(res);
    }

    pub fn closing(&mut self) {
        let res = writeln!(self.out, "Closing consumer.");
        log_write_failure(res);
    }

    /// Startup failures always get a one-line summary; the cause chain only with verbose.
    pub fn startup_failure(&mut self, config: &SessionConfig, failure: &StartupError) {
        let summary = match failure {
            StartupError::ClientCreation { .. } => format!(
                "Failed to create a consumer to broker: {} with group: {} and topic: {}.",
                config.broker, config.group_id, config.topic
            ),
            StartupError::Subscription { .. } => {
                format!("Failed to subscribe topic {}.", config.topic)
            }
            StartupError::Signals(_) => "Failed to install signal handlers.".to_string(),
        };
        log_write_failure(writeln!(self.err, "{}", summary));

        if self.verbose {
            let mut source = failure.source();
            while let Some(cause) = source {
                log_write_failure(writeln!(self.err, "Caused by: {}", cause));
                source = cause.source();
            }
        }
    }
}

fn format_headers(headers: &[MessageHeader]) -> String {
    let rendered: Vec<String> = headers
        .iter()
        .map(|header| match &header.value {
            Some(value) => format!("{}={:?}", header.key, String::from_utf8_lossy(value)),
            None => format!("{}=<null>", header.key),
        })
        .collect();
    format!("[{}]", rendered.join(", "))
}

fn log_write_failure(res: io::Result<()>) {
    if let Err(e) = res {
        warn!("failed to write output: {}", e);
    }
}
