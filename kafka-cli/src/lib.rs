use std::io::Write;

pub mod broker;
pub mod config;
pub mod consumer;
pub mod error;
pub mod event;
pub mod group_id;
pub mod report;
pub mod signals;

#[cfg(test)]
mod test_utils;

use broker::{BrokerClient, BrokerConnection, KafkaBroker};
use config::SessionConfig;
use consumer::{ConsumerLoop, StopReason};
use error::StartupError;
use report::EventReporter;
use signals::{ShutdownToken, SignalWatcher};

/// Connects to the configured broker and streams to stdout until a signal arrives or every
/// broker is gone.
pub async fn run(config: &SessionConfig) -> Result<StopReason, StartupError> {
    let shutdown = SignalWatcher::install()?;
    let broker = KafkaBroker::connect(config)?;

    let (reason, _) =
        run_session(broker, config, EventReporter::stdio(config.verbose), shutdown).await?;
    Ok(reason)
}

/// Subscribes `broker` and drives the consume loop. The broker is released on every path out,
/// including a failed subscription.
pub async fn run_session<B, O, E>(
    broker: B,
    config: &SessionConfig,
    mut reporter: EventReporter<O, E>,
    shutdown: ShutdownToken,
) -> Result<(StopReason, EventReporter<O, E>), StartupError>
where
    B: BrokerClient,
    O: Write,
    E: Write,
{
    reporter.consumer_created(config);

    let mut connection = BrokerConnection::new(broker);
    connection.subscribe(&config.subscription())?;
    reporter.subscribed(config);

    Ok(ConsumerLoop::new(connection, reporter, shutdown)
        .run()
        .await)
}
