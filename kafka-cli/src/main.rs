use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use kafka_cli::config::Cli;
use kafka_cli::report::EventReporter;

fn setup_tracing(verbose: bool) {
    // stdout carries the messages, so logs go to stderr
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy()
                .add_directive("rdkafka=warn".parse().unwrap()),
        );
    tracing_subscriber::registry().with(log_layer).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Cli::parse().into_session_config(Utc::now());
    setup_tracing(config.verbose);

    info!(
        broker = %config.broker,
        group_id = %config.group_id,
        topic = %config.topic,
        "Configuration loaded"
    );

    match kafka_cli::run(&config).await {
        Ok(reason) => {
            info!(reason = ?reason, "kafka-cli shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            debug!("startup failed: {:?}", e);
            EventReporter::stdio(config.verbose).startup_failure(&config, &e);
            ExitCode::FAILURE
        }
    }
}
