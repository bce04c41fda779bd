use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use rdkafka::ClientConfig;

use crate::group_id::group_id_from_time;

/// Pattern subscription that always rides along with the user's topic.
pub const SECONDARY_TOPIC_PATTERN: &str = "^aRegex.*[Tt]opic";

pub const DEFAULT_BROKER: &str = "localhost:29092";

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OffsetReset {
    Earliest,
    Latest,
    /// Fail instead of resetting when the group has no committed offset
    #[value(name = "none")]
    NoReset,
}

impl OffsetReset {
    /// Value for librdkafka's `auto.offset.reset`
    pub fn as_rdkafka_str(&self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
            OffsetReset::NoReset => "error",
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "Stream messages from a Kafka topic to stdout", long_about = None)]
pub struct Cli {
    /// Offset where to start from (auto.offset.reset)
    #[arg(short, long, value_enum, default_value_t = OffsetReset::Earliest)]
    pub offset: OffsetReset,

    /// Which broker to poll the messages from
    #[arg(short, long, default_value = DEFAULT_BROKER)]
    pub broker: String,

    /// Consumer group to register, derived from the current time when omitted
    #[arg(short, long)]
    pub group: Option<String>,

    /// Which topic should be used
    #[arg(short = 'T', long)]
    pub topic: String,

    /// Session timeout in seconds
    #[arg(
        short = 't',
        long = "timeout",
        default_value_t = 6,
        value_parser = clap::value_parser!(u64).range(1..=3600)
    )]
    pub timeout_secs: u64,

    /// Verbose mode
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Freezes the parsed flags into a session config. `now` seeds the default group id.
    pub fn into_session_config(self, now: DateTime<Utc>) -> SessionConfig {
        let group_id = self.group.unwrap_or_else(|| group_id_from_time(&now));

        SessionConfig {
            broker: self.broker,
            group_id,
            topic: self.topic,
            offset_reset: self.offset,
            session_timeout: Duration::from_secs(self.timeout_secs),
            verbose: self.verbose,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub broker: String,
    pub group_id: String,
    pub topic: String,
    pub offset_reset: OffsetReset,
    pub session_timeout: Duration,
    pub verbose: bool,
}

impl SessionConfig {
    pub fn subscription(&self) -> Vec<String> {
        vec![self.topic.clone(), SECONDARY_TOPIC_PATTERN.to_string()]
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &self.broker)
            .set("group.id", &self.group_id)
            .set("auto.offset.reset", self.offset_reset.as_rdkafka_str())
            .set(
                "session.timeout.ms",
                self.session_timeout.as_millis().to_string(),
            )
            .set("broker.address.family", "v4");
        client_config
    }
}
