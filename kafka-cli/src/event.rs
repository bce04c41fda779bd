use std::fmt;

use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::{BorrowedMessage, Headers, Message};

/// Everything a poll of the broker can hand back.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Message(ReceivedMessage),
    Error(BrokerError),
    /// Notices with no control impact, e.g. partition assignment
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub key: String,
    pub value: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
    pub headers: Option<Vec<MessageHeader>>,
}

impl ReceivedMessage {
    pub fn from_borrowed(message: &BorrowedMessage<'_>) -> Self {
        let headers = message.headers().map(|headers| {
            headers
                .iter()
                .map(|header| MessageHeader {
                    key: header.key.to_string(),
                    value: header.value.map(<[u8]>::to_vec),
                })
                .collect()
        });

        Self {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            headers,
        }
    }

    /// `topic[partition]@offset`
    pub fn locator(&self) -> String {
        format!("{}[{}]@{}", self.topic, self.partition, self.offset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerError {
    pub code: Option<RDKafkaErrorCode>,
    pub description: String,
}

impl BrokerError {
    pub fn new(code: RDKafkaErrorCode, description: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            description: description.into(),
        }
    }

    /// Only losing every broker ends a session, everything else is transient.
    pub fn is_fatal(&self) -> bool {
        self.code == Some(RDKafkaErrorCode::AllBrokersDown)
    }
}

impl From<&KafkaError> for BrokerError {
    fn from(error: &KafkaError) -> Self {
        Self {
            code: error.rdkafka_error_code(),
            description: error.to_string(),
        }
    }
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{:?}: {}", code, self.description),
            None => write!(f, "Unknown: {}", self.description),
        }
    }
}
