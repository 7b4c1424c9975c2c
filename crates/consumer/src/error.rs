use rdkafka::types::RDKafkaErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// SASL handshake rejected the configured credentials. Never retried.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Broker unreachable or connection lost. Retryable with backoff.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    /// Consumer group membership or authorization failure.
    #[error("Consumer group error: {0}")]
    Group(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Offsets within a partition must be non-decreasing for a single
    /// consumer instance.
    #[error(
        "Offset regression on {topic}[{partition}]: observed {observed} after {last}"
    )]
    OffsetRegression {
        topic: String,
        partition: i32,
        last: i64,
        observed: i64,
    },

    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify an rdkafka error into the failure taxonomy used by the
    /// consumer client: authentication and group errors are fatal, network
    /// errors are retryable, a missing topic is fatal unless broker-side
    /// auto-creation is enabled.
    pub fn from_kafka(err: rdkafka::error::KafkaError) -> Self {
        match err.rdkafka_error_code() {
            Some(RDKafkaErrorCode::SaslAuthenticationFailed)
            | Some(RDKafkaErrorCode::Authentication) => Error::Authentication(err.to_string()),
            Some(RDKafkaErrorCode::UnknownTopicOrPartition)
            | Some(RDKafkaErrorCode::UnknownTopic) => Error::TopicNotFound(err.to_string()),
            Some(RDKafkaErrorCode::BrokerTransportFailure)
            | Some(RDKafkaErrorCode::AllBrokersDown)
            | Some(RDKafkaErrorCode::Resolve)
            | Some(RDKafkaErrorCode::NetworkException)
            | Some(RDKafkaErrorCode::OperationTimedOut)
            | Some(RDKafkaErrorCode::RequestTimedOut) => Error::Network(err.to_string()),
            Some(RDKafkaErrorCode::GroupAuthorizationFailed)
            | Some(RDKafkaErrorCode::InvalidGroupId)
            | Some(RDKafkaErrorCode::UnknownMemberId)
            | Some(RDKafkaErrorCode::IllegalGeneration) => Error::Group(err.to_string()),
            _ => Error::Kafka(err),
        }
    }

    /// Whether the operation that produced this error may be retried.
    /// Only transient network failures qualify; authentication, group
    /// membership, and missing-topic errors are surfaced to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
