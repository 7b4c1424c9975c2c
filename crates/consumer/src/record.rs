use rdkafka::message::{BorrowedMessage as RdkafkaBorrowedMessage, Message as RdkafkaMessage};
use std::fmt;

/// A single record fetched from a topic partition.
///
/// Immutable once fetched. The value is an opaque byte sequence; decoding
/// is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Kafka topic
    pub topic: String,
    /// Kafka partition
    pub partition: i32,
    /// Kafka offset (position within the partition)
    pub offset: i64,
    /// Message key (if any)
    pub key: Option<Vec<u8>>,
    /// Message value as raw bytes. A tombstone (null payload) becomes empty.
    pub value: Vec<u8>,
    /// Message timestamp (milliseconds since epoch)
    pub timestamp: Option<i64>,
}

impl Record {
    pub(crate) fn from_borrowed(msg: &RdkafkaBorrowedMessage<'_>) -> Self {
        Self {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key: msg.key().map(|k| k.to_vec()),
            value: msg.payload().map(|p| p.to_vec()).unwrap_or_default(),
            timestamp: msg.timestamp().to_millis(),
        }
    }

    /// The value interpreted as UTF-8, with invalid sequences replaced.
    pub fn value_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Topic:[{}] Partition:[{}] Offset:[{}] Value:[{}]",
            self.topic,
            self.partition,
            self.offset,
            self.value_lossy()
        )
    }
}
