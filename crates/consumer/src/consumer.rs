//! The consumer client: connection, subscription, and record fetching.

use crate::backoff::Backoff;
use crate::config::{ConsumerConfig, SecurityProtocol};
use crate::error::{Error, Result};
use crate::offsets::OffsetTracker;
use crate::record::Record;
use rdkafka::consumer::{
    CommitMode, Consumer as RdkafkaConsumer, StreamConsumer as RdkafkaStreamConsumer,
};
use rdkafka::{Offset, TopicPartitionList};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// An authenticated consumer bound to one topic and consumer group.
///
/// `connect` opens the broker connection and performs the SASL handshake,
/// `subscribe` joins the consumer group, and records are fetched with
/// `poll`, `next_record`, or `receive_batch`. Offsets observed per
/// partition are checked to be non-decreasing, allowing the replays a
/// group rebalance produces down to the committed offset but nothing
/// below it. The connection and group
/// membership are released when the consumer is dropped; `shutdown`
/// consumes the client so it cannot be polled afterwards.
pub struct Consumer {
    consumer: Arc<RdkafkaStreamConsumer>,
    config: ConsumerConfig,
    offsets: Arc<Mutex<OffsetTracker>>,
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Consumer {
    /// Connect to the broker cluster and perform the authentication
    /// handshake.
    ///
    /// librdkafka connects lazily, so a bounded metadata fetch forces the
    /// handshake here: invalid credentials fail this call with
    /// `Error::Authentication` and an unreachable cluster with
    /// `Error::Network`.
    pub fn connect(config: ConsumerConfig) -> Result<Self> {
        config.validate()?;

        if config.security_protocol == SecurityProtocol::SaslPlaintext {
            warn!("SASL_PLAINTEXT sends credentials over an unencrypted transport");
        }

        info!(
            brokers = %config.brokers,
            topic = %config.topic,
            group_id = %config.group_id,
            security_protocol = %config.security_protocol.as_str(),
            "Connecting consumer"
        );

        let consumer: RdkafkaStreamConsumer =
            config.client_config().create().map_err(Error::from_kafka)?;

        let metadata = consumer
            .fetch_metadata(None, config.connect_timeout)
            .map_err(Error::from_kafka)?;
        debug!(
            brokers = metadata.brokers().len(),
            "Connected to broker cluster"
        );

        Ok(Self {
            consumer: Arc::new(consumer),
            config,
            offsets: Arc::new(Mutex::new(OffsetTracker::new())),
        })
    }

    /// Subscribe to the configured topic, joining the consumer group.
    ///
    /// The topic's existence is probed first so a missing topic fails fast
    /// with `Error::TopicNotFound` instead of stalling in the fetch loop.
    /// With `allow_topic_auto_create` the probe is skipped and the broker
    /// creates the topic on first fetch.
    pub fn subscribe(&self) -> Result<()> {
        if !self.config.allow_topic_auto_create {
            let metadata = self
                .consumer
                .fetch_metadata(Some(&self.config.topic), self.config.connect_timeout)
                .map_err(Error::from_kafka)?;
            let exists = metadata
                .topics()
                .iter()
                .any(|t| t.name() == self.config.topic && !t.partitions().is_empty());
            if !exists {
                return Err(Error::TopicNotFound(self.config.topic.clone()));
            }
        }

        self.consumer
            .subscribe(&[&self.config.topic])
            .map_err(Error::from_kafka)?;

        info!(
            topic = %self.config.topic,
            group_id = %self.config.group_id,
            "Subscribed to topic"
        );
        Ok(())
    }

    /// Fetch one record, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when no record arrived within the timeout.
    pub async fn poll(&self, timeout: Duration) -> Result<Option<Record>> {
        match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Ok(Ok(msg)) => {
                let record = Record::from_borrowed(&msg);
                self.observe(&record).await?;
                Ok(Some(record))
            }
            Ok(Err(e)) => Err(Error::from_kafka(e)),
            Err(_) => Ok(None),
        }
    }

    /// Fetch the next record, suspending until one is available.
    ///
    /// Transient network errors are retried internally with exponential
    /// backoff; authentication, group, and missing-topic errors are
    /// returned. Called in a loop this yields the lazy, unbounded record
    /// sequence of the subscription.
    pub async fn next_record(&self) -> Result<Record> {
        let mut backoff = Backoff::new(self.config.retry.clone());
        loop {
            match self.consumer.recv().await {
                Ok(msg) => {
                    let record = Record::from_borrowed(&msg);
                    self.observe(&record).await?;
                    return Ok(record);
                }
                Err(e) => {
                    let err = Error::from_kafka(e);
                    if !err.is_retryable() {
                        return Err(err);
                    }
                    let delay = backoff.next_delay();
                    warn!(
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "Transient fetch error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Fetch up to `max_count` records, blocking until at least one is
    /// available and then draining whatever arrives promptly.
    pub async fn receive_batch(&self, max_count: usize) -> Result<Vec<Record>> {
        let mut records = Vec::with_capacity(max_count.min(64));
        records.push(self.next_record().await?);

        while records.len() < max_count {
            match self.poll(Duration::from_millis(10)).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => break,
                Err(e) if e.is_retryable() => break,
                Err(e) => return Err(e),
            }
        }

        Ok(records)
    }

    /// Commit the offsets of the given records (offset + 1 per partition).
    ///
    /// Committed positions also become the replay floor: after a group
    /// rebalance the fetch may rewind, but never below the last commit.
    pub async fn commit(&self, records: &[Record]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tpl = TopicPartitionList::new();
        for record in records {
            tpl.add_partition_offset(
                &record.topic,
                record.partition,
                Offset::Offset(record.offset + 1),
            )
            .map_err(Error::from_kafka)?;
        }

        self.consumer
            .commit(&tpl, CommitMode::Sync)
            .map_err(Error::from_kafka)?;

        let mut offsets = self.offsets.lock().await;
        for record in records {
            offsets.record_commit(&record.topic, record.partition, record.offset + 1);
        }

        debug!(records = records.len(), "Committed offsets");
        Ok(())
    }

    /// Last observed offset for a partition of the subscribed topic.
    pub async fn position(&self, partition: i32) -> Option<i64> {
        self.offsets
            .lock()
            .await
            .position(&self.config.topic, partition)
    }

    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    pub fn group_id(&self) -> &str {
        &self.config.group_id
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Leave the consumer group and release the connection.
    ///
    /// Consumes the client: the record sequence is not restartable after
    /// shutdown. Dropping a `Consumer` without calling this still leaves
    /// the group, so the connection is released on abnormal exit paths too.
    pub fn shutdown(self) {
        info!(
            topic = %self.config.topic,
            group_id = %self.config.group_id,
            "Shutting down consumer"
        );
        self.consumer.unsubscribe();
    }

    async fn observe(&self, record: &Record) -> Result<()> {
        self.offsets.lock().await.observe(record)
    }
}

/// Clone support for sharing one subscription across tasks.
impl Clone for Consumer {
    fn clone(&self) -> Self {
        Self {
            consumer: Arc::clone(&self.consumer),
            config: self.config.clone(),
            offsets: Arc::clone(&self.offsets),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_rejects_invalid_config() {
        let config = ConsumerConfig::new("", "events", "g");
        let err = Consumer::connect(config).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_connect_rejects_sasl_without_credentials() {
        let mut config = ConsumerConfig::new("localhost:9092", "events", "g");
        config.security_protocol = SecurityProtocol::SaslPlaintext;
        let err = Consumer::connect(config).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
