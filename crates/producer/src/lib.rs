//! Kafka producer library for seeding topics consumed by kafka-tap.
//!
//! Provides a thin producer wrapper used by the E2E tests and the
//! standalone publisher binary:
//!
//! - Topic management: create topics with a chosen partition count
//! - Raw byte publishing: values are opaque to the consumer, so the
//!   producer publishes plain byte payloads
//!
//! ```rust,no_run
//! use kafka_tap_producer::TestProducer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let producer = TestProducer::new("localhost:9092").await?;
//!     producer.create_topic_if_not_exists("events", 3).await?;
//!     let (partition, offset) = producer
//!         .publish("events", Some(b"key-1"), b"hello")
//!         .await?;
//!     println!("delivered to partition {partition} at offset {offset}");
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use std::time::Duration;

/// Kafka producer wrapper for seeding test topics.
pub struct TestProducer {
    producer: FutureProducer,
    broker: String,
}

impl TestProducer {
    /// Create a new producer connected to the given broker.
    pub async fn new(broker: &str) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", broker)
            .set("message.timeout.ms", "5000")
            .create()
            .context("Failed to create Kafka producer")?;

        Ok(Self {
            producer,
            broker: broker.to_string(),
        })
    }

    /// Create a topic if it doesn't exist.
    pub async fn create_topic_if_not_exists(&self, topic: &str, partitions: i32) -> Result<()> {
        let admin_client: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &self.broker)
            .create()
            .context("Failed to create admin client")?;

        let new_topic = NewTopic::new(topic, partitions, TopicReplication::Fixed(1));
        let opts = AdminOptions::new().operation_timeout(Some(Duration::from_secs(5)));

        match admin_client.create_topics(&[new_topic], &opts).await {
            Ok(results) => {
                for result in results {
                    match result {
                        Ok(topic_name) => {
                            tracing::info!("Topic '{topic_name}' created successfully");
                        }
                        Err((topic_name, err)) => {
                            if err.to_string().contains("already exists") {
                                tracing::info!("Topic '{topic_name}' already exists");
                            } else {
                                return Err(anyhow::anyhow!("Failed to create topic: {err}"));
                            }
                        }
                    }
                }
            }
            Err(e) => return Err(anyhow::anyhow!("Failed to create topics: {e}")),
        }

        Ok(())
    }

    /// Publish a raw byte payload, returning the delivery (partition, offset).
    pub async fn publish(
        &self,
        topic: &str,
        key: Option<&[u8]>,
        value: &[u8],
    ) -> Result<(i32, i64)> {
        let mut record: FutureRecord<'_, [u8], [u8]> = FutureRecord::to(topic).payload(value);
        if let Some(key) = key {
            record = record.key(key);
        }

        let delivery = self
            .producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(err, _)| err)
            .context("Failed to send message to Kafka")?;
        let (partition, offset) = (delivery.partition, delivery.offset);

        tracing::debug!(topic, partition, offset, "Published message");
        Ok((partition, offset))
    }

    /// Publish a sequence of keyed payloads in order.
    pub async fn publish_batch(
        &self,
        topic: &str,
        messages: &[(Option<Vec<u8>>, Vec<u8>)],
    ) -> Result<Vec<(i32, i64)>> {
        let mut deliveries = Vec::with_capacity(messages.len());
        for (key, value) in messages {
            let delivery = self.publish(topic, key.as_deref(), value).await?;
            deliveries.push(delivery);
        }
        Ok(deliveries)
    }
}
