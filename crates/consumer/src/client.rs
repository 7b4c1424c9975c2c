//! High-level API for spawning consumer tasks.

use crate::backoff::Backoff;
use crate::config::ConsumerConfig;
use crate::consumer::Consumer;
use crate::error::{Error, Result};
use crate::record::Record;
use std::future::Future;
use tokio::task::JoinHandle;

/// Client for creating consumers and running them as supervised tasks.
///
/// Consumers created by one client share the configured consumer group, so
/// spawning several of them makes the broker spread the topic's partitions
/// across them, with each partition processed by exactly one consumer.
pub struct Client {
    config: ConsumerConfig,
}

/// Whether a failed session can be recovered by reconnecting: network
/// failures can, and so can group membership errors, where a fenced member
/// rejoins the group with a fresh consumer.
fn reconnectable(err: &Error) -> bool {
    matches!(err, Error::Network(_) | Error::Group(_))
}

impl Client {
    pub fn new(config: ConsumerConfig) -> Self {
        Self { config }
    }

    /// Connect and subscribe a single consumer.
    pub fn create_consumer(&self) -> Result<Consumer> {
        Self::connect_consumer(&self.config)
    }

    fn connect_consumer(config: &ConsumerConfig) -> Result<Consumer> {
        let consumer = Consumer::connect(config.clone())?;
        consumer.subscribe()?;
        Ok(consumer)
    }

    /// Spawn a task that fetches batches, runs the processor, and commits
    /// offsets after the processor succeeds.
    ///
    /// A failed processor run leaves the batch uncommitted so the records
    /// are redelivered. When the session fails with a network or group
    /// error the task reconnects with backoff; authentication,
    /// configuration, and other fatal errors end the task.
    pub fn spawn_consumer_task<F, Fut>(
        &self,
        batch_size: usize,
        processor: F,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>>
    where
        F: Fn(Vec<Record>) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            let mut backoff = Backoff::new(config.retry.clone());
            loop {
                let consumer = match Self::connect_consumer(&config) {
                    Ok(consumer) => consumer,
                    Err(e) if reconnectable(&e) => {
                        let delay = backoff.next_delay();
                        tracing::warn!(
                            error = %e,
                            delay_ms = delay.as_millis() as u64,
                            "Consumer connect failed, reconnecting"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                backoff.reset();

                let session_err = loop {
                    let records = match consumer.receive_batch(batch_size).await {
                        Ok(records) => records,
                        Err(e) => break e,
                    };

                    if records.is_empty() {
                        continue;
                    }

                    if let Err(e) = processor(records.clone()).await {
                        tracing::error!("Error processing batch: {e}");
                        // Uncommitted records will be redelivered
                        continue;
                    }

                    if let Err(e) = consumer.commit(&records).await {
                        break e;
                    }
                };

                if !reconnectable(&session_err) {
                    return Err(session_err.into());
                }

                consumer.shutdown();
                let delay = backoff.next_delay();
                tracing::warn!(
                    error = %session_err,
                    delay_ms = delay.as_millis() as u64,
                    "Consumer session failed, reconnecting"
                );
                tokio::time::sleep(delay).await;
            }
        });

        Ok(handle)
    }

    /// Spawn multiple consumer tasks in the same consumer group.
    pub fn spawn_consumer_group<F, Fut>(
        &self,
        num_consumers: usize,
        batch_size: usize,
        processor: F,
    ) -> anyhow::Result<Vec<JoinHandle<anyhow::Result<()>>>>
    where
        F: Fn(Vec<Record>) -> Fut + Send + Clone + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let mut handles = Vec::new();

        for _ in 0..num_consumers {
            let handle = self.spawn_consumer_task(batch_size, processor.clone())?;
            handles.push(handle);
        }

        Ok(handles)
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_create_consumer_validates_config() {
        let client = Client::new(ConsumerConfig::new("localhost:9092", "", "g"));
        let err = client.create_consumer().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_spawned_task_ends_on_fatal_config_error() {
        // Invalid config is not reconnectable, so the task must finish with
        // the error instead of looping.
        let client = Client::new(ConsumerConfig::new("", "events", "g"));
        let handle = client
            .spawn_consumer_task(10, |_records| async { anyhow::Ok(()) })
            .unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("task should end on a fatal error")
            .expect("task should not panic");
        assert!(result.is_err());
    }

    #[test]
    fn test_group_errors_are_reconnectable() {
        assert!(reconnectable(&Error::Network("broker down".to_string())));
        assert!(reconnectable(&Error::Group("member fenced".to_string())));
        assert!(!reconnectable(&Error::Authentication("bad creds".to_string())));
        assert!(!reconnectable(&Error::InvalidConfig("empty topic".to_string())));
    }
}
