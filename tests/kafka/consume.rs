//! End-to-end consume scenarios.
//!
//! Test flow per scenario:
//! 1. Create a uniquely named topic for this run
//! 2. Publish raw test payloads
//! 3. Consume with a fresh or resumed consumer group
//! 4. Assert record contents, offsets, and per-partition ordering
//!
//! Run against a broker with:
//!   KAFKA_BROKERS=localhost:9092 cargo test --test kafka -- --ignored

use kafka_tap::testing::generate_test_id;
use kafka_tap_consumer::{Consumer, ConsumerConfig, Error};
use kafka_tap_producer::TestProducer;
use std::collections::HashMap;
use std::time::Duration;

fn broker() -> String {
    std::env::var("KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("kafka_tap=debug,kafka_tap_consumer=debug")
        .try_init()
        .ok();
}

async fn seed_topic(topic: &str, partitions: i32, payloads: &[&str]) -> anyhow::Result<()> {
    let producer = TestProducer::new(&broker()).await?;
    producer.create_topic_if_not_exists(topic, partitions).await?;

    // Give Kafka a moment to propagate topic metadata
    tokio::time::sleep(Duration::from_millis(500)).await;

    for (i, payload) in payloads.iter().enumerate() {
        let key = format!("key-{i}");
        producer
            .publish(topic, Some(key.as_bytes()), payload.as_bytes())
            .await?;
    }
    Ok(())
}

async fn collect_records(
    consumer: &Consumer,
    count: usize,
) -> anyhow::Result<Vec<kafka_tap_consumer::Record>> {
    let mut records = Vec::with_capacity(count);
    while records.len() < count {
        let record = tokio::time::timeout(Duration::from_secs(15), consumer.next_record())
            .await
            .map_err(|_| anyhow::anyhow!("Timed out waiting for record {}", records.len()))??;
        records.push(record);
    }
    Ok(records)
}

#[tokio::test]
#[ignore = "requires a Kafka broker"]
async fn test_fresh_group_consumes_exactly_published_records() -> anyhow::Result<()> {
    init_tracing();
    let test_id = generate_test_id();
    let topic = format!("tap-e2e-fresh-{test_id}");

    // Single partition so offsets are globally ordered
    seed_topic(&topic, 1, &["alpha", "beta", "gamma"]).await?;

    let config = ConsumerConfig::new(&broker(), &topic, &format!("tap-group-{test_id}"));
    let consumer = Consumer::connect(config)?;
    consumer.subscribe()?;

    let records = collect_records(&consumer, 3).await?;

    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.topic, topic);
        assert_eq!(record.partition, 0);
        assert_eq!(record.offset, i as i64);
    }
    assert_eq!(records[0].value, b"alpha");
    assert_eq!(records[1].value, b"beta");
    assert_eq!(records[2].value, b"gamma");

    // No further records beyond the three published
    let extra = consumer.poll(Duration::from_secs(2)).await?;
    assert!(extra.is_none());

    consumer.commit(&records).await?;
    consumer.shutdown();
    Ok(())
}

#[tokio::test]
#[ignore = "requires a Kafka broker"]
async fn test_partition_offsets_are_monotonic() -> anyhow::Result<()> {
    init_tracing();
    let test_id = generate_test_id();
    let topic = format!("tap-e2e-ordered-{test_id}");

    let payloads: Vec<String> = (0..12).map(|i| format!("event-{i}")).collect();
    let refs: Vec<&str> = payloads.iter().map(String::as_str).collect();
    seed_topic(&topic, 3, &refs).await?;

    let config = ConsumerConfig::new(&broker(), &topic, &format!("tap-group-{test_id}"));
    let consumer = Consumer::connect(config)?;
    consumer.subscribe()?;

    let records = collect_records(&consumer, 12).await?;

    // Within each partition, successive offsets strictly increase
    let mut last_by_partition: HashMap<i32, i64> = HashMap::new();
    for record in &records {
        if let Some(&last) = last_by_partition.get(&record.partition) {
            assert!(
                record.offset > last,
                "offset {} not after {} on partition {}",
                record.offset,
                last,
                record.partition
            );
        }
        last_by_partition.insert(record.partition, record.offset);
    }

    consumer.shutdown();
    Ok(())
}

#[tokio::test]
#[ignore = "requires a Kafka broker"]
async fn test_reconnect_resumes_at_committed_offset() -> anyhow::Result<()> {
    init_tracing();
    let test_id = generate_test_id();
    let topic = format!("tap-e2e-resume-{test_id}");
    let group_id = format!("tap-group-{test_id}");

    seed_topic(&topic, 1, &["one", "two", "three"]).await?;

    // First session: consume all three and commit
    let config = ConsumerConfig::new(&broker(), &topic, &group_id);
    let consumer = Consumer::connect(config.clone())?;
    consumer.subscribe()?;
    let records = collect_records(&consumer, 3).await?;
    consumer.commit(&records).await?;
    consumer.shutdown();

    // Publish two more records after the first session ended
    let producer = TestProducer::new(&broker()).await?;
    producer.publish(&topic, None, b"four").await?;
    producer.publish(&topic, None, b"five").await?;

    // Second session with the same group resumes after the committed offset
    let consumer = Consumer::connect(config)?;
    consumer.subscribe()?;
    let resumed = collect_records(&consumer, 2).await?;

    assert_eq!(resumed[0].offset, 3);
    assert_eq!(resumed[0].value, b"four");
    assert_eq!(resumed[1].offset, 4);
    assert_eq!(resumed[1].value, b"five");

    consumer.shutdown();
    Ok(())
}

#[tokio::test]
#[ignore = "requires a Kafka broker"]
async fn test_subscribe_to_missing_topic_fails() -> anyhow::Result<()> {
    init_tracing();
    let test_id = generate_test_id();

    let config = ConsumerConfig::new(
        &broker(),
        &format!("tap-e2e-missing-{test_id}"),
        &format!("tap-group-{test_id}"),
    );
    let consumer = Consumer::connect(config)?;

    let err = consumer.subscribe().unwrap_err();
    assert!(matches!(err, Error::TopicNotFound(_)), "got {err:?}");
    Ok(())
}

#[tokio::test]
#[ignore = "requires a Kafka broker with a SASL_PLAINTEXT listener"]
async fn test_invalid_password_fails_connect() {
    init_tracing();
    let test_id = generate_test_id();

    let sasl_broker =
        std::env::var("KAFKA_SASL_BROKERS").unwrap_or_else(|_| "localhost:9093".to_string());
    let config = ConsumerConfig::new(
        &sasl_broker,
        "tap-e2e-auth",
        &format!("tap-group-{test_id}"),
    )
    .with_sasl_plain(None, "alice", "wrong-password");

    let err = Consumer::connect(config).unwrap_err();
    assert!(
        matches!(err, Error::Authentication(_)),
        "expected authentication failure, got {err:?}"
    );
}
