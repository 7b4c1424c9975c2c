//! Standalone publisher for demo runs of the kafka-tap consumer.
//!
//! Publishes a handful of sample payloads so the consumer has something
//! to print:
//!
//! 1. Start Kafka with Docker:
//!    docker run -d --name kafka -p 9092:9092 apache/kafka:latest
//! 2. Run the producer:
//!    cargo run -p kafka-tap-producer -- --topic demo-events --count 10
//! 3. Run the consumer in another terminal:
//!    cargo run -- consume --brokers localhost:9092 --topic demo-events --group-id demo

use clap::Parser;
use kafka_tap_producer::TestProducer;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "kafka-tap-producer")]
#[command(about = "Publish sample messages for the kafka-tap consumer demo")]
struct Args {
    /// Kafka brokers (comma-separated)
    #[arg(long, env = "KAFKA_BROKERS", default_value = "localhost:9092")]
    brokers: String,

    /// Topic to publish to
    #[arg(long, default_value = "kafka-tap-demo")]
    topic: String,

    /// Number of messages to publish
    #[arg(long, default_value_t = 10)]
    count: u64,

    /// Partition count used when the topic is created
    #[arg(long, default_value_t = 3)]
    partitions: i32,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    match run_main().await {
        Ok(_) => println!("Producer finished successfully"),
        Err(e) => {
            eprintln!("Error: {e:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!(
        "Creating topic '{}' if it doesn't exist...",
        args.topic
    );
    let producer = TestProducer::new(&args.brokers).await?;
    producer
        .create_topic_if_not_exists(&args.topic, args.partitions)
        .await?;

    println!("Publishing {} messages to topic '{}'...", args.count, args.topic);

    for i in 0..args.count {
        let key = format!("key-{i}");
        let payload = format!(
            "sample event {i} published at {}",
            chrono::Utc::now().to_rfc3339()
        );

        let (partition, offset) = producer
            .publish(&args.topic, Some(key.as_bytes()), payload.as_bytes())
            .await?;

        println!(
            "Published message {}: partition={partition} offset={offset}",
            i + 1
        );

        // Small delay between messages
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    println!("\nSuccessfully published {} messages to '{}'", args.count, args.topic);

    Ok(())
}
