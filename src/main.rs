//! Command-line interface for kafka-tap
//!
//! # Usage Examples
//!
//! ```bash
//! # Consume from a local broker and print records
//! kafka-tap consume \
//!   --brokers localhost:9092 \
//!   --topic demo-events \
//!   --group-id demo
//!
//! # Consume from a SASL_PLAINTEXT access point with a composite login
//! KAFKA_SASL_PASSWORD=secret kafka-tap consume \
//!   --brokers broker1:9092,broker2:9092 \
//!   --topic demo-events \
//!   --group-id demo \
//!   --security-protocol SASL_PLAINTEXT \
//!   --sasl-mechanism PLAIN \
//!   --sasl-instance-id ckafka-abc123 \
//!   --sasl-username alice
//!
//! # Bounded run: stop after 100 records or 60 seconds, whichever first
//! kafka-tap consume --brokers localhost:9092 --topic demo-events \
//!   --group-id demo --max-messages 100 --timeout-secs 60
//! ```
//!
//! Each record is printed as `Topic:[T] Partition:[P] Offset:[O] Value:[V]`.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use kafka_tap::ConsumeArgs;
use kafka_tap_consumer::{Backoff, Consumer, Record};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "kafka-tap")]
#[command(about = "SASL-authenticated Kafka consumer that prints consumed records")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume records from a topic and print them
    Consume {
        #[command(flatten)]
        args: ConsumeArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Consume { args } => consume(args).await,
    }
}

async fn consume(args: ConsumeArgs) -> anyhow::Result<()> {
    let config = args.to_config().context("Invalid consumer configuration")?;

    let deadline = args
        .timeout_secs
        .map(|secs| Utc::now() + chrono::Duration::seconds(secs));
    if let Some(deadline) = deadline {
        tracing::info!("Will consume until deadline: {deadline}");
    }

    let consumer = Consumer::connect(config).context("Failed to connect to Kafka")?;
    consumer.subscribe().context("Failed to subscribe to topic")?;

    let mut consumed: u64 = 0;
    let mut uncommitted: Vec<Record> = Vec::new();
    let mut backoff = Backoff::new(consumer.config().retry.clone());

    loop {
        if let Some(deadline) = deadline {
            if Utc::now() >= deadline {
                tracing::info!("Deadline reached, completing consume run");
                break;
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received, shutting down");
                break;
            }
            polled = consumer.poll(Duration::from_millis(500)) => {
                match polled {
                    Ok(Some(record)) => {
                        backoff.reset();
                        println!("{record}");
                        uncommitted.push(record);
                        consumed += 1;

                        if uncommitted.len() >= args.commit_every {
                            consumer
                                .commit(&uncommitted)
                                .await
                                .context("Failed to commit offsets")?;
                            uncommitted.clear();
                        }

                        if let Some(max) = args.max_messages {
                            if consumed >= max {
                                tracing::info!("Reached max_messages limit ({max})");
                                break;
                            }
                        }
                    }
                    // Poll timeout, nothing to do
                    Ok(None) => {}
                    Err(e) if e.is_retryable() => {
                        let delay = backoff.next_delay();
                        tracing::warn!(
                            error = %e,
                            delay_ms = delay.as_millis() as u64,
                            "Transient consumer error, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Err(e) => return Err(e).context("Consumer failed"),
                }
            }
        }
    }

    if !uncommitted.is_empty() {
        consumer
            .commit(&uncommitted)
            .await
            .context("Failed to commit offsets")?;
    }
    consumer.shutdown();

    tracing::info!("Consumed {consumed} records total");
    Ok(())
}
