//! kafka-tap library
//!
//! An authenticated Kafka consumer client with a record-printing CLI.
//!
//! # Features
//!
//! - SASL authentication: PLAIN and SCRAM mechanisms, including the
//!   composite `instance_id#username` logins used by managed Kafka services
//! - Reliable consumption: per-partition offset ordering checks, manual
//!   commits, and backoff-based retry of transient network errors
//! - Cooperative shutdown: Ctrl-C, `--timeout`, or `--max-messages` end the
//!   run and leave the consumer group cleanly
//!
//! # CLI Usage
//!
//! ```bash
//! # Consume from a local broker without authentication
//! kafka-tap consume --brokers localhost:9092 --topic events --group-id demo
//!
//! # Consume from a SASL_PLAINTEXT access point with a composite login
//! kafka-tap consume --brokers broker:9092 --topic events --group-id demo \
//!   --security-protocol SASL_PLAINTEXT --sasl-mechanism PLAIN \
//!   --sasl-instance-id ckafka-abc123 --sasl-username alice
//! ```

use clap::Parser;
use kafka_tap_consumer::{
    ConsumerConfig, Result, SaslCredentials, SaslMechanism, SecurityProtocol,
};

pub mod testing;

/// Options for the `consume` command.
#[derive(Parser, Clone, Debug)]
pub struct ConsumeArgs {
    /// Kafka brokers (comma-separated or multiple --brokers)
    #[arg(long, value_delimiter = ',', required = true)]
    pub brokers: Vec<String>,

    /// Topic to consume from
    #[arg(long)]
    pub topic: String,

    /// Consumer group ID
    #[arg(long)]
    pub group_id: String,

    /// Security protocol (PLAINTEXT, SSL, SASL_PLAINTEXT, SASL_SSL)
    #[arg(long, default_value = "PLAINTEXT")]
    pub security_protocol: String,

    /// SASL mechanism (PLAIN, SCRAM-SHA-256, SCRAM-SHA-512)
    #[arg(long, default_value = "PLAIN")]
    pub sasl_mechanism: String,

    /// Instance ID prefixed to the SASL username as `instance_id#username`
    #[arg(long)]
    pub sasl_instance_id: Option<String>,

    /// SASL username
    #[arg(long, env = "KAFKA_SASL_USERNAME")]
    pub sasl_username: Option<String>,

    /// SASL password
    #[arg(long, env = "KAFKA_SASL_PASSWORD")]
    pub sasl_password: Option<String>,

    /// Auto offset reset strategy ("earliest" or "latest")
    #[arg(long, default_value = "earliest")]
    pub auto_offset_reset: String,

    /// Session timeout in milliseconds
    #[arg(long, default_value = "30000")]
    pub session_timeout_ms: String,

    /// Allow broker-side topic auto-creation on subscribe
    #[arg(long)]
    pub allow_topic_auto_create: bool,

    /// Commit offsets after this many printed records
    #[arg(long, default_value_t = 100)]
    pub commit_every: usize,

    /// Stop after consuming this many records (default: run indefinitely)
    #[arg(long)]
    pub max_messages: Option<u64>,

    /// Stop after this many seconds (default: run indefinitely)
    #[arg(long)]
    pub timeout_secs: Option<i64>,
}

impl ConsumeArgs {
    /// Build the consumer configuration from the CLI options.
    pub fn to_config(&self) -> Result<ConsumerConfig> {
        let security_protocol: SecurityProtocol = self.security_protocol.parse()?;

        let sasl = if security_protocol.requires_sasl() {
            let mechanism: SaslMechanism = self.sasl_mechanism.parse()?;
            let username = self.sasl_username.clone().ok_or_else(|| {
                kafka_tap_consumer::Error::InvalidConfig(
                    "SASL username required (--sasl-username or KAFKA_SASL_USERNAME)".to_string(),
                )
            })?;
            let password = self.sasl_password.clone().ok_or_else(|| {
                kafka_tap_consumer::Error::InvalidConfig(
                    "SASL password required (--sasl-password or KAFKA_SASL_PASSWORD)".to_string(),
                )
            })?;
            Some(SaslCredentials {
                mechanism,
                instance_id: self.sasl_instance_id.clone(),
                username,
                password,
            })
        } else {
            None
        };

        let mut config = ConsumerConfig::new(&self.brokers.join(","), &self.topic, &self.group_id)
            .with_offset_reset(&self.auto_offset_reset);
        config.security_protocol = security_protocol;
        config.sasl = sasl;
        config.session_timeout_ms = self.session_timeout_ms.clone();
        config.allow_topic_auto_create = self.allow_topic_auto_create;
        config.validate()?;

        Ok(config)
    }
}
