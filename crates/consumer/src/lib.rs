//! Authenticated Kafka consumer client core for kafka-tap.
//!
//! This crate provides:
//! - Connection and SASL authentication (PLAIN and SCRAM, including the
//!   composite `instance_id#username` logins used by managed Kafka services)
//! - Topic subscription with consumer group membership
//! - Record fetching with per-partition offset ordering checks
//! - Manual offset commits and backoff-based retry of transient errors
//! - Spawning of consumer groups as supervised tasks

/// High-level API for spawning consumer tasks
///
/// Takes the consumer config to create one or more consumers in the same
/// consumer group, each running in its own async task.
pub mod client;

/// The consumer client with offset tracking and manual commits
///
/// Created from a `ConsumerConfig`, either directly or via the client.
pub mod consumer;

pub mod backoff;
pub mod config;
pub mod error;
pub mod offsets;
pub mod record;

pub use backoff::{Backoff, RetryConfig};
pub use client::Client;
pub use config::{ConsumerConfig, SaslCredentials, SaslMechanism, SecurityProtocol};
pub use consumer::Consumer;
pub use error::{Error, Result};
pub use offsets::OffsetTracker;
pub use record::Record;
