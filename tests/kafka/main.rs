//! Consumer client E2E tests
//!
//! Tests for connecting, subscribing, and consuming against a live broker.
//! These are ignored by default because they need a running Kafka cluster.

mod consume;
