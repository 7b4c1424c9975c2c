//! Consumer configuration and rdkafka client settings rendering.

use crate::backoff::RetryConfig;
use crate::error::{Error, Result};
use rdkafka::config::ClientConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Security protocol for the broker connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityProtocol {
    /// No encryption or authentication.
    #[default]
    Plaintext,
    /// TLS encryption without SASL.
    Ssl,
    /// SASL authentication over an unencrypted transport.
    SaslPlaintext,
    /// SASL authentication with TLS encryption.
    SaslSsl,
}

impl SecurityProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plaintext => "PLAINTEXT",
            Self::Ssl => "SSL",
            Self::SaslPlaintext => "SASL_PLAINTEXT",
            Self::SaslSsl => "SASL_SSL",
        }
    }

    pub fn requires_sasl(&self) -> bool {
        matches!(self, Self::SaslPlaintext | Self::SaslSsl)
    }
}

impl FromStr for SecurityProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "PLAINTEXT" => Ok(Self::Plaintext),
            "SSL" => Ok(Self::Ssl),
            "SASL_PLAINTEXT" => Ok(Self::SaslPlaintext),
            "SASL_SSL" => Ok(Self::SaslSsl),
            other => Err(Error::InvalidConfig(format!(
                "Invalid security protocol: {other}"
            ))),
        }
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaslMechanism {
    /// Username/password carried in clear text within the SASL exchange.
    #[default]
    Plain,
    ScramSha256,
    ScramSha512,
}

impl SaslMechanism {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::ScramSha256 => "SCRAM-SHA-256",
            Self::ScramSha512 => "SCRAM-SHA-512",
        }
    }
}

impl FromStr for SaslMechanism {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "PLAIN" => Ok(Self::Plain),
            "SCRAM-SHA-256" => Ok(Self::ScramSha256),
            "SCRAM-SHA-512" => Ok(Self::ScramSha512),
            other => Err(Error::InvalidConfig(format!(
                "Invalid SASL mechanism: {other}"
            ))),
        }
    }
}

/// SASL credentials.
///
/// Some managed Kafka offerings identify clients by a composite login of the
/// form `instance_id#username`. When `instance_id` is set, the rendered SASL
/// username is that composite; otherwise the plain username is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaslCredentials {
    pub mechanism: SaslMechanism,
    pub instance_id: Option<String>,
    pub username: String,
    pub password: String,
}

impl SaslCredentials {
    /// The login sent on the wire, composite when an instance id is present.
    pub fn login(&self) -> String {
        match &self.instance_id {
            Some(instance) => format!("{instance}#{}", self.username),
            None => self.username.clone(),
        }
    }
}

/// Configuration for the consumer client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Kafka brokers (comma-separated list of host:port)
    pub brokers: String,
    /// Topic to consume from
    pub topic: String,
    /// Consumer group ID
    pub group_id: String,
    /// Security protocol for the connection
    pub security_protocol: SecurityProtocol,
    /// SASL credentials (required for SASL protocols)
    pub sasl: Option<SaslCredentials>,
    /// Auto offset reset strategy ("earliest" or "latest")
    ///
    /// Applied when the consumer group has no committed offset for a
    /// partition. "earliest" starts from the beginning of the partition,
    /// "latest" from its end.
    pub auto_offset_reset: String,
    /// Session timeout in milliseconds
    pub session_timeout_ms: String,
    /// Enable auto commit (false for manual offset management)
    ///
    /// Manual commit is the default so a batch is committed only after it
    /// has been fully processed.
    pub enable_auto_commit: bool,
    /// Allow broker-side topic auto-creation on subscribe
    ///
    /// When false, subscribing to a missing topic fails with TopicNotFound.
    pub allow_topic_auto_create: bool,
    /// Timeout for the initial connection and metadata probes
    pub connect_timeout: Duration,
    /// Backoff settings for transient fetch errors
    pub retry: RetryConfig,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            topic: "".to_string(),
            group_id: "kafka-tap-consumer".to_string(),
            security_protocol: SecurityProtocol::default(),
            sasl: None,
            auto_offset_reset: "earliest".to_string(),
            session_timeout_ms: "30000".to_string(),
            enable_auto_commit: false,
            allow_topic_auto_create: false,
            connect_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

impl ConsumerConfig {
    pub fn new(brokers: &str, topic: &str, group_id: &str) -> Self {
        Self {
            brokers: brokers.to_string(),
            topic: topic.to_string(),
            group_id: group_id.to_string(),
            ..Default::default()
        }
    }

    /// Configure SASL/PLAIN authentication over an unencrypted transport,
    /// matching the SASL_PLAINTEXT access points of managed Kafka services.
    pub fn with_sasl_plain(
        mut self,
        instance_id: Option<&str>,
        username: &str,
        password: &str,
    ) -> Self {
        self.security_protocol = SecurityProtocol::SaslPlaintext;
        self.sasl = Some(SaslCredentials {
            mechanism: SaslMechanism::Plain,
            instance_id: instance_id.map(str::to_string),
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    /// Configure SASL/SCRAM-SHA-256 over TLS.
    pub fn with_sasl_scram_sha256(mut self, username: &str, password: &str) -> Self {
        self.security_protocol = SecurityProtocol::SaslSsl;
        self.sasl = Some(SaslCredentials {
            mechanism: SaslMechanism::ScramSha256,
            instance_id: None,
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    pub fn with_offset_reset(mut self, policy: &str) -> Self {
        self.auto_offset_reset = policy.to_string();
        self
    }

    pub fn with_topic_auto_create(mut self) -> Self {
        self.allow_topic_auto_create = true;
        self
    }

    /// Check the configuration before a connection is attempted.
    pub fn validate(&self) -> Result<()> {
        if self.brokers.trim().is_empty() {
            return Err(Error::InvalidConfig("brokers must not be empty".to_string()));
        }
        if self.topic.trim().is_empty() {
            return Err(Error::InvalidConfig("topic must not be empty".to_string()));
        }
        if self.group_id.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "group_id must not be empty".to_string(),
            ));
        }
        if !matches!(self.auto_offset_reset.as_str(), "earliest" | "latest") {
            return Err(Error::InvalidConfig(format!(
                "auto_offset_reset must be \"earliest\" or \"latest\", got {:?}",
                self.auto_offset_reset
            )));
        }
        if self.security_protocol.requires_sasl() && self.sasl.is_none() {
            return Err(Error::InvalidConfig(format!(
                "{} requires SASL credentials",
                self.security_protocol.as_str()
            )));
        }
        Ok(())
    }

    /// Render the rdkafka client settings for this configuration.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &self.group_id)
            .set("enable.auto.commit", self.enable_auto_commit.to_string())
            .set("auto.offset.reset", &self.auto_offset_reset)
            .set("session.timeout.ms", &self.session_timeout_ms)
            .set("enable.partition.eof", "false")
            .set("security.protocol", self.security_protocol.as_str());

        if self.allow_topic_auto_create {
            config.set("allow.auto.create.topics", "true");
        }

        if let Some(sasl) = &self.sasl {
            config
                .set("sasl.mechanism", sasl.mechanism.as_str())
                .set("sasl.username", sasl.login())
                .set("sasl.password", &sasl.password);
        }

        config
    }
}
