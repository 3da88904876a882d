//! Pipeline configuration types.
//!
//! [`PipelineConfig`] is the single source of truth for all startup settings:
//! where the broker lives, which topic events go to, and how large the event
//! queue is.  It is built once by the binary (from CLI flags and environment
//! variables) and validated before anything touches the terminal or network.
//!
//! Keeping configuration as a plain struct (no global state, no environment
//! reads inside the domain) makes the pipeline easy to construct in tests.

use std::time::Duration;

use thiserror::Error;

/// Topic every key event is published to unless overridden.
pub const DEFAULT_TOPIC: &str = "keyboard/arrow";

/// Number of events the queue holds before it starts dropping the newest.
pub const DEFAULT_QUEUE_CAPACITY: usize = 20;

/// Largest queue capacity [`PipelineConfig::validate`] accepts.
pub const MAX_QUEUE_CAPACITY: usize = 65_536;

/// Standard unencrypted MQTT port.
pub const DEFAULT_BROKER_PORT: u16 = 1883;

/// Keep-alive interval advertised to the broker.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Pause between reconnection attempts after the broker connection drops.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Smallest keep-alive the MQTT client accepts.
pub const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);

/// Errors produced by [`PipelineConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,

    #[error("queue capacity {0} exceeds the maximum of 65536")]
    CapacityTooLarge(usize),

    #[error("broker host must not be empty")]
    EmptyHost,

    #[error("topic must not be empty")]
    EmptyTopic,

    /// MQTT forbids `+` and `#` in the topic of a PUBLISH packet.
    #[error("topic {0:?} contains a wildcard character; publish topics must be literal")]
    WildcardTopic(String),

    #[error("client id must not be empty")]
    EmptyClientId,

    #[error("keep-alive of {0:?} is below the 5s minimum")]
    KeepAliveTooShort(Duration),

    #[error("unsupported QoS level {0}; expected 0, 1, or 2")]
    InvalidQos(u8),
}

/// MQTT delivery guarantee used for every publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityOfService {
    /// Fire and forget.  Lowest latency; the default.
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl QualityOfService {
    /// Parses the numeric QoS level used on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidQos`] for anything other than 0, 1, or 2.
    pub fn from_level(level: u8) -> Result<Self, ConfigError> {
        match level {
            0 => Ok(QualityOfService::AtMostOnce),
            1 => Ok(QualityOfService::AtLeastOnce),
            2 => Ok(QualityOfService::ExactlyOnce),
            other => Err(ConfigError::InvalidQos(other)),
        }
    }

    pub fn level(self) -> u8 {
        match self {
            QualityOfService::AtMostOnce => 0,
            QualityOfService::AtLeastOnce => 1,
            QualityOfService::ExactlyOnce => 2,
        }
    }
}

/// All startup configuration for one capture→publish pipeline.
///
/// # Example
///
/// ```rust
/// use arrowkey_core::PipelineConfig;
///
/// let cfg = PipelineConfig::default();
/// assert_eq!(cfg.topic, "keyboard/arrow");
/// assert_eq!(cfg.queue_capacity, 20);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Hostname or IP address of the MQTT broker.
    pub broker_host: String,
    /// TCP port of the MQTT broker.
    pub broker_port: u16,
    /// Keep-alive interval sent in the CONNECT packet.
    pub keep_alive: Duration,
    /// MQTT client identifier.  Brokers disconnect the older session when two
    /// clients share an id, so it should be unique per running publisher.
    pub client_id: String,
    /// Topic each key event is published to.
    pub topic: String,
    /// Maximum number of events waiting to be published.
    pub queue_capacity: usize,
    pub qos: QualityOfService,
    /// Delay before the event loop retries after a connection error.
    pub reconnect_delay: Duration,
}

impl Default for PipelineConfig {
    /// | Field           | Default              |
    /// |-----------------|----------------------|
    /// | broker_host     | `localhost`          |
    /// | broker_port     | `1883`               |
    /// | keep_alive      | 60 seconds           |
    /// | client_id       | `arrowkey-publisher` |
    /// | topic           | `keyboard/arrow`     |
    /// | queue_capacity  | `20`                 |
    /// | qos             | at most once         |
    /// | reconnect_delay | 1 second             |
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: DEFAULT_BROKER_PORT,
            keep_alive: DEFAULT_KEEP_ALIVE,
            client_id: "arrowkey-publisher".to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            qos: QualityOfService::default(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl PipelineConfig {
    /// Checks every field against the constraints the queue and MQTT client
    /// impose.  The first violation found is returned.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] variant describing the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(ConfigError::CapacityTooLarge(self.queue_capacity));
        }
        if self.broker_host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.topic.is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        if self.topic.contains(['+', '#']) {
            return Err(ConfigError::WildcardTopic(self.topic.clone()));
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::EmptyClientId);
        }
        if self.keep_alive < MIN_KEEP_ALIVE {
            return Err(ConfigError::KeepAliveTooShort(self.keep_alive));
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(PipelineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_default_config_matches_documented_values() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.broker_port, 1883);
        assert_eq!(cfg.keep_alive, Duration::from_secs(60));
        assert_eq!(cfg.topic, "keyboard/arrow");
        assert_eq!(cfg.queue_capacity, 20);
        assert_eq!(cfg.qos, QualityOfService::AtMostOnce);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        // Arrange
        let cfg = PipelineConfig {
            queue_capacity: 0,
            ..PipelineConfig::default()
        };

        // Act / Assert
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroCapacity));
    }

    #[test]
    fn test_oversized_capacity_is_rejected() {
        let at_limit = PipelineConfig {
            queue_capacity: MAX_QUEUE_CAPACITY,
            ..PipelineConfig::default()
        };
        let huge = PipelineConfig {
            queue_capacity: usize::MAX,
            ..PipelineConfig::default()
        };

        assert_eq!(at_limit.validate(), Ok(()));
        assert_eq!(
            huge.validate(),
            Err(ConfigError::CapacityTooLarge(usize::MAX))
        );
    }

    #[test]
    fn test_wildcard_topics_are_rejected() {
        for topic in ["keyboard/+", "keyboard/#", "#"] {
            let cfg = PipelineConfig {
                topic: topic.to_string(),
                ..PipelineConfig::default()
            };
            assert_eq!(
                cfg.validate(),
                Err(ConfigError::WildcardTopic(topic.to_string())),
                "topic {topic:?}"
            );
        }
    }

    #[test]
    fn test_empty_fields_are_rejected() {
        let no_host = PipelineConfig {
            broker_host: "  ".to_string(),
            ..PipelineConfig::default()
        };
        let no_topic = PipelineConfig {
            topic: String::new(),
            ..PipelineConfig::default()
        };
        let no_id = PipelineConfig {
            client_id: String::new(),
            ..PipelineConfig::default()
        };

        assert_eq!(no_host.validate(), Err(ConfigError::EmptyHost));
        assert_eq!(no_topic.validate(), Err(ConfigError::EmptyTopic));
        assert_eq!(no_id.validate(), Err(ConfigError::EmptyClientId));
    }

    #[test]
    fn test_short_keep_alive_is_rejected() {
        let cfg = PipelineConfig {
            keep_alive: Duration::from_secs(2),
            ..PipelineConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::KeepAliveTooShort(Duration::from_secs(2)))
        );
    }

    #[test]
    fn test_qos_levels_parse_and_round_trip() {
        for level in 0..=2 {
            let qos = QualityOfService::from_level(level).expect("valid level");
            assert_eq!(qos.level(), level);
        }
        assert_eq!(
            QualityOfService::from_level(3),
            Err(ConfigError::InvalidQos(3))
        );
    }
}
