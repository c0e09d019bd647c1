use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialmq_frame::{Delimiters, DEFAULT_ETX, DEFAULT_STX};
use serialmq_transport::SerialSettings;
use tracing::{debug, info, warn};

use crate::command::RetryPolicy;
use crate::publisher::QoS;
use crate::queue::DEFAULT_QUEUE_CAPACITY;

/// Upper bound for every configured duration: one day.
const MAX_SECONDS: u64 = 86_400;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The document is not valid YAML for this schema.
    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        source: serde_yaml::Error,
    },

    /// A value is out of range or inconsistent with another value.
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// MQTT QoS level outside 0..=2.
    #[error("invalid MQTT QoS {0} (expected 0, 1 or 2)")]
    InvalidQos(u8),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Runtime settings for the bridge, read once at startup.
///
/// Field names match the keys of the YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub serial_port: String,
    pub serial_baud: u32,
    /// Read timeout in seconds.
    pub serial_timeout: f64,
    #[serde(rename = "serial_STX")]
    pub serial_stx: u8,
    #[serde(rename = "serial_ETX")]
    pub serial_etx: u8,
    pub mqtt_ip: String,
    pub mqtt_port: u16,
    /// Broker keep-alive in seconds.
    pub mqtt_timeout: u64,
    pub mqtt_publish_channel: String,
    pub mqtt_subscribe_channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mqtt_client_id: Option<String>,
    pub mqtt_qos: QoS,
    pub max_retry_attempts: u32,
    pub wait_time_seconds: f64,
    pub queue_capacity: usize,
    pub poll_interval_ms: u64,
    pub serial_reconnect_seconds: u64,
    pub mqtt_reconnect_seconds: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            serial_port: "/dev/ttyUSB0".to_string(),
            serial_baud: 9600,
            serial_timeout: 0.1,
            serial_stx: DEFAULT_STX,
            serial_etx: DEFAULT_ETX,
            mqtt_ip: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_timeout: 60,
            mqtt_publish_channel: "serial/out".to_string(),
            mqtt_subscribe_channel: "serial/in".to_string(),
            mqtt_client_id: None,
            mqtt_qos: QoS::AtMostOnce,
            max_retry_attempts: 3,
            wait_time_seconds: 5.0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            poll_interval_ms: 100,
            serial_reconnect_seconds: 15,
            mqtt_reconnect_seconds: 5,
        }
    }
}

impl BridgeConfig {
    /// Load and validate a YAML file.
    ///
    /// A missing file is not an error: a warning is logged and the defaults
    /// are used.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found; using defaults");
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config = Self::parse(&text, &path.display().to_string())?;
        config.log_loaded();
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Self::parse(text, "<inline>")
    }

    fn parse(text: &str, origin: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty mapping.
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
                origin: origin.to_string(),
                source,
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.serial_port.trim().is_empty() {
            return Err(invalid("serial_port", "must not be empty"));
        }
        if self.serial_baud == 0 {
            return Err(invalid("serial_baud", "must be greater than zero"));
        }
        positive_seconds("serial_timeout", self.serial_timeout)?;
        Delimiters::new(self.serial_stx, self.serial_etx)
            .map_err(|err| invalid("serial_STX", err.to_string()))?;
        if self.mqtt_ip.trim().is_empty() {
            return Err(invalid("mqtt_ip", "must not be empty"));
        }
        if self.mqtt_port == 0 {
            return Err(invalid("mqtt_port", "must be greater than zero"));
        }
        if self.mqtt_timeout == 0 || self.mqtt_timeout > u64::from(u16::MAX) {
            return Err(invalid("mqtt_timeout", "must be between 1 and 65535 seconds"));
        }
        if self.mqtt_publish_channel.trim().is_empty() {
            return Err(invalid("mqtt_publish_channel", "must not be empty"));
        }
        if self.mqtt_subscribe_channel.trim().is_empty() {
            return Err(invalid("mqtt_subscribe_channel", "must not be empty"));
        }
        if self.max_retry_attempts == 0 {
            return Err(invalid("max_retry_attempts", "must be at least 1"));
        }
        positive_seconds("wait_time_seconds", self.wait_time_seconds)?;
        if self.queue_capacity == 0 {
            return Err(invalid("queue_capacity", "must be at least 1"));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "must be at least 1"));
        }
        bounded_seconds("serial_reconnect_seconds", self.serial_reconnect_seconds)?;
        bounded_seconds("mqtt_reconnect_seconds", self.mqtt_reconnect_seconds)?;
        Ok(())
    }

    pub fn delimiters(&self) -> Result<Delimiters> {
        Delimiters::new(self.serial_stx, self.serial_etx)
            .map_err(|err| invalid("serial_STX", err.to_string()))
    }

    pub fn serial_settings(&self) -> SerialSettings {
        SerialSettings::new(self.serial_port.clone(), self.serial_baud)
            .with_timeout(seconds(self.serial_timeout))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retry_attempts,
            wait_time: seconds(self.wait_time_seconds),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn serial_reconnect_backoff(&self) -> Duration {
        Duration::from_secs(self.serial_reconnect_seconds)
    }

    pub fn mqtt_reconnect_backoff(&self) -> Duration {
        Duration::from_secs(self.mqtt_reconnect_seconds)
    }

    pub fn mqtt_keep_alive(&self) -> Duration {
        Duration::from_secs(self.mqtt_timeout)
    }

    /// Client identifier presented to the broker.
    pub fn client_id(&self) -> String {
        self.mqtt_client_id
            .clone()
            .unwrap_or_else(|| format!("serialmq-{}", std::process::id()))
    }

    fn log_loaded(&self) {
        debug!(
            serial_port = %self.serial_port,
            serial_baud = self.serial_baud,
            serial_timeout = self.serial_timeout,
            stx = self.serial_stx,
            etx = self.serial_etx,
            "serial settings loaded"
        );
        debug!(
            mqtt_ip = %self.mqtt_ip,
            mqtt_port = self.mqtt_port,
            publish = %self.mqtt_publish_channel,
            subscribe = %self.mqtt_subscribe_channel,
            qos = u8::from(self.mqtt_qos),
            "mqtt settings loaded"
        );
        debug!(
            max_retry_attempts = self.max_retry_attempts,
            wait_time_seconds = self.wait_time_seconds,
            queue_capacity = self.queue_capacity,
            "retry settings loaded"
        );
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn positive_seconds(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 || Duration::try_from_secs_f64(value).is_err() {
        return Err(invalid(field, format!("{value} is not a positive number of seconds")));
    }
    if value > MAX_SECONDS as f64 {
        return Err(invalid(field, format!("must be at most {MAX_SECONDS} seconds")));
    }
    Ok(())
}

fn bounded_seconds(field: &'static str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(invalid(field, "must be at least 1"));
    }
    if value > MAX_SECONDS {
        return Err(invalid(field, format!("must be at most {MAX_SECONDS} seconds")));
    }
    Ok(())
}

/// Only called on validated values.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}
