use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::error::Result;

/// Delivery guarantee requested from the messaging endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QoS {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl TryFrom<u8> for QoS {
    type Error = ConfigError;

    fn try_from(value: u8) -> std::result::Result<Self, ConfigError> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(ConfigError::InvalidQos(other)),
        }
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> u8 {
        match qos {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

/// Outbound side of the messaging endpoint.
///
/// Implementations must not block the bridge loop: a publish is handed to a
/// client that buffers internally and the call returns immediately.
pub trait Publisher {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<()>;
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<()> {
        (**self).publish(topic, payload, qos)
    }
}
