//! Bidirectional bridge between a framed serial device and a message broker.
//!
//! Serial frames are forwarded to the broker as they arrive. Commands
//! received from the broker are queued, written to the device one at a time
//! and retried until the device echoes them back, answers `INVALID`, or the
//! attempt budget runs out (reported as `TIMEOUT`).

pub mod bridge;
pub mod command;
pub mod config;
pub mod error;
pub mod inbox;
#[cfg(feature = "mqtt")]
pub mod mqtt;
pub mod publisher;
pub mod queue;

pub use bridge::{Bridge, TickReport};
pub use command::{Command, CommandState, Outcome, RetryPolicy, INVALID_SENTINEL, TIMEOUT_SENTINEL};
pub use config::{BridgeConfig, ConfigError};
pub use error::{BridgeError, Result};
pub use inbox::{CommandInbox, PendingQueue, Submission};
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttEndpoint, MqttPublisher, MqttWorker};
pub use publisher::{Publisher, QoS};
pub use queue::{BoundedQueue, DEFAULT_QUEUE_CAPACITY};
