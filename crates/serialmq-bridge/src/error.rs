use serialmq_transport::TransportError;

use crate::config::ConfigError;

/// Errors that can occur in bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Serial transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] serialmq_frame::FrameError),

    /// Configuration could not be loaded or is inconsistent.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The pending queue is at capacity; the command was not accepted.
    #[error("pending queue full (capacity {capacity}); command rejected")]
    QueueFull { capacity: usize },

    /// Command payload is not valid UTF-8.
    #[error("command payload is not valid UTF-8")]
    InvalidPayload,

    /// Command payload contains a frame delimiter and cannot be framed.
    #[error("command payload contains frame delimiter byte 0x{0:02x}")]
    DelimiterInPayload(u8),

    /// The messaging endpoint refused a publish.
    #[error("publish failed: {0}")]
    Publish(String),

    /// No serial link is currently open.
    #[error("serial link not connected")]
    Disconnected,
}

impl BridgeError {
    /// True when the serial link must be closed and reopened.
    pub fn is_link_lost(&self) -> bool {
        match self {
            BridgeError::Frame(err) => err.is_link_lost(),
            BridgeError::Transport(TransportError::Io(err)) => {
                serialmq_transport::is_link_lost(err)
            }
            BridgeError::Disconnected => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
