/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device.
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// Failed to enumerate serial devices.
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(serialport::Error),

    /// An I/O error occurred on the serial link.
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reconnection was abandoned because shutdown was requested.
    #[error("transport shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
