/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Start and end delimiters must be distinct bytes.
    #[error("invalid delimiters: STX and ETX are both 0x{0:02x}")]
    InvalidDelimiters(u8),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link reported end-of-stream; the device is gone.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True when the underlying link must be torn down and reopened.
    pub fn is_link_lost(&self) -> bool {
        match self {
            FrameError::ConnectionClosed => true,
            FrameError::Io(err) => serialmq_transport::is_link_lost(err),
            FrameError::InvalidDelimiters(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
