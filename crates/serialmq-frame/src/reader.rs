use std::io::{ErrorKind, Read};

use tracing::debug;

use crate::codec::{FrameCodec, FrameConfig};
use crate::error::{FrameError, Result};

/// Upper bound on bytes pulled from the link per poll.
pub const READ_CHUNK_SIZE: usize = 1024;

/// Pulls bytes from a `Read` link and decodes them into frame payloads.
///
/// Each [`poll_frames`](Self::poll_frames) call performs a single read, so the
/// caller's loop is never blocked for longer than the link's read timeout.
pub struct FrameReader<T> {
    inner: T,
    codec: FrameCodec,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self::with_codec(inner, FrameCodec::with_config(config))
    }

    /// Wrap a link with an existing codec, keeping any partial frame it holds.
    pub fn with_codec(inner: T, codec: FrameCodec) -> Self {
        Self { inner, codec }
    }

    /// Read whatever is available and return the payloads it completed.
    ///
    /// Timeouts and interrupted reads are "no data this cycle" and yield an
    /// empty vector. End-of-stream is reported as
    /// [`FrameError::ConnectionClosed`]; other I/O errors are returned for the
    /// caller to classify with [`FrameError::is_link_lost`].
    pub fn poll_frames(&mut self) -> Result<Vec<String>> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let read = match self.inner.read(&mut chunk) {
            Ok(n) => n,
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                return Ok(Vec::new());
            }
            Err(err) => return Err(FrameError::Io(err)),
        };

        if read == 0 {
            return Err(FrameError::ConnectionClosed);
        }

        debug!(bytes = read, "serial chunk received");
        Ok(self.codec.decode(&chunk[..read]))
    }

    /// Borrow the codec (for decoder state inspection).
    pub fn codec(&self) -> &FrameCodec {
        &self.codec
    }

    /// Mutably borrow the codec.
    pub fn codec_mut(&mut self) -> &mut FrameCodec {
        &mut self.codec
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the link and the codec.
    pub fn into_parts(self) -> (T, FrameCodec) {
        (self.inner, self.codec)
    }
}
