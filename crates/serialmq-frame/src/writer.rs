use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::debug;

use crate::codec::{encode_frame, Delimiters};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Writes complete STX/ETX frames to any `Write` link.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    delimiters: Delimiters,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with the default delimiters.
    pub fn new(inner: T) -> Self {
        Self::with_delimiters(inner, Delimiters::default())
    }

    /// Create a new frame writer with explicit delimiters.
    pub fn with_delimiters(inner: T, delimiters: Delimiters) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            delimiters,
        }
    }

    /// Encode `message` and write the whole frame (blocking).
    pub fn send(&mut self, message: &str) -> Result<()> {
        self.buf.clear();
        encode_frame(self.delimiters, message, &mut self.buf);

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        debug!(bytes = self.buf.len(), "frame written");
        self.flush()
    }

    /// Flush the underlying link.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner link.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn delimiters(&self) -> Delimiters {
        self.delimiters
    }
}
