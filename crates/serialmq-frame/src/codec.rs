use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::error::{FrameError, Result};

/// ASCII start-of-text.
pub const DEFAULT_STX: u8 = 0x02;

/// ASCII end-of-text.
pub const DEFAULT_ETX: u8 = 0x03;

/// Default cap on a single in-progress payload: 64 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// The pair of single-byte frame delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub stx: u8,
    pub etx: u8,
}

impl Delimiters {
    /// Build a delimiter pair. STX and ETX must differ.
    pub fn new(stx: u8, etx: u8) -> Result<Self> {
        if stx == etx {
            return Err(FrameError::InvalidDelimiters(stx));
        }
        Ok(Self { stx, etx })
    }

    /// First delimiter byte found in `message`, if any. Such a message cannot
    /// be framed without corrupting the stream.
    pub fn collides_with(&self, message: &[u8]) -> Option<u8> {
        message
            .iter()
            .copied()
            .find(|&b| b == self.stx || b == self.etx)
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            stx: DEFAULT_STX,
            etx: DEFAULT_ETX,
        }
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Delimiter bytes.
    pub delimiters: Delimiters,
    /// Largest payload accumulated before an unterminated frame is abandoned.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// Stateful STX/ETX decoder and stateless encoder.
///
/// The "inside frame" flag and the accumulator live here, not in the caller,
/// so a frame split across several serial reads is reassembled.
#[derive(Debug)]
pub struct FrameCodec {
    config: FrameConfig,
    in_frame: bool,
    buf: BytesMut,
}

impl FrameCodec {
    /// Create a codec with default size limits.
    pub fn new(delimiters: Delimiters) -> Self {
        Self::with_config(FrameConfig {
            delimiters,
            ..FrameConfig::default()
        })
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            config,
            in_frame: false,
            buf: BytesMut::new(),
        }
    }

    /// Decode a chunk, returning every payload whose ETX appeared in it, in order.
    ///
    /// An empty chunk means "no data this cycle" and yields nothing.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut frames = Vec::new();
        for &byte in chunk {
            if let Some(payload) = self.push_byte(byte) {
                frames.push(payload);
            }
        }
        frames
    }

    /// Append `STX ‖ message ‖ ETX` to `dst`.
    ///
    /// No escaping is performed: callers must not send messages that contain
    /// the delimiter bytes (see [`Delimiters::collides_with`]).
    pub fn encode(&self, message: &str, dst: &mut BytesMut) {
        encode_frame(self.config.delimiters, message, dst);
    }

    /// Drop any partially received frame.
    pub fn reset(&mut self) {
        if self.in_frame || !self.buf.is_empty() {
            debug!(discarded = self.buf.len(), "discarding partial frame");
        }
        self.in_frame = false;
        self.buf.clear();
    }

    /// True while an STX has been seen without its ETX.
    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    /// Number of payload bytes accumulated for the open frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn delimiters(&self) -> Delimiters {
        self.config.delimiters
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Feed one byte; returns a payload when this byte closed a frame.
    pub(crate) fn push_byte(&mut self, byte: u8) -> Option<String> {
        let Delimiters { stx, etx } = self.config.delimiters;
        trace!(byte, "serial byte");

        if !self.in_frame {
            if byte == stx {
                self.in_frame = true;
            }
            return None;
        }

        if byte == etx {
            self.in_frame = false;
            let raw = self.buf.split().freeze();
            return match String::from_utf8(raw.to_vec()) {
                Ok(payload) => {
                    debug!(%payload, "frame decoded");
                    Some(payload)
                }
                Err(err) => {
                    warn!(len = raw.len(), error = %err, "dropping frame with invalid UTF-8");
                    None
                }
            };
        }

        // A repeated STX inside an open frame is ordinary payload.
        if self.buf.len() >= self.config.max_payload_size {
            warn!(
                max = self.config.max_payload_size,
                "unterminated frame exceeded payload limit; resynchronising"
            );
            self.reset();
            return None;
        }

        self.buf.put_u8(byte);
        None
    }
}

/// Encode `message` between the delimiters, appending to `dst`.
pub fn encode_frame(delimiters: Delimiters, message: &str, dst: &mut BytesMut) {
    dst.reserve(message.len() + 2);
    dst.put_u8(delimiters.stx);
    dst.put_slice(message.as_bytes());
    dst.put_u8(delimiters.etx);
}

/// Encode `message` into a standalone frame.
pub fn frame_bytes(delimiters: Delimiters, message: &str) -> Bytes {
    let mut dst = BytesMut::with_capacity(message.len() + 2);
    encode_frame(delimiters, message, &mut dst);
    dst.freeze()
}

#[cfg(feature = "async")]
mod tokio_codec {
    use bytes::{Buf, BytesMut};
    use tokio_util::codec::{Decoder, Encoder};

    use super::{encode_frame, FrameCodec};
    use crate::error::FrameError;

    impl Decoder for FrameCodec {
        type Item = String;
        type Error = FrameError;

        fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, FrameError> {
            while src.has_remaining() {
                let byte = src.get_u8();
                if let Some(payload) = self.push_byte(byte) {
                    return Ok(Some(payload));
                }
            }
            Ok(None)
        }
    }

    impl<'a> Encoder<&'a str> for FrameCodec {
        type Error = FrameError;

        fn encode(&mut self, item: &'a str, dst: &mut BytesMut) -> Result<(), FrameError> {
            encode_frame(self.config.delimiters, item, dst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STX: u8 = DEFAULT_STX;
    const ETX: u8 = DEFAULT_ETX;

    fn codec() -> FrameCodec {
        FrameCodec::new(Delimiters::default())
    }

    #[test]
    fn test_two_frames_in_one_chunk_keep_order() {
        let mut codec = codec();
        let frames = codec.decode(&[STX, b'A', ETX, STX, b'B', ETX]);
        assert_eq!(frames, vec!["A".to_string(), "B".to_string()]);
        assert!(!codec.in_frame());
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut codec = codec();
        assert!(codec.decode(&[STX, b'H', b'e']).is_empty());
        assert!(codec.in_frame());
        assert_eq!(codec.buffered(), 2);
        assert!(codec.decode(b"ll").is_empty());
        assert_eq!(codec.decode(&[b'o', ETX]), vec!["Hello".to_string()]);
    }

    #[test]
    fn test_order_independent_of_chunking() {
        let mut wire = BytesMut::new();
        for msg in ["one", "two", "three", "four"] {
            encode_frame(Delimiters::default(), msg, &mut wire);
        }

        for chunk_size in 1..=wire.len() {
            let mut codec = codec();
            let decoded: Vec<String> = wire
                .chunks(chunk_size)
                .flat_map(|chunk| codec.decode(chunk))
                .collect();
            assert_eq!(decoded, ["one", "two", "three", "four"], "chunk size {chunk_size}");
        }
    }

    #[test]
    fn test_noise_outside_frames_is_discarded() {
        let mut codec = codec();
        let frames = codec.decode(&[b'x', b'y', ETX, STX, b'o', b'k', ETX, b'z']);
        assert_eq!(frames, vec!["ok".to_string()]);
        assert_eq!(codec.buffered(), 0);
    }

    #[test]
    fn test_nested_stx_is_kept_in_payload() {
        let mut codec = codec();
        let frames = codec.decode(&[STX, b'a', b'b', STX, b'c', ETX]);
        assert_eq!(frames, vec!["ab\u{2}c".to_string()]);

        let frames = codec.decode(&[STX, b'a', STX, b'b', ETX]);
        assert_eq!(frames, vec!["a\u{2}b".to_string()]);
    }

    #[test]
    fn test_empty_chunk_yields_nothing() {
        let mut codec = codec();
        assert!(codec.decode(&[]).is_empty());
        assert!(!codec.in_frame());
    }

    #[test]
    fn test_empty_payload_frame() {
        let mut codec = codec();
        assert_eq!(codec.decode(&[STX, ETX]), vec![String::new()]);
    }

    #[test]
    fn test_invalid_utf8_frame_is_dropped() {
        let mut codec = codec();
        let frames = codec.decode(&[STX, 0xff, 0xfe, ETX, STX, b'o', b'k', ETX]);
        assert_eq!(frames, vec!["ok".to_string()]);
    }

    #[test]
    fn test_multibyte_payload_split_mid_character() {
        let mut wire = BytesMut::new();
        encode_frame(Delimiters::default(), "température", &mut wire);
        let mut codec = codec();

        // Split between the two bytes of 'é'.
        let split = 1 + "temp".len() + 1;
        assert!(codec.decode(&wire[..split]).is_empty());
        assert_eq!(codec.decode(&wire[split..]), vec!["température".to_string()]);
    }

    #[test]
    fn test_encode_wraps_message() {
        let mut dst = BytesMut::new();
        codec().encode("M1", &mut dst);
        assert_eq!(dst.as_ref(), &[STX, b'M', b'1', ETX]);
    }

    #[test]
    fn test_encode_decode_reproduces_wire_frame() {
        let wire = frame_bytes(Delimiters::default(), "SET 42");
        let mut codec = codec();
        let decoded = codec.decode(&wire);
        assert_eq!(decoded, vec!["SET 42".to_string()]);
        assert_eq!(frame_bytes(Delimiters::default(), &decoded[0]), wire);
    }

    #[test]
    fn test_custom_delimiters() {
        let delimiters = Delimiters::new(b'<', b'>').unwrap();
        let mut codec = FrameCodec::new(delimiters);
        assert_eq!(codec.decode(b"..<ping>.."), vec!["ping".to_string()]);
        assert_eq!(frame_bytes(delimiters, "pong").as_ref(), b"<pong>");
    }

    #[test]
    fn test_identical_delimiters_rejected() {
        let err = Delimiters::new(0x02, 0x02).unwrap_err();
        assert!(matches!(err, FrameError::InvalidDelimiters(0x02)));
    }

    #[test]
    fn test_collision_detection() {
        let delimiters = Delimiters::default();
        assert_eq!(delimiters.collides_with(b"bad\x03"), Some(ETX));
        assert_eq!(delimiters.collides_with(b"\x02bad"), Some(STX));
        assert_eq!(delimiters.collides_with(b"fine"), None);
    }

    #[test]
    fn test_oversized_frame_resynchronises() {
        let mut codec = FrameCodec::with_config(FrameConfig {
            max_payload_size: 4,
            ..FrameConfig::default()
        });
        let frames = codec.decode(&[STX, b'1', b'2', b'3', b'4', b'5', ETX, STX, b'o', b'k', ETX]);
        assert_eq!(frames, vec!["ok".to_string()]);
    }

    #[test]
    fn test_reset_discards_partial_frame() {
        let mut codec = codec();
        codec.decode(&[STX, b'p', b'a']);
        codec.reset();
        assert!(!codec.in_frame());
        assert!(codec.decode(&[b'r', b't', ETX]).is_empty());
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_tokio_framed_read_and_write() {
        use futures_util::{SinkExt, StreamExt};
        use tokio_util::codec::{FramedRead, FramedWrite};

        let wire: &[u8] = &[b'~', STX, b'A', ETX, STX, b'B', b'C', ETX];
        let mut framed = FramedRead::new(wire, codec());
        assert_eq!(framed.next().await.unwrap().unwrap(), "A");
        assert_eq!(framed.next().await.unwrap().unwrap(), "BC");
        assert!(framed.next().await.is_none());

        let mut sink = FramedWrite::new(Vec::new(), codec());
        sink.send("hi").await.unwrap();
        assert_eq!(sink.get_ref().as_slice(), &[STX, b'h', b'i', ETX]);
    }
}
