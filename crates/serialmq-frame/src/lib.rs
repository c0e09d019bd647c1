//! STX/ETX delimited message framing for serial links.
//!
//! Every message on the wire is a single start byte, the UTF-8 payload, and a
//! single end byte:
//!
//! ```text
//! ┌──────┬──────────────────────┬──────┐
//! │ STX  │ payload (no STX/ETX) │ ETX  │
//! └──────┴──────────────────────┴──────┘
//! ```
//!
//! Bytes outside an open frame are line noise and are discarded. A second STX
//! inside an open frame is kept as payload. The decoder
//! keeps its state between reads, so a frame may arrive across any number of
//! chunks.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    encode_frame, frame_bytes, Delimiters, FrameCodec, FrameConfig, DEFAULT_ETX,
    DEFAULT_MAX_PAYLOAD, DEFAULT_STX,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
