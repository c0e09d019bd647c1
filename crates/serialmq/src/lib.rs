//! Serial-to-MQTT command bridge.
//!
//! serialmq connects a device speaking STX/ETX-framed text over a serial
//! port to an MQTT broker. Frames from the device are published; messages
//! from the broker become commands that are retried until the device echoes
//! them back.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial port access and reconnect-with-backoff
//! - [`frame`]: STX/ETX framing codec, reader and writer
//! - [`bridge`]: command lifecycle, queues, configuration and the bridge loop
//!   (the MQTT endpoint is behind the `mqtt` feature)

/// Re-export transport types.
pub mod transport {
    pub use serialmq_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serialmq_frame::*;
}

/// Re-export bridge types.
pub mod bridge {
    pub use serialmq_bridge::*;
}
