//! Serial link abstraction for serialmq.
//!
//! Provides the byte source/sink the bridge talks to:
//! - [`SerialLink`], a `Read + Write` wrapper over a `serialport` device
//! - [`Connector`], the seam used to (re)create links after a device drop
//! - [`connect_with_backoff`], the fixed-interval reconnect procedure
//!
//! This is the lowest layer of serialmq. Framing and the bridge build on top
//! of any `Read + Write` link, so tests can substitute in-memory doubles.

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{available_ports, PortInfo, SerialConnector, SerialLink, SerialSettings};
pub use traits::{connect_with_backoff, is_link_lost, sleep_while_running, Connector};
