use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::error::{Result, TransportError};

/// Longest single sleep while waiting out a backoff, so shutdown stays prompt.
const BACKOFF_SLICE: Duration = Duration::from_millis(250);

/// Creates fresh links to a byte device.
///
/// The bridge owns exactly one link at a time. When the link is lost it is
/// dropped and a new one is requested from the connector.
pub trait Connector {
    /// The connected stream type.
    type Link: Read + Write;

    /// Open a new link.
    fn connect(&mut self) -> Result<Self::Link>;

    /// Human-readable target for logs.
    fn describe(&self) -> String;
}

/// Connect, retrying every `backoff` until it succeeds or `running` is cleared.
pub fn connect_with_backoff<C: Connector>(
    connector: &mut C,
    backoff: Duration,
    running: &AtomicBool,
) -> Result<C::Link> {
    let target = connector.describe();
    let mut attempt = 0u32;

    loop {
        if !running.load(Ordering::SeqCst) {
            return Err(TransportError::Shutdown);
        }

        attempt = attempt.saturating_add(1);
        info!(%target, attempt, "connecting to serial device");

        match connector.connect() {
            Ok(link) => {
                info!(%target, attempt, "serial device connected");
                return Ok(link);
            }
            Err(err) => {
                warn!(
                    %target,
                    attempt,
                    error = %err,
                    retry_in_secs = backoff.as_secs_f64(),
                    "serial connect failed"
                );
            }
        }

        sleep_while_running(backoff, running);
    }
}

/// Sleep for `total`, waking every slice to return early once `running` is
/// cleared. A duration past the clock's range sleeps until shutdown.
pub fn sleep_while_running(total: Duration, running: &AtomicBool) {
    let deadline = Instant::now().checked_add(total);
    while running.load(Ordering::SeqCst) {
        let remaining = match deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => BACKOFF_SLICE,
        };
        if remaining.is_zero() {
            return;
        }
        std::thread::sleep(remaining.min(BACKOFF_SLICE));
    }
}

/// Returns true if `err` means the device is gone and the link must be rebuilt.
///
/// Timeouts, interrupted reads and undecodable input are transient: the cycle
/// simply yields no data.
pub fn is_link_lost(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotFound
            | ErrorKind::PermissionDenied
    )
}
