use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serialmq_frame::Delimiters;
use tracing::{debug, warn};

use crate::command::{Command, RetryPolicy};
use crate::error::{BridgeError, Result};
use crate::queue::BoundedQueue;

/// The pending-command FIFO shared by the messaging handler and the bridge loop.
pub type PendingQueue = Arc<Mutex<BoundedQueue<Command>>>;

/// Lock the pending queue. A panic on another thread cannot leave the queue
/// structurally broken, so a poisoned lock is simply taken over.
pub(crate) fn lock(queue: &PendingQueue) -> MutexGuard<'_, BoundedQueue<Command>> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of handing a messaging payload to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// A command was appended; `depth` is the queue length afterwards.
    Queued { depth: usize },
    /// Empty payloads carry no command and are skipped.
    Ignored,
}

/// Cloneable handle through which the messaging endpoint enqueues commands.
#[derive(Debug, Clone)]
pub struct CommandInbox {
    pub(crate) pending: PendingQueue,
    policy: RetryPolicy,
    delimiters: Delimiters,
}

impl CommandInbox {
    pub(crate) fn new(pending: PendingQueue, policy: RetryPolicy, delimiters: Delimiters) -> Self {
        Self {
            pending,
            policy,
            delimiters,
        }
    }

    /// Turn an inbound messaging payload into a pending command.
    ///
    /// A full queue rejects the command with [`BridgeError::QueueFull`]; it is
    /// never silently dropped.
    pub fn submit(&self, payload: &[u8]) -> Result<Submission> {
        if payload.is_empty() {
            debug!("ignoring empty command payload");
            return Ok(Submission::Ignored);
        }

        let message = std::str::from_utf8(payload).map_err(|_| BridgeError::InvalidPayload)?;
        if let Some(byte) = self.delimiters.collides_with(payload) {
            warn!(%message, "command contains a frame delimiter; rejecting");
            return Err(BridgeError::DelimiterInPayload(byte));
        }

        let mut pending = lock(&self.pending);
        let capacity = pending.capacity();
        if pending.push(Command::new(message, self.policy)).is_err() {
            warn!(%message, capacity, "pending queue full; rejecting command");
            return Err(BridgeError::QueueFull { capacity });
        }

        let depth = pending.len();
        debug!(%message, depth, "command queued");
        Ok(Submission::Queued { depth })
    }

    /// Number of commands waiting, including the one in flight.
    pub fn depth(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}
