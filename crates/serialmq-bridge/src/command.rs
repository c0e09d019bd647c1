use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Serial reply that rejects the in-flight command.
pub const INVALID_SENTINEL: &str = "INVALID";

/// Published to the messaging side when a command exhausts its attempts.
pub const TIMEOUT_SENTINEL: &str = "TIMEOUT";

/// How often, and how patiently, a command is retransmitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total transmissions allowed before the command times out.
    pub max_attempts: u32,
    /// Minimum spacing between two transmissions.
    pub wait_time: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            wait_time: Duration::from_secs(5),
        }
    }
}

/// Terminal result of a command, or `Pending` while undecided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Success,
    Failure,
}

/// Observable lifecycle position of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    /// Not transmitted yet.
    Pending,
    /// Transmitted at least once, awaiting an echo.
    InFlight,
    /// Echoed back verbatim.
    Succeeded,
    /// Answered with [`INVALID_SENTINEL`].
    Failed,
    /// All attempts used without an answer.
    TimedOut,
}

/// A messaging-originated command awaiting serial acknowledgement.
///
/// Every time-dependent method takes `now` explicitly; the bridge reads the
/// clock once per cycle and hands the same instant to every transition.
#[derive(Debug, Clone)]
pub struct Command {
    message: String,
    policy: RetryPolicy,
    send_attempts: u32,
    first_sent_at: Option<Instant>,
    last_sent_at: Option<Instant>,
    completed_at: Option<Instant>,
    outcome: Outcome,
}

impl Command {
    pub fn new(message: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            message: message.into(),
            policy,
            send_attempts: 0,
            first_sent_at: None,
            last_sent_at: None,
            completed_at: None,
            outcome: Outcome::Pending,
        }
    }

    /// True before the first send, and afterwards once `wait_time` has elapsed
    /// since the last send. A resend time past the clock's range never arrives.
    pub fn ready_to_send(&self, now: Instant) -> bool {
        match self.last_sent_at {
            None => true,
            Some(last) => last
                .checked_add(self.policy.wait_time)
                .is_some_and(|due| now >= due),
        }
    }

    /// Record a transmission and return the message to put on the wire.
    ///
    /// Returns `None`, changing nothing, when the resend gate is closed or the
    /// command already has an outcome. This is the only place the attempt
    /// counter advances.
    pub fn send(&mut self, now: Instant) -> Option<&str> {
        if self.outcome != Outcome::Pending || !self.ready_to_send(now) {
            return None;
        }

        if self.first_sent_at.is_none() {
            self.first_sent_at = Some(now);
        }
        self.send_attempts = self.send_attempts.saturating_add(1);
        // The gate above guarantees `now >= last_sent_at`.
        self.last_sent_at = Some(now);

        info!(
            message = %self.message,
            attempt = self.send_attempts,
            max_attempts = self.policy.max_attempts,
            "sending command"
        );
        Some(&self.message)
    }

    /// True once the command has been sent `max_attempts` times.
    pub fn attempts_maxed(&self) -> bool {
        let maxed = self.send_attempts >= self.policy.max_attempts;
        if maxed {
            warn!(
                message = %self.message,
                attempts = self.send_attempts,
                "command attempts exhausted"
            );
        }
        maxed
    }

    /// Mark the command successful if `echo` is its own message.
    pub fn matches_success(&mut self, echo: &str, now: Instant) -> bool {
        if self.outcome != Outcome::Pending || echo != self.message {
            return false;
        }
        self.outcome = Outcome::Success;
        self.completed_at = Some(now);

        let elapsed = self
            .first_sent_at
            .map(|first| now.saturating_duration_since(first))
            .unwrap_or_default();
        info!(
            message = %self.message,
            attempts = self.send_attempts,
            elapsed_secs = elapsed.as_secs_f64(),
            "command completed"
        );
        true
    }

    /// Mark the command failed if `echo` is the `INVALID` sentinel.
    pub fn matches_invalid(&mut self, echo: &str, now: Instant) -> bool {
        if self.outcome != Outcome::Pending || echo != INVALID_SENTINEL {
            return false;
        }
        self.outcome = Outcome::Failure;
        self.completed_at = Some(now);
        info!(message = %self.message, "command rejected as invalid; dropping");
        true
    }

    pub fn state(&self) -> CommandState {
        match self.outcome {
            Outcome::Success => CommandState::Succeeded,
            Outcome::Failure => CommandState::Failed,
            Outcome::Pending if self.send_attempts >= self.policy.max_attempts => {
                CommandState::TimedOut
            }
            Outcome::Pending if self.send_attempts > 0 => CommandState::InFlight,
            Outcome::Pending => CommandState::Pending,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn send_attempts(&self) -> u32 {
        self.send_attempts
    }

    pub fn first_sent_at(&self) -> Option<Instant> {
        self.first_sent_at
    }

    pub fn last_sent_at(&self) -> Option<Instant> {
        self.last_sent_at
    }

    pub fn completed_at(&self) -> Option<Instant> {
        self.completed_at
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32, wait_secs: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            wait_time: Duration::from_secs(wait_secs),
        }
    }

    #[test]
    fn ready_on_creation() {
        let cmd = Command::new("M1", policy(3, 5));
        assert!(cmd.ready_to_send(Instant::now()));
        assert_eq!(cmd.state(), CommandState::Pending);
    }

    #[test]
    fn send_closes_gate_until_wait_elapses() {
        let t0 = Instant::now();
        let mut cmd = Command::new("M1", policy(3, 5));

        assert_eq!(cmd.send(t0), Some("M1"));
        assert!(!cmd.ready_to_send(t0));
        assert!(!cmd.ready_to_send(t0 + Duration::from_millis(4_999)));
        assert!(cmd.ready_to_send(t0 + Duration::from_secs(5)));
        assert_eq!(cmd.state(), CommandState::InFlight);
    }

    #[test]
    fn unreachable_resend_time_keeps_gate_closed() {
        let t0 = Instant::now();
        let mut cmd = Command::new(
            "M1",
            RetryPolicy {
                max_attempts: 3,
                wait_time: Duration::MAX,
            },
        );

        assert_eq!(cmd.send(t0), Some("M1"));
        assert!(!cmd.ready_to_send(t0));
        assert_eq!(cmd.send(t0 + Duration::from_secs(3600)), None);
        assert_eq!(cmd.send_attempts(), 1);
    }

    #[test]
    fn send_while_gated_changes_nothing() {
        let t0 = Instant::now();
        let mut cmd = Command::new("M1", policy(3, 5));
        cmd.send(t0);

        assert_eq!(cmd.send(t0 + Duration::from_secs(1)), None);
        assert_eq!(cmd.send_attempts(), 1);
        assert_eq!(cmd.last_sent_at(), Some(t0));
    }

    #[test]
    fn first_sent_at_set_once() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(10);
        let mut cmd = Command::new("M1", policy(3, 5));

        cmd.send(t0);
        cmd.send(t1);

        assert_eq!(cmd.first_sent_at(), Some(t0));
        assert_eq!(cmd.last_sent_at(), Some(t1));
        assert_eq!(cmd.send_attempts(), 2);
    }

    #[test]
    fn attempts_maxed_after_max_sends() {
        let t0 = Instant::now();
        let mut cmd = Command::new("M1", policy(2, 1));

        cmd.send(t0);
        assert!(!cmd.attempts_maxed());
        cmd.send(t0 + Duration::from_secs(1));
        assert!(cmd.attempts_maxed());
        assert_eq!(cmd.state(), CommandState::TimedOut);
    }

    #[test]
    fn echo_marks_success() {
        let t0 = Instant::now();
        let mut cmd = Command::new("M1", policy(3, 5));
        cmd.send(t0);

        assert!(!cmd.matches_success("M2", t0));
        assert!(cmd.matches_success("M1", t0 + Duration::from_millis(200)));
        assert_eq!(cmd.outcome(), Outcome::Success);
        assert_eq!(cmd.completed_at(), Some(t0 + Duration::from_millis(200)));
        assert_eq!(cmd.state(), CommandState::Succeeded);
    }

    #[test]
    fn invalid_marks_failure() {
        let t0 = Instant::now();
        let mut cmd = Command::new("M1", policy(3, 5));
        cmd.send(t0);

        assert!(!cmd.matches_invalid("M1", t0));
        assert!(cmd.matches_invalid(INVALID_SENTINEL, t0));
        assert_eq!(cmd.outcome(), Outcome::Failure);
        assert_eq!(cmd.state(), CommandState::Failed);
    }

    #[test]
    fn outcome_is_set_at_most_once() {
        let t0 = Instant::now();
        let mut cmd = Command::new("M1", policy(3, 5));
        assert!(cmd.matches_invalid(INVALID_SENTINEL, t0));

        assert!(!cmd.matches_success("M1", t0));
        assert_eq!(cmd.outcome(), Outcome::Failure);
        assert_eq!(cmd.send(t0), None);
    }

    #[test]
    fn last_sent_at_never_moves_backwards() {
        let t0 = Instant::now();
        let mut cmd = Command::new("M1", policy(5, 0));
        cmd.send(t0 + Duration::from_secs(2));
        cmd.send(t0 + Duration::from_secs(3));
        assert_eq!(cmd.last_sent_at(), Some(t0 + Duration::from_secs(3)));
    }
}
