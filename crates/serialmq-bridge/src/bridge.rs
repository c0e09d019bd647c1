use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serialmq_frame::{Delimiters, FrameCodec, FrameConfig, FrameReader, FrameWriter};
use serialmq_transport::{connect_with_backoff, Connector, TransportError};
use tracing::{debug, error, info, warn};

use crate::command::{Command, Outcome, RetryPolicy, TIMEOUT_SENTINEL};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::inbox::{lock, CommandInbox, PendingQueue};
use crate::publisher::{Publisher, QoS};
use crate::queue::BoundedQueue;

/// What a single cycle did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Serial frames published to the messaging side.
    pub forwarded: usize,
    /// Pending commands acknowledged by their echo.
    pub completed: usize,
    /// Pending commands answered with `INVALID`.
    pub failed: usize,
    /// Pending commands dropped after exhausting their attempts.
    pub timed_out: usize,
    /// Whether the pending head was written to the serial link.
    pub transmitted: bool,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        *self == TickReport::default()
    }
}

/// Head-of-queue decision taken under the lock and acted on after release.
enum HeadAction {
    Idle,
    Expired(Command),
    Transmit(String),
}

/// Serial/messaging bridge.
///
/// Owns the serial link (through its connector), the frame decoder state,
/// the inbound frame queue and the pending command queue. Only the head of
/// the pending queue is ever transmitted or correlated, so at most one
/// command is in flight.
pub struct Bridge<C: Connector, P> {
    connector: C,
    reader: Option<FrameReader<C::Link>>,
    frame_config: FrameConfig,
    inbound: BoundedQueue<String>,
    pending: PendingQueue,
    publisher: P,
    publish_topic: String,
    qos: QoS,
    policy: RetryPolicy,
    poll_interval: Duration,
    reconnect_backoff: Duration,
}

impl<C: Connector, P: Publisher> Bridge<C, P> {
    /// Build a bridge from validated configuration. The link is not opened
    /// until [`connect`](Self::connect) or [`run`](Self::run).
    pub fn new(connector: C, publisher: P, config: &BridgeConfig) -> Result<Self> {
        config.validate()?;
        let frame_config = FrameConfig {
            delimiters: config.delimiters()?,
            ..FrameConfig::default()
        };

        Ok(Self {
            connector,
            reader: None,
            frame_config,
            inbound: BoundedQueue::new(config.queue_capacity),
            pending: Arc::new(Mutex::new(BoundedQueue::new(config.queue_capacity))),
            publisher,
            publish_topic: config.mqtt_publish_channel.clone(),
            qos: config.mqtt_qos,
            policy: config.retry_policy(),
            poll_interval: config.poll_interval(),
            reconnect_backoff: config.serial_reconnect_backoff(),
        })
    }

    /// Override the delay between serial reconnect attempts.
    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    /// Override the sleep between cycles.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Handle for the messaging endpoint to enqueue commands with.
    pub fn inbox(&self) -> CommandInbox {
        CommandInbox::new(
            Arc::clone(&self.pending),
            self.policy,
            self.frame_config.delimiters,
        )
    }

    /// Open the serial link, retrying at the configured backoff.
    pub fn connect(&mut self, running: &AtomicBool) -> Result<()> {
        let link = connect_with_backoff(&mut self.connector, self.reconnect_backoff, running)?;
        let codec = FrameCodec::with_config(self.frame_config.clone());
        self.reader = Some(FrameReader::with_codec(link, codec));
        Ok(())
    }

    /// Close the serial link and discard any partial frame.
    pub fn disconnect(&mut self) {
        if let Some(reader) = self.reader.take() {
            let (_link, codec) = reader.into_parts();
            if codec.in_frame() {
                debug!(discarded = codec.buffered(), "partial frame lost with link");
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.reader.is_some()
    }

    /// Run cycles until `running` is cleared, reconnecting whenever the link
    /// is lost. Errors inside a cycle are logged and the loop carries on.
    pub fn run(&mut self, running: &AtomicBool) -> Result<()> {
        info!(
            topic = %self.publish_topic,
            poll_ms = self.poll_interval.as_millis() as u64,
            "bridge loop starting"
        );

        while running.load(Ordering::SeqCst) {
            if !self.is_connected() {
                match self.connect(running) {
                    Ok(()) => {}
                    Err(BridgeError::Transport(TransportError::Shutdown)) => break,
                    Err(err) => return Err(err),
                }
            }

            match self.tick() {
                Ok(report) if !report.is_idle() => debug!(?report, "cycle complete"),
                Ok(_) => {}
                Err(err) if err.is_link_lost() => {
                    warn!(
                        error = %err,
                        retry_in_secs = self.reconnect_backoff.as_secs_f64(),
                        "serial link lost; reconnecting"
                    );
                    self.disconnect();
                }
                Err(err) => error!(error = %err, "bridge cycle failed"),
            }

            std::thread::sleep(self.poll_interval);
        }

        self.disconnect();
        info!("bridge loop stopped");
        Ok(())
    }

    /// One cycle at the current time.
    pub fn tick(&mut self) -> Result<TickReport> {
        self.tick_at(Instant::now())
    }

    /// One cycle: read and forward serial frames, then service the pending head.
    pub fn tick_at(&mut self, now: Instant) -> Result<TickReport> {
        let mut report = TickReport::default();

        for payload in self.read_frames()? {
            // Inbound overflow drains through to messaging first, so the serial
            // side is back-pressured instead of losing frames.
            if self.inbound.is_full() {
                self.forward_inbound(now, &mut report);
            }
            if let Err(payload) = self.inbound.push(payload) {
                self.forward_one(&payload, now, &mut report);
            }
        }
        self.forward_inbound(now, &mut report);

        match self.next_head_action(now) {
            HeadAction::Idle => {}
            HeadAction::Expired(command) => {
                warn!(
                    message = %command.message(),
                    attempts = command.send_attempts(),
                    "command timed out; dropping"
                );
                self.publish(TIMEOUT_SENTINEL);
                report.timed_out += 1;
            }
            HeadAction::Transmit(message) => {
                self.write_frame(&message)?;
                report.transmitted = true;
            }
        }

        Ok(report)
    }

    fn read_frames(&mut self) -> Result<Vec<String>> {
        let reader = self.reader.as_mut().ok_or(BridgeError::Disconnected)?;
        match reader.poll_frames() {
            Ok(frames) => Ok(frames),
            Err(err) if err.is_link_lost() => Err(err.into()),
            Err(err) => {
                debug!(error = %err, "transient serial read error; no data this cycle");
                Ok(Vec::new())
            }
        }
    }

    fn forward_inbound(&mut self, now: Instant, report: &mut TickReport) {
        while let Some(payload) = self.inbound.pop() {
            self.forward_one(&payload, now, report);
        }
    }

    /// Correlate one serial payload with the pending head, then publish it.
    fn forward_one(&mut self, payload: &str, now: Instant, report: &mut TickReport) {
        let resolved = lock(&self.pending).remove_if(|head| {
            head.matches_success(payload, now) || head.matches_invalid(payload, now)
        });
        match resolved.as_ref().map(Command::outcome) {
            Some(Outcome::Success) => report.completed += 1,
            Some(Outcome::Failure) => report.failed += 1,
            _ => {}
        }

        self.publish(payload);
        report.forwarded += 1;
    }

    fn next_head_action(&self, now: Instant) -> HeadAction {
        let mut pending = lock(&self.pending);
        if let Some(expired) = pending.remove_if(|head| head.attempts_maxed()) {
            return HeadAction::Expired(expired);
        }
        match pending.peek_mut().and_then(|head| head.send(now)) {
            Some(message) => HeadAction::Transmit(message.to_owned()),
            None => HeadAction::Idle,
        }
    }

    fn write_frame(&mut self, message: &str) -> Result<()> {
        let delimiters = self.frame_config.delimiters;
        let reader = self.reader.as_mut().ok_or(BridgeError::Disconnected)?;
        FrameWriter::with_delimiters(reader.get_mut(), delimiters).send(message)?;
        info!(%message, "command written to serial");
        Ok(())
    }

    fn publish(&mut self, payload: &str) {
        match self
            .publisher
            .publish(&self.publish_topic, payload.as_bytes(), self.qos)
        {
            Ok(()) => info!(%payload, topic = %self.publish_topic, "published"),
            Err(err) => warn!(
                %payload,
                topic = %self.publish_topic,
                error = %err,
                "publish failed"
            ),
        }
    }

    pub fn delimiters(&self) -> Delimiters {
        self.frame_config.delimiters
    }

    /// Commands waiting, including the one in flight.
    pub fn pending_len(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Snapshot of the pending head.
    pub fn pending_head(&self) -> Option<Command> {
        lock(&self.pending).peek().cloned()
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    /// Mutable access to the open link, if any.
    pub fn link_mut(&mut self) -> Option<&mut C::Link> {
        self.reader.as_mut().map(FrameReader::get_mut)
    }
}
