//! MQTT messaging endpoint built on the synchronous `rumqttc` client.
//!
//! The client buffers outgoing requests, so publishing from the bridge loop
//! never blocks on the network. The connection event loop runs on its own
//! thread and feeds subscribed payloads into a [`CommandInbox`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use rumqttc::{Client, Connection, Event, MqttOptions, Packet, Publish};
use serialmq_transport::sleep_while_running;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::inbox::{CommandInbox, Submission};
use crate::publisher::{Publisher, QoS};

/// Request slots beyond one cycle's worth of forwarded frames: the TIMEOUT
/// sentinel plus subscribe and disconnect requests.
const REQUEST_HEADROOM: usize = 8;

/// Requests the client may buffer before `try_publish` starts failing. A full
/// inbound queue drained in one cycle, or while the worker is reconnecting,
/// must fit.
fn request_capacity(config: &BridgeConfig) -> usize {
    config.queue_capacity.saturating_add(REQUEST_HEADROOM)
}

impl From<QoS> for rumqttc::QoS {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
            QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

/// Entry point for wiring the broker connection.
pub struct MqttEndpoint;

impl MqttEndpoint {
    /// Create the client pair. Nothing touches the network until the worker
    /// is spawned.
    pub fn connect(config: &BridgeConfig) -> (MqttPublisher, MqttWorker) {
        let mut options =
            MqttOptions::new(config.client_id(), config.mqtt_ip.clone(), config.mqtt_port);
        options.set_keep_alive(config.mqtt_keep_alive());

        let (client, connection) = Client::new(options, request_capacity(config));
        info!(
            broker = %format!("{}:{}", config.mqtt_ip, config.mqtt_port),
            publish = %config.mqtt_publish_channel,
            subscribe = %config.mqtt_subscribe_channel,
            "mqtt client created"
        );

        let publisher = MqttPublisher {
            client: client.clone(),
        };
        let worker = MqttWorker {
            client,
            connection,
            subscribe_topic: config.mqtt_subscribe_channel.clone(),
            qos: config.mqtt_qos,
            reconnect_backoff: config.mqtt_reconnect_backoff(),
        };
        (publisher, worker)
    }
}

/// Outbound half: hands publishes to the client's request buffer.
#[derive(Clone)]
pub struct MqttPublisher {
    client: Client,
}

impl MqttPublisher {
    /// Ask the broker connection to close. The worker exits on its next event.
    pub fn disconnect(&self) {
        if let Err(err) = self.client.try_disconnect() {
            debug!(error = %err, "mqtt disconnect request not queued");
        }
    }
}

impl Publisher for MqttPublisher {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<()> {
        self.client
            .try_publish(topic, qos.into(), false, payload.to_vec())
            .map_err(|err| BridgeError::Publish(err.to_string()))
    }
}

/// Inbound half: drives the connection and turns messages into commands.
pub struct MqttWorker {
    client: Client,
    connection: Connection,
    subscribe_topic: String,
    qos: QoS,
    reconnect_backoff: Duration,
}

impl MqttWorker {
    /// Run the event loop on a dedicated thread until `running` is cleared.
    /// Subscribed payloads are submitted to `inbox`.
    pub fn spawn(self, inbox: CommandInbox, running: Arc<AtomicBool>) -> Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("serialmq-mqtt".to_string())
            .spawn(move || self.run(&inbox, &running))
            .map_err(|err| BridgeError::Transport(err.into()))
    }

    /// Run the event loop on the current thread until `running` is cleared.
    pub fn run(mut self, inbox: &CommandInbox, running: &AtomicBool) {
        info!(topic = %self.subscribe_topic, "mqtt worker started");

        for notification in self.connection.iter() {
            if !running.load(Ordering::SeqCst) {
                break;
            }
            match notification {
                Ok(event) => {
                    handle_event(&self.client, inbox, &self.subscribe_topic, self.qos, event)
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        retry_in_secs = self.reconnect_backoff.as_secs_f64(),
                        "mqtt connection error; reconnecting"
                    );
                    sleep_while_running(self.reconnect_backoff, running);
                }
            }
        }

        if let Err(err) = self.client.try_disconnect() {
            debug!(error = %err, "mqtt disconnect request not queued");
        }
        info!("mqtt worker stopped");
    }
}

fn handle_event(client: &Client, inbox: &CommandInbox, topic: &str, qos: QoS, event: Event) {
    match event {
        Event::Incoming(Packet::ConnAck(ack)) => {
            info!(code = ?ack.code, "connected to mqtt broker");
            // Sessions are clean, so every reconnect needs a fresh subscription.
            if let Err(err) = client.try_subscribe(topic, qos.into()) {
                warn!(%topic, error = %err, "mqtt subscribe request not queued");
            }
        }
        Event::Incoming(Packet::SubAck(ack)) => {
            info!(%topic, codes = ?ack.return_codes, "subscribed");
        }
        Event::Incoming(Packet::Publish(publish)) => handle_publish(inbox, topic, &publish),
        Event::Incoming(Packet::Disconnect) => warn!("mqtt broker closed the session"),
        other => debug!(event = ?other, "mqtt event"),
    }
}

fn handle_publish(inbox: &CommandInbox, topic: &str, publish: &Publish) {
    if publish.topic != topic {
        debug!(topic = %publish.topic, "ignoring message on unexpected topic");
        return;
    }
    match inbox.submit(&publish.payload) {
        Ok(Submission::Queued { depth }) => debug!(%topic, depth, "command received"),
        Ok(Submission::Ignored) => {}
        Err(err) => warn!(%topic, error = %err, "command rejected"),
    }
}
