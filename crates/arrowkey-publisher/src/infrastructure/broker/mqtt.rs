//! MQTT broker session backed by `rumqttc`'s blocking client.
//!
//! [`connect`] opens the session and waits for the broker's CONNACK so that a
//! wrong host, a closed port, or a refused client id fails at start-up rather
//! than silently later.  It returns:
//!
//! - [`MqttBroker`], the [`BrokerClient`] used by the publisher thread;
//! - [`MqttEventLoop`], which must be run (on the main thread) for anything to
//!   actually be sent.
//!
//! # Non-blocking publish
//!
//! `rumqttc` buffers outgoing requests in a bounded channel drained by the
//! event loop.  [`MqttBroker::publish`] uses `try_publish`, so while the broker
//! is unreachable and that buffer is full the publish fails immediately and
//! the event is discarded instead of stalling the drain.
//!
//! A successful publish only means the request was handed to the client.
//! Requests still buffered when the session ends are never sent; the event
//! loop logs how many were abandoned and exposes the count through
//! [`MqttEventLoop::abandoned`].
//!
//! # Shutdown during an outage
//!
//! [`MqttBroker::disconnect`] never blocks on the request buffer.  It raises
//! a shared flag, then retries `try_disconnect` until the request is queued,
//! the event loop has stopped, or a short grace period runs out.  The event
//! loop returns on the first connection error it sees after the flag is set,
//! so an unreachable broker cannot keep either thread alive.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use arrowkey_core::{PipelineConfig, QualityOfService};
use rumqttc::{
    Client, ConnectReturnCode, Connection, ConnectionError, Event, MqttOptions,
    Outgoing, Packet, QoS,
};
use tracing::{debug, info, trace, warn};

use super::{BrokerError, BrokerEventLoop, ConnectionHandler};
use crate::application::publish_events::{BrokerClient, PublishError};

/// Lower bound on the outgoing request buffer.
const MIN_REQUEST_BUFFER: usize = 16;

/// How long [`MqttBroker::disconnect`] keeps retrying a full request buffer.
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

const DISCONNECT_RETRY: Duration = Duration::from_millis(10);

/// State shared by the two halves of one session.
#[derive(Debug, Default)]
struct SessionState {
    shutting_down: AtomicBool,
    loop_stopped: AtomicBool,
    handed_off: AtomicU64,
    sent: AtomicU64,
}

impl SessionState {
    fn abandoned(&self) -> u64 {
        self.handed_off
            .load(Ordering::SeqCst)
            .saturating_sub(self.sent.load(Ordering::SeqCst))
    }
}

/// Converts the domain QoS into the `rumqttc` representation.
pub fn to_mqtt_qos(qos: QualityOfService) -> QoS {
    match qos {
        QualityOfService::AtMostOnce => QoS::AtMostOnce,
        QualityOfService::AtLeastOnce => QoS::AtLeastOnce,
        QualityOfService::ExactlyOnce => QoS::ExactlyOnce,
    }
}

/// Builds the `rumqttc` connection options for `config`.
pub fn mqtt_options(config: &PipelineConfig) -> MqttOptions {
    let mut options = MqttOptions::new(
        config.client_id.clone(),
        config.broker_host.clone(),
        config.broker_port,
    );
    options.set_keep_alive(config.keep_alive);
    options.set_clean_session(true);
    options
}

/// Size of the outgoing request buffer for a queue of `queue_capacity`.
///
/// Large enough to hold a full queue twice over, so the shutdown drain does
/// not overrun it while the broker is connected.
pub fn request_buffer(queue_capacity: usize) -> usize {
    queue_capacity.saturating_mul(2).max(MIN_REQUEST_BUFFER)
}

/// Opens an MQTT session and waits for the broker to accept it.
///
/// # Errors
///
/// - [`BrokerError::Connect`] if the TCP or MQTT handshake fails.
/// - [`BrokerError::Refused`] if the broker rejects the CONNECT packet.
pub fn connect(config: &PipelineConfig) -> Result<(MqttBroker, MqttEventLoop), BrokerError> {
    let addr = format!("{}:{}", config.broker_host, config.broker_port);
    let (broker, mut event_loop) = session(config);

    let session_present = wait_for_connack(&mut event_loop.connection, &addr)?;
    info!(%addr, client_id = %config.client_id, session_present, "connected to broker");
    Ok((broker, event_loop))
}

/// Builds both halves of a session without contacting the broker.
fn session(config: &PipelineConfig) -> (MqttBroker, MqttEventLoop) {
    let (client, connection) =
        Client::new(mqtt_options(config), request_buffer(config.queue_capacity));
    let state = Arc::new(SessionState::default());
    let broker = MqttBroker {
        client,
        qos: to_mqtt_qos(config.qos),
        state: Arc::clone(&state),
    };
    let event_loop = MqttEventLoop {
        connection,
        reconnect_delay: config.reconnect_delay,
        state,
    };
    (broker, event_loop)
}

fn wait_for_connack(connection: &mut Connection, addr: &str) -> Result<bool, BrokerError> {
    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return if ack.code == ConnectReturnCode::Success {
                    Ok(ack.session_present)
                } else {
                    Err(BrokerError::Refused {
                        addr: addr.to_string(),
                        reason: format!("{:?}", ack.code),
                    })
                };
            }
            Ok(other) => trace!(?other, "waiting for CONNACK"),
            Err(ConnectionError::ConnectionRefused(code)) => {
                return Err(BrokerError::Refused {
                    addr: addr.to_string(),
                    reason: format!("{code:?}"),
                });
            }
            Err(e) => {
                return Err(BrokerError::Connect {
                    addr: addr.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
    Err(BrokerError::Connect {
        addr: addr.to_string(),
        reason: "connection closed before CONNACK".to_string(),
    })
}

/// Outbound MQTT client.
pub struct MqttBroker {
    client: Client,
    qos: QoS,
    state: Arc<SessionState>,
}

impl BrokerClient for MqttBroker {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        self.client
            .try_publish(topic, self.qos, false, payload.to_vec())
            .map_err(|e| PublishError::Rejected {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;
        self.state.handed_off.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), PublishError> {
        self.state.shutting_down.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + DISCONNECT_GRACE;
        loop {
            let err = match self.client.try_disconnect() {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            if self.state.loop_stopped.load(Ordering::SeqCst) || Instant::now() >= deadline {
                debug!("disconnect request not queued: {err}");
                return Err(PublishError::Disconnected(
                    "request buffer full; event loop stops on its own".to_string(),
                ));
            }
            thread::sleep(DISCONNECT_RETRY);
        }
    }
}

/// Blocking MQTT network loop.
pub struct MqttEventLoop {
    connection: Connection,
    reconnect_delay: Duration,
    state: Arc<SessionState>,
}

impl MqttEventLoop {
    /// Publishes handed to the client that were never written to the network.
    pub fn abandoned(&self) -> u64 {
        self.state.abandoned()
    }

    fn drive(&mut self, handler: &dyn ConnectionHandler) -> Result<(), BrokerError> {
        for notification in self.connection.iter() {
            match notification {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => handler.on_connect(ack.session_present),
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    handler.on_message(&publish.topic, &publish.payload);
                }
                Ok(Event::Outgoing(Outgoing::Publish(_))) => {
                    self.state.sent.fetch_add(1, Ordering::SeqCst);
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    debug!("disconnect sent; stopping event loop");
                    return Ok(());
                }
                Ok(other) => trace!(?other, "mqtt event"),
                Err(ConnectionError::RequestsDone) => {
                    debug!("all clients dropped; stopping event loop");
                    return Ok(());
                }
                Err(e) => {
                    if self.state.shutting_down.load(Ordering::SeqCst) {
                        debug!("connection lost during shutdown: {e}");
                        return Ok(());
                    }
                    handler.on_connection_error(&e.to_string());
                    thread::sleep(self.reconnect_delay);
                }
            }
        }
        Ok(())
    }
}

impl BrokerEventLoop for MqttEventLoop {
    fn run(&mut self, handler: &dyn ConnectionHandler) -> Result<(), BrokerError> {
        let result = self.drive(handler);
        self.state.loop_stopped.store(true, Ordering::SeqCst);
        let abandoned = self.abandoned();
        if abandoned > 0 {
            warn!(abandoned, "broker session ended with publishes still buffered");
        }
        result
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
