//! MQTT message channel adapter.
//!
//! Implements [`MessageChannel`] / [`ChannelSession`] over `rumqttc`'s
//! synchronous client.  All packets are pulled from a single
//! [`Connection`] on the supervisor's thread, so the door pipeline sees
//! one message at a time.
//!
//! ## Connection model
//!
//! 1. `connect()` loads the TLS material, builds a client and waits up
//!    to 10 s for the broker's CONNACK.
//! 2. `subscribe()` waits up to 5 s for the SUBACK.  Messages that
//!    arrive meanwhile are queued and delivered first by `listen()`.
//! 3. `listen()` pulls packets forever.  Transient network errors are
//!    absorbed: the event loop reconnects on the next poll, after a
//!    backoff of 1 s → 2 s → 4 s … capped at 32 s.  A CONNACK without a
//!    stored session triggers a resubscribe of every topic.
//! 4. A refused connection, a rejected subscription or 20 failed
//!    reconnects in a row end the session with an error.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rumqttc::{
    Client, Connection, ConnectionError, Event, MqttOptions, Packet, Publish, QoS,
    SubscribeReasonCode, TlsConfiguration, Transport,
};

use crate::app::ports::{ChannelSession, MessageChannel};
use crate::error::ChannelError;

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

/// Default MQTT-over-TLS port.
pub const DEFAULT_PORT: u16 = 8883;

pub const KEEP_ALIVE: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const OPERATION_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_CAPACITY: usize = 16;

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_MAX: Duration = Duration::from_secs(32);
const MAX_RECONNECT_ATTEMPTS: u32 = 20;

// ───────────────────────────────────────────────────────────────
// Settings
// ───────────────────────────────────────────────────────────────

/// Paths to the TLS material for mutual authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub ca: PathBuf,
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Everything needed to open a broker session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttSettings {
    pub client_id: String,
    pub host: String,
    pub port: u16,
    pub keep_alive: Duration,
    /// `None` connects in plaintext (local brokers only).
    pub tls: Option<TlsFiles>,
}

impl MqttSettings {
    /// Build client options, reading the certificate files.
    pub fn options(&self) -> Result<MqttOptions, ChannelError> {
        let mut options = MqttOptions::new(self.client_id.as_str(), self.host.as_str(), self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);

        if let Some(tls) = &self.tls {
            let ca = read_pem(&tls.ca)?;
            let cert = read_pem(&tls.cert)?;
            let key = read_pem(&tls.key)?;
            options.set_transport(Transport::tls_with_config(TlsConfiguration::Simple {
                ca,
                alpn: None,
                client_auth: Some((cert, key)),
            }));
        }
        Ok(options)
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, ChannelError> {
    std::fs::read(path)
        .map_err(|e| ChannelError::Credentials(format!("{}: {}", path.display(), e)))
}

// ───────────────────────────────────────────────────────────────
// Reconnect backoff
// ───────────────────────────────────────────────────────────────

/// Exponential reconnect backoff with a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectBackoff {
    next: Duration,
    attempts: u32,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectBackoff {
    pub fn new() -> Self {
        Self {
            next: BACKOFF_BASE,
            attempts: 0,
        }
    }

    /// Delay before the next attempt, or `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= MAX_RECONNECT_ATTEMPTS {
            return None;
        }
        self.attempts += 1;
        let delay = self.next;
        self.next = (self.next * 2).min(BACKOFF_MAX);
        Some(delay)
    }

    /// Called on every successful CONNACK.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

// ───────────────────────────────────────────────────────────────
// Channel
// ───────────────────────────────────────────────────────────────

/// Broker channel; each `connect()` builds a brand-new client.
pub struct MqttChannel {
    settings: MqttSettings,
}

impl MqttChannel {
    pub fn new(settings: MqttSettings) -> Self {
        Self { settings }
    }
}

impl MessageChannel for MqttChannel {
    type Session = MqttSession;

    fn connect(&mut self) -> Result<MqttSession, ChannelError> {
        let options = self.settings.options()?;
        info!(
            "MQTT: connecting to {}:{} as '{}'",
            self.settings.host, self.settings.port, self.settings.client_id
        );
        let (client, mut connection) = Client::new(options, REQUEST_CAPACITY);

        let deadline = Instant::now() + CONNECT_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match connection.recv_timeout(remaining) {
                Ok(Ok(Event::Incoming(Packet::ConnAck(_)))) => break,
                Ok(Ok(_)) => {}
                Ok(Err(ConnectionError::ConnectionRefused(code))) => {
                    return Err(ChannelError::Refused(format!("{code:?}")));
                }
                Ok(Err(e)) => return Err(ChannelError::Connect(e.to_string())),
                Err(_) => {
                    return Err(ChannelError::Connect(
                        "timed out waiting for CONNACK".to_owned(),
                    ));
                }
            }
        }

        info!("MQTT: connected");
        Ok(MqttSession {
            client,
            connection,
            topics: Vec::new(),
            pending: VecDeque::new(),
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Session
// ───────────────────────────────────────────────────────────────

/// A live broker session.  Dropping it abandons the connection.
pub struct MqttSession {
    client: Client,
    connection: Connection,
    topics: Vec<String>,
    /// Publishes received while waiting for a SUBACK.
    pending: VecDeque<Publish>,
}

impl ChannelSession for MqttSession {
    fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError> {
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .map_err(|e| ChannelError::Subscribe(e.to_string()))?;

        let deadline = Instant::now() + OPERATION_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.connection.recv_timeout(remaining) {
                Ok(Ok(Event::Incoming(Packet::SubAck(ack)))) => {
                    if ack.return_codes.contains(&SubscribeReasonCode::Failure) {
                        return Err(ChannelError::Subscribe(format!("broker rejected '{topic}'")));
                    }
                    break;
                }
                Ok(Ok(Event::Incoming(Packet::Publish(p)))) => self.pending.push_back(p),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(ChannelError::Subscribe(e.to_string())),
                Err(_) => {
                    return Err(ChannelError::Subscribe(format!(
                        "timed out waiting for SUBACK on '{topic}'"
                    )));
                }
            }
        }

        info!("MQTT: ready to consume from topic '{}'", topic);
        self.topics.push(topic.to_owned());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ChannelError> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.to_vec())
            .map_err(|e| ChannelError::Publish(e.to_string()))
    }

    fn listen(&mut self, handler: &mut dyn FnMut(&str, &[u8])) -> Result<(), ChannelError> {
        while let Some(p) = self.pending.pop_front() {
            handler(&p.topic, &p.payload);
        }

        let mut backoff = ReconnectBackoff::new();
        for notification in self.connection.iter() {
            match on_notification(notification, &mut backoff) {
                Action::Deliver(p) => handler(&p.topic, &p.payload),
                Action::Online { resubscribe: again } => {
                    if again {
                        resubscribe(&self.client, &self.topics)?;
                    }
                    for topic in &self.topics {
                        info!("MQTT: ready to consume from topic '{}'", topic);
                    }
                }
                Action::Ignore => {}
                Action::Retry(wait) => std::thread::sleep(wait),
                Action::Stop(e) => return Err(e),
            }
        }
        Err(ChannelError::Closed)
    }
}

/// What `listen` does with one notification from the event loop.
#[derive(Debug)]
enum Action {
    Deliver(Publish),
    /// A CONNACK arrived; `resubscribe` is set when the broker kept no session.
    Online { resubscribe: bool },
    Ignore,
    /// Transient failure: wait, then let the event loop reconnect.
    Retry(Duration),
    Stop(ChannelError),
}

fn on_notification(
    notification: Result<Event, ConnectionError>,
    backoff: &mut ReconnectBackoff,
) -> Action {
    match notification {
        Ok(Event::Incoming(Packet::Publish(p))) => Action::Deliver(p),
        Ok(Event::Incoming(Packet::ConnAck(ack))) => {
            backoff.reset();
            Action::Online {
                resubscribe: !ack.session_present,
            }
        }
        Ok(Event::Incoming(Packet::SubAck(ack)))
            if ack.return_codes.contains(&SubscribeReasonCode::Failure) =>
        {
            Action::Stop(ChannelError::Subscribe(
                "broker rejected resubscription".to_owned(),
            ))
        }
        Ok(event) => {
            debug!("MQTT: {:?}", event);
            Action::Ignore
        }
        Err(ConnectionError::ConnectionRefused(code)) => {
            Action::Stop(ChannelError::Refused(format!("{code:?}")))
        }
        Err(e) => match backoff.next_delay() {
            Some(wait) => {
                warn!(
                    "MQTT: connection error ({}), reconnect attempt {} in {}s",
                    e,
                    backoff.attempts(),
                    wait.as_secs()
                );
                Action::Retry(wait)
            }
            None => Action::Stop(ChannelError::Transport(e.to_string())),
        },
    }
}

fn resubscribe(client: &Client, topics: &[String]) -> Result<(), ChannelError> {
    for topic in topics {
        info!("MQTT: resubscribing to '{}'", topic);
        client
            .subscribe(topic.as_str(), QoS::AtLeastOnce)
            .map_err(|e| ChannelError::Subscribe(e.to_string()))?;
    }
    Ok(())
}
