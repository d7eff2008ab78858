//! Error taxonomy for the doorman controller.
//!
//! Errors are split by how far they are allowed to travel:
//!
//! | Type             | Scope          | Recovered by                     |
//! |------------------|----------------|----------------------------------|
//! | [`Rejection`]    | one message    | logged, message dropped          |
//! | [`ActuationFault`]| one actuation | logged inside the pipeline       |
//! | [`ChannelError`] | one session    | adapter backoff, else the cycle  |
//! | [`CycleError`]   | one cycle      | supervisor delayed restart       |
//!
//! Nothing here ever terminates the process once the supervisor runs.

use core::fmt;
use core::time::Duration;

// ---------------------------------------------------------------------------
// Per-message rejections
// ---------------------------------------------------------------------------

/// Why an inbound message was not turned into an actuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Bytes did not decode into the command record.
    MalformedPayload(String),
    /// `command` or `username` was absent, null or empty.
    MissingField(&'static str),
    /// Arrived inside the debounce window of the last actuation.
    TooSoon { elapsed: Duration, window: Duration },
    /// `command` is not a recognised verb.
    UnknownCommand(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedPayload(detail) => write!(f, "malformed payload: {detail}"),
            Self::MissingField(name) => write!(f, "no {name} field in payload"),
            Self::TooSoon { elapsed, window } => write!(
                f,
                "too soon: {}ms since last actuation, window is {}ms",
                elapsed.as_millis(),
                window.as_millis()
            ),
            Self::UnknownCommand(verb) => write!(f, "unknown command: {verb}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Serial bus
// ---------------------------------------------------------------------------

/// Failure reported by a [`SerialBus`](crate::app::ports::SerialBus) or
/// one of its links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialError(pub String);

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<serialport::Error> for SerialError {
    fn from(e: serialport::Error) -> Self {
        Self(e.to_string())
    }
}

impl From<std::io::Error> for SerialError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Actuation faults
// ---------------------------------------------------------------------------

/// A failure somewhere in the unlock → hold → lock sequence.
///
/// When several steps fail, the sequencer reports the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuationFault {
    PortOpen(SerialError),
    UnlockWrite(SerialError),
    LockWrite(SerialError),
    PortClose(SerialError),
}

impl fmt::Display for ActuationFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PortOpen(e) => write!(f, "serial port open failed: {e}"),
            Self::UnlockWrite(e) => write!(f, "unlock write failed: {e}"),
            Self::LockWrite(e) => write!(f, "lock write failed: {e}"),
            Self::PortClose(e) => write!(f, "serial port close failed: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Message channel
// ---------------------------------------------------------------------------

/// Failures of the message channel client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Certificates or keys could not be loaded.
    Credentials(String),
    /// The broker could not be reached.
    Connect(String),
    /// The broker refused the connection (identity or authorisation).
    Refused(String),
    Subscribe(String),
    Publish(String),
    /// The reconnect budget was exhausted while listening.
    Transport(String),
    /// The delivery loop ended without an error.
    Closed,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credentials(e) => write!(f, "credentials: {e}"),
            Self::Connect(e) => write!(f, "connect: {e}"),
            Self::Refused(e) => write!(f, "refused by broker: {e}"),
            Self::Subscribe(e) => write!(f, "subscribe: {e}"),
            Self::Publish(e) => write!(f, "publish: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Closed => write!(f, "session closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Supervision cycle
// ---------------------------------------------------------------------------

/// Step of a supervision cycle in which a fatal fault happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Connect,
    Subscribe,
    Announce,
    Listen,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::Subscribe => "subscribe",
            Self::Announce => "announce",
            Self::Listen => "listen",
        };
        f.write_str(name)
    }
}

/// A fault that ends the current supervision cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    pub phase: CyclePhase,
    pub source: ChannelError,
}

impl CycleError {
    pub fn new(phase: CyclePhase, source: ChannelError) -> Self {
        Self { phase, source }
    }
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.phase, self.source)
    }
}

impl std::error::Error for CycleError {}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Startup configuration errors. These abort startup; they are never
/// turned into restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    Missing(&'static str),
    /// A variable is set but cannot be parsed.
    Invalid { var: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "missing required variable {var}"),
            Self::Invalid { var, reason } => write!(f, "invalid {var}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
