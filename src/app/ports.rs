//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DoorService / Supervisor (domain)
//! ```
//!
//! Driven adapters (serial relay, MQTT broker, clock, event sinks)
//! implement these traits.  The domain consumes them via generics, so
//! it never touches a device file or a socket directly.  Delays are not
//! defined here: the domain takes any
//! [`embedded_hal::delay::DelayNs`] for the hold and restart intervals.

use std::time::Instant;

use crate::error::{ChannelError, SerialError};

// ───────────────────────────────────────────────────────────────
// Serial bus (driven adapter: domain → relay)
// ───────────────────────────────────────────────────────────────

/// Opens connections to a named serial device.
///
/// Each actuation opens its own link and closes it before returning, so
/// a link is never shared between actuations.
pub trait SerialBus {
    type Link: SerialLink;

    /// Open `device` (e.g. `/dev/ttyUSB0`).
    fn open(&mut self, device: &str) -> Result<Self::Link, SerialError>;
}

/// An open, write-only connection to the relay.  The relay never answers.
pub trait SerialLink {
    /// Write the whole frame.
    fn write_all(&mut self, frame: &[u8]) -> Result<(), SerialError>;

    /// Release the device.  Consumes the link so it cannot be reused.
    fn close(self) -> Result<(), SerialError>;
}

// ───────────────────────────────────────────────────────────────
// Message channel (driving adapter: broker → domain)
// ───────────────────────────────────────────────────────────────

/// Factory for connection sessions to the publish/subscribe broker.
pub trait MessageChannel {
    type Session: ChannelSession;

    /// Establish a fresh session.  Previous sessions are never reused.
    fn connect(&mut self) -> Result<Self::Session, ChannelError>;
}

/// One live connection to the broker.
pub trait ChannelSession {
    /// Subscribe to `topic` with at-least-once delivery.
    fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError>;

    /// Publish `payload` to `topic` with at-most-once delivery.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ChannelError>;

    /// Block, handing each inbound message to `handler` one at a time.
    ///
    /// The handler returns before the next message is delivered.  Returns
    /// only when the session can no longer deliver messages.
    fn listen(&mut self, handler: &mut dyn FnMut(&str, &[u8])) -> Result<(), ChannelError>;
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic time source used for debouncing.
pub trait Clock {
    fn now(&self) -> Instant;
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
