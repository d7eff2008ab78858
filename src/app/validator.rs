//! Command validator and debouncer.
//!
//! [`Validator::evaluate`] turns raw payload bytes into either an
//! [`OpenRequest`] or a [`Rejection`].  It is pure apart from the clock
//! value passed in: it never touches the relay and never writes the
//! debounce state.
//!
//! Checks run in a fixed order:
//!
//! 1. decode the JSON record                → `MalformedPayload`
//! 2. `command` present and non-empty       → `MissingField("command")`
//! 3. `username` present and non-empty      → `MissingField("username")`
//! 4. outside the debounce window           → `TooSoon`
//! 5. `command` is a known verb             → `UnknownCommand`
//!
//! The debounce check precedes verb dispatch, so any command inside the
//! window is rejected as `TooSoon`, whatever its verb.

use core::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::Rejection;

use super::commands::{CommandMessage, OpenRequest, Verb};

// ───────────────────────────────────────────────────────────────
// Debounce state
// ───────────────────────────────────────────────────────────────

/// Start time of the most recent actuation.
///
/// `None` stands for "epoch": nothing has been actuated since process
/// start, so the first command is always eligible.  Only the
/// [`Sequencer`](super::sequencer::Sequencer) writes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceState {
    last_actuation: Option<Instant>,
}

impl DebounceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_actuation(&self) -> Option<Instant> {
        self.last_actuation
    }

    /// Time since the last actuation, or `None` if there never was one.
    pub fn elapsed_since(&self, now: Instant) -> Option<Duration> {
        self.last_actuation
            .map(|last| now.saturating_duration_since(last))
    }

    pub(crate) fn record(&mut self, at: Instant) {
        self.last_actuation = Some(at);
    }
}

// ───────────────────────────────────────────────────────────────
// Validator
// ───────────────────────────────────────────────────────────────

/// Stateless validator configured with the debounce window.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    open_delay: Duration,
}

impl Validator {
    pub fn new(open_delay: Duration) -> Self {
        Self { open_delay }
    }

    pub fn open_delay(&self) -> Duration {
        self.open_delay
    }

    /// Decide whether `payload`, received at `now`, should open the door.
    pub fn evaluate(
        &self,
        payload: &[u8],
        now: Instant,
        debounce: &DebounceState,
    ) -> Result<OpenRequest, Rejection> {
        let msg = decode(payload).map_err(|e| Rejection::MalformedPayload(e.to_string()))?;

        let command = non_empty(msg.command).ok_or(Rejection::MissingField("command"))?;
        let username = non_empty(msg.username).ok_or(Rejection::MissingField("username"))?;

        if let Some(elapsed) = debounce.elapsed_since(now) {
            if elapsed < self.open_delay {
                return Err(Rejection::TooSoon {
                    elapsed,
                    window: self.open_delay,
                });
            }
        }

        match Verb::parse(&command) {
            Some(Verb::Open) => Ok(OpenRequest { username }),
            None => Err(Rejection::UnknownCommand(command)),
        }
    }
}

/// Decode a JSON object into the command record.  Arrays are refused
/// even though serde would map them positionally onto the struct.
fn decode(payload: &[u8]) -> Result<CommandMessage, serde_json::Error> {
    let record: Map<String, Value> = serde_json::from_slice(payload)?;
    CommandMessage::deserialize(Value::Object(record))
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.is_empty())
}
