//! Door service: the per-message pipeline.
//!
//! [`DoorService`] owns the validator, the sequencer and the clock.  The
//! supervisor registers [`DoorService::handle`] with the message
//! channel; every inbound payload runs through it synchronously:
//!
//! ```text
//!  payload ──▶ Validator ──[accept]──▶ Sequencer ──▶ SerialBus
//!                  │                       │
//!              [reject]                 [fault]
//!                  ▼                       ▼
//!              EventSink ◀─────────────────┘
//! ```
//!
//! `handle` takes `&mut self` and `&mut DebounceState`, so a second
//! message cannot be evaluated while an actuation is in progress.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::error::{ActuationFault, Rejection};

use super::events::AppEvent;
use super::ports::{Clock, EventSink, SerialBus};
use super::sequencer::Sequencer;
use super::validator::{DebounceState, Validator};

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The door was opened and locked again.
    Actuated { username: String },
    /// The command was accepted but the relay sequence faulted.
    ActuationFailed {
        username: String,
        fault: ActuationFault,
    },
    /// The message was dropped.
    Rejected(Rejection),
}

/// Running totals since process start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: u64,
    pub rejected: u64,
    pub actuated: u64,
    pub faulted: u64,
}

pub struct DoorService<B, D, K> {
    validator: Validator,
    sequencer: Sequencer<B, D>,
    clock: K,
    stats: DispatchStats,
}

impl<B: SerialBus, D: DelayNs, K: Clock> DoorService<B, D, K> {
    pub fn new(validator: Validator, sequencer: Sequencer<B, D>, clock: K) -> Self {
        Self {
            validator,
            sequencer,
            clock,
            stats: DispatchStats::default(),
        }
    }

    /// Process one inbound payload end to end.  Never fails: every error
    /// is reported through `sink` and the returned [`Outcome`].
    pub fn handle(
        &mut self,
        payload: &[u8],
        debounce: &mut DebounceState,
        sink: &mut impl EventSink,
    ) -> Outcome {
        self.stats.received += 1;

        let request = match self.validator.evaluate(payload, self.clock.now(), debounce) {
            Ok(request) => request,
            Err(rejection) => {
                self.stats.rejected += 1;
                sink.emit(&AppEvent::CommandRejected(rejection.clone()));
                return Outcome::Rejected(rejection);
            }
        };

        info!("Opening door for '{}'", request.username);
        sink.emit(&AppEvent::CommandAccepted {
            username: request.username.clone(),
        });

        match self.sequencer.actuate(debounce, &self.clock, sink) {
            Ok(()) => {
                self.stats.actuated += 1;
                sink.emit(&AppEvent::ActuationCompleted);
                Outcome::Actuated {
                    username: request.username,
                }
            }
            Err(fault) => {
                self.stats.faulted += 1;
                warn!(
                    "Actuation for '{}' failed: {} (payload: {})",
                    request.username,
                    fault,
                    String::from_utf8_lossy(payload)
                );
                sink.emit(&AppEvent::ActuationFailed(fault.clone()));
                Outcome::ActuationFailed {
                    username: request.username,
                    fault,
                }
            }
        }
    }
}

impl<B, D, K> DoorService<B, D, K> {
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn sequencer(&self) -> &Sequencer<B, D> {
        &self.sequencer
    }
}
