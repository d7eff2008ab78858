//! Actuation sequencer: drives one unlock → hold → lock cycle.
//!
//! ```text
//!  IDLE ──[port open]──▶ UNLOCKING ──[unlock written]──▶ HOLDING
//!   ▲                        │                              │
//!   │                 [unlock failed]                 [hold elapsed]
//!   │                        ▼                              ▼
//!   └───────[port closed]── LOCKING ◀───────────────────────┘
//! ```
//!
//! Once the port is open the sequence always ends with a lock write
//! attempt and a close, whatever failed before.  The debounce timestamp
//! is recorded as soon as the unlock frame is written, before the hold.
//! A failed open or unlock write leaves it untouched, so the retry is
//! not rejected as too soon.
//!
//! The hold interval is a blocking delay.  Nothing else is evaluated
//! until `actuate` returns.

use core::fmt;
use core::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::drivers::relay::{LOCK_FRAME, UNLOCK_FRAME};
use crate::error::ActuationFault;

use super::events::AppEvent;
use super::ports::{Clock, EventSink, SerialBus, SerialLink};
use super::validator::DebounceState;

/// How long the relay stays energised.  Independent of the debounce window.
pub const HOLD_INTERVAL: Duration = Duration::from_secs(1);

/// Sequencer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActuationPhase {
    Idle,
    Unlocking,
    Holding,
    Locking,
}

impl fmt::Display for ActuationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Unlocking => "Unlocking",
            Self::Holding => "Holding",
            Self::Locking => "Locking",
        };
        f.write_str(name)
    }
}

/// Owns the serial bus and the hold delay.
pub struct Sequencer<B, D> {
    bus: B,
    device: String,
    delay: D,
    phase: ActuationPhase,
}

impl<B: SerialBus, D: DelayNs> Sequencer<B, D> {
    pub fn new(bus: B, device: impl Into<String>, delay: D) -> Self {
        Self {
            bus,
            device: device.into(),
            delay,
            phase: ActuationPhase::Idle,
        }
    }

    pub fn phase(&self) -> ActuationPhase {
        self.phase
    }

    /// Run the full sequence.  Always returns in [`ActuationPhase::Idle`].
    ///
    /// Returns the first fault hit, if any.  Faults never leave the port open.
    pub fn actuate(
        &mut self,
        debounce: &mut DebounceState,
        clock: &impl Clock,
        sink: &mut impl EventSink,
    ) -> Result<(), ActuationFault> {
        self.enter(ActuationPhase::Unlocking, sink);

        let mut link = match self.bus.open(&self.device) {
            Ok(link) => link,
            Err(e) => {
                warn!("Relay: cannot open {}: {}", self.device, e);
                self.enter(ActuationPhase::Idle, sink);
                return Err(ActuationFault::PortOpen(e));
            }
        };

        let mut fault = None;
        match link.write_all(&UNLOCK_FRAME) {
            Ok(()) => {
                debounce.record(clock.now());
                self.enter(ActuationPhase::Holding, sink);
                self.delay.delay_ms(hold_millis(HOLD_INTERVAL));
            }
            Err(e) => {
                warn!("Relay: unlock write failed ({}), skipping hold", e);
                fault = Some(ActuationFault::UnlockWrite(e));
            }
        }

        self.enter(ActuationPhase::Locking, sink);
        if let Err(e) = link.write_all(&LOCK_FRAME) {
            warn!("Relay: lock write failed: {}", e);
            fault.get_or_insert(ActuationFault::LockWrite(e));
        }

        if let Err(e) = link.close() {
            warn!("Relay: close failed: {}", e);
            fault.get_or_insert(ActuationFault::PortClose(e));
        }

        self.enter(ActuationPhase::Idle, sink);
        match fault {
            None => Ok(()),
            Some(f) => Err(f),
        }
    }

    fn enter(&mut self, next: ActuationPhase, sink: &mut impl EventSink) {
        if next == self.phase {
            return;
        }
        info!("Sequencer transition: {} -> {}", self.phase, next);
        sink.emit(&AppEvent::PhaseChanged {
            from: self.phase,
            to: next,
        });
        self.phase = next;
    }
}

fn hold_millis(hold: Duration) -> u32 {
    u32::try_from(hold.as_millis()).unwrap_or(u32::MAX)
}
