//! Outbound application events.
//!
//! The pipeline and the supervisor emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: the production sink logs them,
//! tests record them.

use core::time::Duration;

use crate::error::{ActuationFault, CycleError, Rejection};

use super::sequencer::ActuationPhase;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// A message passed validation and is about to drive the relay.
    CommandAccepted { username: String },

    /// A message was dropped.
    CommandRejected(Rejection),

    /// The actuation sequencer moved between phases.
    PhaseChanged { from: ActuationPhase, to: ActuationPhase },

    /// The full unlock → hold → lock sequence succeeded.
    ActuationCompleted,

    /// Some step of the sequence failed; the sequencer is back in Idle.
    ActuationFailed(ActuationFault),

    /// A supervision cycle connected to the broker.
    SessionEstablished { cycle: u64 },

    /// The pipeline is subscribed to `topic`.
    Subscribed { topic: String },

    /// The liveness announcement went out on `topic`.
    Announced { topic: String },

    /// The current cycle ended with a fatal fault.
    CycleFaulted(CycleError),

    /// A fresh cycle will start after `delay`.
    RestartScheduled { restarts: u64, delay: Duration },
}
