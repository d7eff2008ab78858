//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (stdout through the subscriber installed in `main`).

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::error::Rejection;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::CommandAccepted { username } => {
                info!("CMD | accepted open for '{}'", username);
            }
            AppEvent::CommandRejected(r @ Rejection::TooSoon { .. }) => {
                info!("CMD | rejected: {}", r);
            }
            AppEvent::CommandRejected(r) => {
                warn!("CMD | rejected: {}", r);
            }
            AppEvent::PhaseChanged { from, to } => {
                info!("RELAY | {} -> {}", from, to);
            }
            AppEvent::ActuationCompleted => {
                info!("RELAY | door locked again");
            }
            AppEvent::ActuationFailed(fault) => {
                error!("RELAY | {}", fault);
            }
            AppEvent::SessionEstablished { cycle } => {
                info!("SUPERVISOR | cycle {} connected", cycle);
            }
            AppEvent::Subscribed { topic } => {
                info!("SUPERVISOR | subscribed to '{}'", topic);
            }
            AppEvent::Announced { topic } => {
                info!("SUPERVISOR | announced on '{}'", topic);
            }
            AppEvent::CycleFaulted(err) => {
                error!("SUPERVISOR | {}", err);
            }
            AppEvent::RestartScheduled { restarts, delay } => {
                warn!(
                    "SUPERVISOR | restart #{} in {}s",
                    restarts,
                    delay.as_secs()
                );
            }
        }
    }
}
