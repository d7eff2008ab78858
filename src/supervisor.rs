//! Supervisor loop: the only resilience mechanism.
//!
//! ```text
//!  CONNECTING ──[connected, subscribed, announced]──▶ LISTENING
//!      ▲                                                  │
//!      │                                         [fault or close]
//!      │                                                  ▼
//!      └──────────[restart delay elapsed]────────── RESTARTING
//! ```
//!
//! Each cycle opens a fresh session, subscribes the door pipeline to the
//! configured topic, publishes the liveness announcement and then blocks
//! while the channel delivers messages.  Any fault in any step ends the
//! cycle; the session is dropped and the next cycle starts after a fixed
//! delay.  There is no finer-grained recovery: reconnecting and
//! resubscribing are idempotent.
//!
//! The debounce state lives here rather than in the cycle, so restarts
//! never reopen the debounce window.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{error, info};

use crate::app::events::AppEvent;
use crate::app::ports::{ChannelSession, Clock, EventSink, MessageChannel, SerialBus};
use crate::app::service::DoorService;
use crate::app::validator::DebounceState;
use crate::error::{ChannelError, CycleError, CyclePhase};

/// Pause between a faulted cycle and the next one.
pub const RESTART_DELAY: Duration = Duration::from_secs(10);

/// Published once per successful connection.
pub const LIVENESS_PAYLOAD: &[u8] = br#"{"message":"Connected!"}"#;

/// Where the supervisor currently is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Connecting,
    Listening,
    Restarting,
}

pub struct Supervisor<C, B, D, K, R, S> {
    channel: C,
    service: DoorService<B, D, K>,
    debounce: DebounceState,
    topic: String,
    restart_delay: Duration,
    delay: R,
    sink: S,
    state: CycleState,
    cycles: u64,
    restarts: u64,
}

impl<C, B, D, K, R, S> Supervisor<C, B, D, K, R, S>
where
    C: MessageChannel,
    B: SerialBus,
    D: DelayNs,
    K: Clock,
    R: DelayNs,
    S: EventSink,
{
    pub fn new(
        channel: C,
        service: DoorService<B, D, K>,
        topic: impl Into<String>,
        delay: R,
        sink: S,
    ) -> Self {
        Self {
            channel,
            service,
            debounce: DebounceState::new(),
            topic: topic.into(),
            restart_delay: RESTART_DELAY,
            delay,
            sink,
            state: CycleState::Connecting,
            cycles: 0,
            restarts: 0,
        }
    }

    /// Supervise forever.
    pub fn run(&mut self) -> ! {
        info!("Supervisor: watching topic '{}'", self.topic);
        loop {
            self.step();
        }
    }

    /// Run one cycle to its fault, then wait out the restart delay.
    pub fn step(&mut self) -> CycleError {
        let err = self.run_cycle();
        self.schedule_restart();
        err
    }

    /// Run one cycle: connect, subscribe, announce, listen.
    ///
    /// Returns the fault that ended it.  A listen loop that ends without
    /// an error counts as [`ChannelError::Closed`].
    pub fn run_cycle(&mut self) -> CycleError {
        self.cycles += 1;
        self.state = CycleState::Connecting;
        info!("Supervisor: cycle {} connecting", self.cycles);

        let err = match self.connect_and_listen() {
            Ok(()) => CycleError::new(CyclePhase::Listen, ChannelError::Closed),
            Err(e) => e,
        };
        error!("Supervisor: cycle {} ended: {}", self.cycles, err);
        self.sink.emit(&AppEvent::CycleFaulted(err.clone()));
        err
    }

    fn connect_and_listen(&mut self) -> Result<(), CycleError> {
        let mut session = self
            .channel
            .connect()
            .map_err(|e| CycleError::new(CyclePhase::Connect, e))?;
        self.sink.emit(&AppEvent::SessionEstablished { cycle: self.cycles });

        session
            .subscribe(&self.topic)
            .map_err(|e| CycleError::new(CyclePhase::Subscribe, e))?;
        self.sink.emit(&AppEvent::Subscribed {
            topic: self.topic.clone(),
        });

        session
            .publish(&self.topic, LIVENESS_PAYLOAD)
            .map_err(|e| CycleError::new(CyclePhase::Announce, e))?;
        self.sink.emit(&AppEvent::Announced {
            topic: self.topic.clone(),
        });

        self.state = CycleState::Listening;
        let service = &mut self.service;
        let debounce = &mut self.debounce;
        let sink = &mut self.sink;
        session
            .listen(&mut |topic: &str, payload: &[u8]| {
                info!("Received message from topic: {}", topic);
                service.handle(payload, &mut *debounce, &mut *sink);
            })
            .map_err(|e| CycleError::new(CyclePhase::Listen, e))
    }

    fn schedule_restart(&mut self) {
        self.state = CycleState::Restarting;
        self.restarts += 1;
        info!(
            "Supervisor: restart {} in {}s",
            self.restarts,
            self.restart_delay.as_secs()
        );
        self.sink.emit(&AppEvent::RestartScheduled {
            restarts: self.restarts,
            delay: self.restart_delay,
        });
        self.delay
            .delay_ms(u32::try_from(self.restart_delay.as_millis()).unwrap_or(u32::MAX));
    }
}

impl<C, B, D, K, R, S> Supervisor<C, B, D, K, R, S> {
    /// Override the restart delay.
    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Restarts scheduled so far.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    pub fn debounce(&self) -> &DebounceState {
        &self.debounce
    }

    pub fn service(&self) -> &DoorService<B, D, K> {
        &self.service
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }
}
