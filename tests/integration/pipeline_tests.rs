//! Door pipeline tests: payload in, relay frames out.

use std::time::Duration;

use doorman::app::events::AppEvent;
use doorman::app::sequencer::{ActuationPhase, Sequencer};
use doorman::app::service::{DoorService, Outcome};
use doorman::app::validator::{DebounceState, Validator};
use doorman::drivers::relay::{LOCK_FRAME, UNLOCK_FRAME};
use doorman::error::{ActuationFault, Rejection};

use crate::mock_io::{
    BusFaults, BusOp, ManualClock, MockDelay, RecordingBus, RecordingSink, open_from,
};

const DEVICE: &str = "/dev/ttyUSB0";

struct Rig {
    service: DoorService<RecordingBus, MockDelay, ManualClock>,
    bus: RecordingBus,
    clock: ManualClock,
    delay: MockDelay,
    debounce: DebounceState,
    sink: RecordingSink,
}

impl Rig {
    fn new(open_delay_secs: u64) -> Self {
        let clock = ManualClock::new();
        let bus = RecordingBus::new();
        let delay = MockDelay::new(&clock);
        let sequencer = Sequencer::new(bus.clone(), DEVICE, delay.clone());
        let service = DoorService::new(
            Validator::new(Duration::from_secs(open_delay_secs)),
            sequencer,
            clock.clone(),
        );
        Self {
            service,
            bus,
            clock,
            delay,
            debounce: DebounceState::new(),
            sink: RecordingSink::new(),
        }
    }

    fn send(&mut self, payload: &[u8]) -> Outcome {
        self.service.handle(payload, &mut self.debounce, &mut self.sink)
    }

    fn send_at(&mut self, at_secs: u64, payload: &[u8]) -> Outcome {
        self.clock.set(Duration::from_secs(at_secs));
        self.send(payload)
    }
}

#[test]
fn first_open_after_startup_is_accepted_immediately() {
    let mut rig = Rig::new(5);
    let outcome = rig.send(&open_from("alice"));

    assert_eq!(
        outcome,
        Outcome::Actuated {
            username: "alice".into()
        }
    );
    assert_eq!(
        rig.bus.ops(),
        vec![
            BusOp::Open(DEVICE.into()),
            BusOp::Write(UNLOCK_FRAME.to_vec()),
            BusOp::Write(LOCK_FRAME.to_vec()),
            BusOp::Close,
        ]
    );
    assert_eq!(rig.delay.waits(), vec![Duration::from_secs(1)]);
    assert_eq!(rig.debounce.last_actuation(), Some(rig.clock.at(Duration::ZERO)));
    assert_eq!(rig.service.sequencer().phase(), ActuationPhase::Idle);
}

#[test]
fn debounce_window_rejects_then_reopens() {
    let mut rig = Rig::new(5);

    assert!(matches!(rig.send_at(0, &open_from("alice")), Outcome::Actuated { .. }));

    match rig.send_at(2, &open_from("bob")) {
        Outcome::Rejected(Rejection::TooSoon { elapsed, window }) => {
            assert_eq!(elapsed, Duration::from_secs(2));
            assert_eq!(window, Duration::from_secs(5));
        }
        other => panic!("expected TooSoon, got {other:?}"),
    }

    assert!(matches!(rig.send_at(6, &open_from("carol")), Outcome::Actuated { .. }));
    assert_eq!(rig.bus.writes().len(), 4);
    assert_eq!(rig.debounce.last_actuation(), Some(rig.clock.at(Duration::from_secs(6))));

    let stats = rig.service.stats();
    assert_eq!((stats.received, stats.actuated, stats.rejected), (3, 2, 1));
}

#[test]
fn window_boundary_is_inclusive() {
    let mut rig = Rig::new(5);
    rig.send_at(0, &open_from("alice"));
    assert!(matches!(rig.send_at(5, &open_from("alice")), Outcome::Actuated { .. }));
}

#[test]
fn unknown_command_leaves_debounce_untouched() {
    let mut rig = Rig::new(5);
    let outcome = rig.send(br#"{"command":"close","username":"bob"}"#);

    assert_eq!(outcome, Outcome::Rejected(Rejection::UnknownCommand("close".into())));
    assert_eq!(rig.debounce.last_actuation(), None);
    assert!(rig.bus.ops().is_empty());
}

#[test]
fn rejections_never_touch_the_relay() {
    let mut rig = Rig::new(5);
    let payloads: [&[u8]; 5] = [
        b"not json",
        br#"{"username":"alice"}"#,
        br#"{"command":"open"}"#,
        br#"{"command":"open","username":""}"#,
        br#"{"message":"Connected!"}"#,
    ];
    for p in payloads {
        assert!(matches!(rig.send(p), Outcome::Rejected(_)));
    }
    assert!(rig.bus.ops().is_empty());
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::CommandRejected(_))),
        5
    );
}

#[test]
fn lock_write_failure_still_closes_and_keeps_timestamp() {
    let mut rig = Rig::new(5);
    rig.bus.inject(BusFaults {
        write: Some(1),
        ..BusFaults::default()
    });

    let outcome = rig.send(&open_from("alice"));

    match outcome {
        Outcome::ActuationFailed { username, fault } => {
            assert_eq!(username, "alice");
            assert!(matches!(fault, ActuationFault::LockWrite(_)));
        }
        other => panic!("expected ActuationFailed, got {other:?}"),
    }
    assert_eq!(rig.bus.ops().last(), Some(&BusOp::Close));
    assert_eq!(rig.bus.open_links(), 0);
    assert_eq!(rig.service.sequencer().phase(), ActuationPhase::Idle);
    assert_eq!(rig.debounce.last_actuation(), Some(rig.clock.at(Duration::ZERO)));

    // The pipeline keeps working afterwards.
    rig.bus.inject(BusFaults::default());
    assert!(matches!(rig.send_at(10, &open_from("alice")), Outcome::Actuated { .. }));
}

#[test]
fn unlock_write_failure_skips_hold_but_locks() {
    let mut rig = Rig::new(5);
    rig.bus.inject(BusFaults {
        write: Some(0),
        ..BusFaults::default()
    });

    let outcome = rig.send(&open_from("alice"));

    assert!(matches!(
        outcome,
        Outcome::ActuationFailed {
            fault: ActuationFault::UnlockWrite(_),
            ..
        }
    ));
    assert!(rig.delay.waits().is_empty());
    assert_eq!(rig.bus.writes(), vec![LOCK_FRAME.to_vec()]);
    assert_eq!(rig.bus.open_links(), 0);
}

#[test]
fn unlock_failure_does_not_consume_the_window() {
    let mut rig = Rig::new(5);
    rig.bus.inject(BusFaults {
        write: Some(0),
        ..BusFaults::default()
    });
    assert!(matches!(
        rig.send_at(0, &open_from("alice")),
        Outcome::ActuationFailed {
            fault: ActuationFault::UnlockWrite(_),
            ..
        }
    ));
    assert_eq!(rig.debounce.last_actuation(), None);

    rig.bus.inject(BusFaults::default());
    assert_eq!(
        rig.send_at(1, &open_from("alice")),
        Outcome::Actuated {
            username: "alice".into()
        }
    );
    assert_eq!(rig.debounce.last_actuation(), Some(rig.clock.at(Duration::from_secs(1))));
}

#[test]
fn open_failure_does_not_consume_the_window() {
    let mut rig = Rig::new(5);
    rig.bus.inject(BusFaults {
        open: true,
        ..BusFaults::default()
    });

    assert!(matches!(
        rig.send(&open_from("alice")),
        Outcome::ActuationFailed {
            fault: ActuationFault::PortOpen(_),
            ..
        }
    ));
    assert_eq!(rig.debounce.last_actuation(), None);

    rig.bus.inject(BusFaults::default());
    assert!(matches!(rig.send_at(1, &open_from("alice")), Outcome::Actuated { .. }));
}

#[test]
fn phases_follow_the_unlock_hold_lock_order() {
    let mut rig = Rig::new(5);
    rig.send(&open_from("alice"));

    let phases: Vec<(ActuationPhase, ActuationPhase)> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::PhaseChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![
            (ActuationPhase::Idle, ActuationPhase::Unlocking),
            (ActuationPhase::Unlocking, ActuationPhase::Holding),
            (ActuationPhase::Holding, ActuationPhase::Locking),
            (ActuationPhase::Locking, ActuationPhase::Idle),
        ]
    );
    assert_eq!(rig.sink.events.last(), Some(&AppEvent::ActuationCompleted));
}
