//! Supervisor loop tests against a scripted broker.

use std::time::Duration;

use doorman::app::events::AppEvent;
use doorman::app::sequencer::Sequencer;
use doorman::app::service::DoorService;
use doorman::app::validator::Validator;
use doorman::error::{ChannelError, CycleError, CyclePhase, Rejection};
use doorman::supervisor::{CycleState, LIVENESS_PAYLOAD, RESTART_DELAY, Supervisor};

use crate::mock_io::{
    ChannelOp, ManualClock, MockDelay, RecordingBus, RecordingSink, Script, ScriptedChannel, Step,
    open_from,
};

const TOPIC: &str = "doorman/front";

type TestSupervisor =
    Supervisor<ScriptedChannel, RecordingBus, MockDelay, ManualClock, MockDelay, RecordingSink>;

struct Rig {
    supervisor: TestSupervisor,
    bus: RecordingBus,
    clock: ManualClock,
    restart_delay: MockDelay,
}

fn rig(scripts: Vec<Script>) -> Rig {
    let clock = ManualClock::new();
    let bus = RecordingBus::new();
    let sequencer = Sequencer::new(bus.clone(), "/dev/ttyUSB0", MockDelay::new(&clock));
    let service = DoorService::new(
        Validator::new(Duration::from_secs(5)),
        sequencer,
        clock.clone(),
    );
    let restart_delay = MockDelay::new(&clock);
    let supervisor = Supervisor::new(
        ScriptedChannel::new(&clock, scripts),
        service,
        TOPIC,
        restart_delay.clone(),
        RecordingSink::new(),
    );
    Rig {
        supervisor,
        bus,
        clock,
        restart_delay,
    }
}

fn deliver(payload: Vec<u8>) -> Step {
    Step::Deliver(TOPIC.to_owned(), payload)
}

fn transport_fault() -> ChannelError {
    ChannelError::Transport("connection reset by peer".into())
}

#[test]
fn cycle_subscribes_before_announcing() {
    let mut rig = rig(vec![Script::session(vec![], transport_fault())]);
    rig.supervisor.run_cycle();

    assert_eq!(
        rig.supervisor.channel().ops(),
        vec![
            ChannelOp::Connect,
            ChannelOp::Subscribe(TOPIC.into()),
            ChannelOp::Publish(TOPIC.into(), LIVENESS_PAYLOAD.to_vec()),
        ]
    );
}

#[test]
fn transport_fault_schedules_exactly_one_restart() {
    let mut rig = rig(vec![
        Script::session(vec![deliver(open_from("alice"))], transport_fault()),
        Script::session(vec![], ChannelError::Closed),
    ]);

    let err = rig.supervisor.step();

    assert_eq!(err, CycleError::new(CyclePhase::Listen, transport_fault()));
    assert_eq!(rig.supervisor.restarts(), 1);
    assert_eq!(rig.supervisor.state(), CycleState::Restarting);
    assert_eq!(rig.restart_delay.waits(), vec![RESTART_DELAY]);
    assert_eq!(
        rig.supervisor
            .sink()
            .count(|e| matches!(e, AppEvent::RestartScheduled { .. })),
        1
    );

    // The restarted cycle subscribes and announces again.
    rig.supervisor.run_cycle();
    let ops = rig.supervisor.channel().ops();
    let subscribes = ops
        .iter()
        .filter(|op| matches!(op, ChannelOp::Subscribe(t) if t == TOPIC))
        .count();
    let announces = ops
        .iter()
        .filter(|op| matches!(op, ChannelOp::Publish(_, p) if p == LIVENESS_PAYLOAD))
        .count();
    assert_eq!((subscribes, announces), (2, 2));
    assert_eq!(rig.supervisor.cycles(), 2);
}

#[test]
fn debounce_survives_a_restart() {
    let mut rig = rig(vec![
        Script::session(vec![deliver(open_from("alice"))], transport_fault()),
        Script::session(vec![deliver(open_from("bob"))], ChannelError::Closed),
    ]);
    let restart = Duration::from_secs(2);
    rig.supervisor = rig.supervisor.with_restart_delay(restart);

    rig.supervisor.step();
    rig.supervisor.run_cycle();

    // alice at t=0, 1 s hold, 2 s restart: bob arrives at t=3.
    assert_eq!(rig.clock.elapsed(), Duration::from_secs(3));
    assert_eq!(rig.bus.writes().len(), 2);
    let rejected_too_soon = rig.supervisor.sink().count(|e| {
        matches!(e, AppEvent::CommandRejected(Rejection::TooSoon { .. }))
    });
    assert_eq!(rejected_too_soon, 1);
}

#[test]
fn connect_failure_is_a_connect_phase_fault() {
    let mut rig = rig(vec![Script::RefuseConnect(ChannelError::Refused(
        "NotAuthorized".into(),
    ))]);

    let err = rig.supervisor.step();

    assert_eq!(err.phase, CyclePhase::Connect);
    assert_eq!(rig.supervisor.channel().ops(), vec![ChannelOp::Connect]);
    assert_eq!(rig.supervisor.restarts(), 1);
}

#[test]
fn subscribe_failure_skips_the_announcement() {
    let mut rig = rig(vec![Script::Session {
        subscribe: Err(ChannelError::Subscribe("not authorized".into())),
        publish: Ok(()),
        steps: vec![deliver(open_from("alice"))],
        end: Ok(()),
    }]);

    let err = rig.supervisor.run_cycle();

    assert_eq!(err.phase, CyclePhase::Subscribe);
    assert!(
        !rig.supervisor
            .channel()
            .ops()
            .iter()
            .any(|op| matches!(op, ChannelOp::Publish(..)))
    );
    assert!(rig.bus.ops().is_empty());
}

#[test]
fn announce_failure_ends_the_cycle() {
    let mut rig = rig(vec![Script::Session {
        subscribe: Ok(()),
        publish: Err(ChannelError::Publish("queue full".into())),
        steps: vec![],
        end: Ok(()),
    }]);

    assert_eq!(rig.supervisor.run_cycle().phase, CyclePhase::Announce);
}

#[test]
fn clean_listen_end_counts_as_closed() {
    let mut rig = rig(vec![Script::Session {
        subscribe: Ok(()),
        publish: Ok(()),
        steps: vec![],
        end: Ok(()),
    }]);

    let err = rig.supervisor.run_cycle();

    assert_eq!(err, CycleError::new(CyclePhase::Listen, ChannelError::Closed));
    assert_eq!(
        rig.supervisor
            .sink()
            .count(|e| matches!(e, AppEvent::CycleFaulted(_))),
        1
    );
}

#[test]
fn own_announcement_echo_is_rejected_harmlessly() {
    let mut rig = rig(vec![Script::session(
        vec![deliver(LIVENESS_PAYLOAD.to_vec()), deliver(open_from("alice"))],
        ChannelError::Closed,
    )]);

    rig.supervisor.run_cycle();

    let stats = rig.supervisor.service().stats();
    assert_eq!((stats.received, stats.rejected, stats.actuated), (2, 1, 1));
    assert!(rig.supervisor.sink().events.iter().any(|e| {
        *e == AppEvent::CommandRejected(Rejection::MissingField("command"))
    }));
}
