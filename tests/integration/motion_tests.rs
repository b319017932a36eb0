//! Motion coordinator against the simulated gantry.

use std::cell::RefCell;
use std::rc::Rc;

use paintbot::adapters::sim::{AxisCommand, SimEvent};
use paintbot::error::MotionError;
use paintbot::motion::{Axis, Motor, MotionRequest, MoveOutcome, Trigger};

use super::mock_hw::Bench;

#[test]
fn request_at_current_position_issues_no_command() {
    let mut bench = Bench::new();
    let x = bench.logical(Motor::X);
    let y = bench.logical(Motor::YLeft);
    let z = bench.logical(Motor::Z);
    bench.clear_logs();

    let request = MotionRequest::xyz((x, 1_000), (y, 1_000), (z, 1_000)).unwrap();
    let outcome = bench.motion().move_synchronized(&request).unwrap();

    assert_eq!(outcome, MoveOutcome::Completed);
    for m in Motor::TRANSLATIONAL {
        assert!(bench.commands(m).is_empty(), "{m} was commanded");
    }
    assert_eq!(bench.now_ms(), 0, "no poll happened");
}

#[test]
fn completed_move_reaches_every_target() {
    let mut bench = Bench::new();
    bench.zero_all();
    let request = MotionRequest::xyz((1_500, 10_000), (-700, 5_000), (-300, 4_000)).unwrap();
    let outcome = bench.motion().move_synchronized(&request).unwrap();

    assert_eq!(outcome, MoveOutcome::Completed);
    assert_eq!(bench.logical(Motor::X), 1_500);
    assert_eq!(bench.logical(Motor::YLeft), -700);
    assert_eq!(bench.logical(Motor::YRight), -700);
    assert_eq!(bench.logical(Motor::Z), -300);
    for m in Motor::TRANSLATIONAL {
        assert!(!bench.is_running(m));
    }
}

#[test]
fn gantry_motors_receive_identical_commands() {
    let mut bench = Bench::new();
    bench.zero_all();
    let request = MotionRequest::single(Axis::Y, 3_000, 5_000).unwrap();
    bench.motion().move_synchronized(&request).unwrap();

    let left = bench.commands(Motor::YLeft);
    let right = bench.commands(Motor::YRight);
    assert_eq!(left, vec![AxisCommand::Speed(5_000), AxisCommand::MoveTo(3_000)]);
    assert_eq!(left, right);
    assert!(bench.commands(Motor::X).is_empty());
}

#[test]
fn rotation_request_without_table_is_rejected_before_any_command() {
    let mut bench = Bench::without_rotation();
    bench.zero_all();
    let request = MotionRequest::single(Axis::X, 1_000, 1_000)
        .and_then(|r| r.with(Axis::Rotation, 800, 1_000))
        .unwrap();

    let result = bench.motion().move_synchronized(&request);

    assert_eq!(result, Err(MotionError::AxisUnavailable(Axis::Rotation)));
    assert!(bench.commands(Motor::X).is_empty());
    assert_eq!(bench.now_ms(), 0);
}

#[test]
fn rotate_to_angle_takes_shortest_path() {
    let mut bench = Bench::new();
    bench.zero_all();
    let speed = bench.config.rotation.default_speed_hz;

    bench.motion().rotate_to_angle(270.0, speed).unwrap();

    let per_turn = bench.config.steps_per_revolution();
    let pos = bench.logical(Motor::Rotation);
    assert!(pos < 0, "270 deg from 0 goes backwards, got {pos}");
    assert!(pos.abs() <= per_turn / 2);
}

#[test]
fn abort_stops_every_motor_in_place() {
    let mut bench = Bench::new();
    bench.zero_all();
    bench.world.borrow_mut().schedule(30, SimEvent::Abort);

    let request = MotionRequest::xyz((10_000, 1_000), (10_000, 2_000), (-10_000, 500)).unwrap();
    let outcome = bench.motion().move_synchronized(&request).unwrap();
    assert_eq!(outcome, MoveOutcome::Aborted);

    let stopped: Vec<i32> = Motor::TRANSLATIONAL.map(|m| bench.logical(m)).to_vec();
    for (i, m) in Motor::TRANSLATIONAL.into_iter().enumerate() {
        assert!(!bench.is_running(m));
        assert_eq!(
            bench.commands(m).last(),
            Some(&AxisCommand::ForceStop(stopped[i])),
            "{m} target redefined at its stop position"
        );
    }
    assert!(stopped[0] > 0 && stopped[0] < 10_000);

    // Time passing afterwards moves nothing.
    bench.world.borrow_mut().advance(200_000_000);
    for (i, m) in Motor::TRANSLATIONAL.into_iter().enumerate() {
        assert_eq!(bench.logical(m), stopped[i]);
    }
}

#[test]
fn abort_is_not_cleared_by_the_coordinator() {
    let mut bench = Bench::new();
    bench.zero_all();
    bench.signals.request_abort();
    let request = MotionRequest::single(Axis::X, 1_000, 1_000).unwrap();
    assert_eq!(
        bench.motion().move_synchronized(&request).unwrap(),
        MoveOutcome::Aborted
    );
    assert!(bench.signals.abort_requested());
}

#[test]
fn trigger_fires_once_at_threshold() {
    let mut bench = Bench::new();
    bench.zero_all();
    let world = Rc::clone(&bench.world);
    let fired = RefCell::new(Vec::new());

    let request = MotionRequest::single(Axis::X, 100, 1_000).unwrap();
    let outcome = bench
        .motion()
        .move_synchronized_with_trigger(
            &request,
            Trigger::new(Axis::X, 80, || {
                fired
                    .borrow_mut()
                    .push(world.borrow().motor(Motor::X).logical());
            }),
        )
        .unwrap();

    assert_eq!(outcome, MoveOutcome::Completed);
    let fired = fired.into_inner();
    assert_eq!(fired.len(), 1);
    assert!(fired[0] >= 80, "fired early at {}", fired[0]);
}

#[test]
fn coarse_polls_still_fire_trigger_after_the_move() {
    let mut bench = Bench::new();
    bench.zero_all();
    let count = RefCell::new(0);

    // 50 steps per poll: the threshold is only crossed at the final position.
    let request = MotionRequest::single(Axis::X, 100, 50_000).unwrap();
    bench
        .motion()
        .move_synchronized_with_trigger(&request, Trigger::new(Axis::X, 99, || {
            *count.borrow_mut() += 1;
        }))
        .unwrap();

    assert_eq!(count.into_inner(), 1);
}

#[test]
fn trigger_direction_follows_the_move() {
    let mut bench = Bench::new();
    bench.zero_all();
    let world = Rc::clone(&bench.world);
    let fired_at = RefCell::new(None);

    let request = MotionRequest::single(Axis::X, -100, 1_000).unwrap();
    bench
        .motion()
        .move_synchronized_with_trigger(&request, Trigger::new(Axis::X, -40, || {
            *fired_at.borrow_mut() = Some(world.borrow().motor(Motor::X).logical());
        }))
        .unwrap();

    assert_eq!(fired_at.into_inner(), Some(-40));
}

#[test]
fn abort_before_threshold_never_fires() {
    let mut bench = Bench::new();
    bench.zero_all();
    bench.world.borrow_mut().schedule(10, SimEvent::Abort);
    let count = RefCell::new(0);

    let request = MotionRequest::single(Axis::X, 1_000, 1_000).unwrap();
    let outcome = bench
        .motion()
        .move_synchronized_with_trigger(&request, Trigger::new(Axis::X, 500, || {
            *count.borrow_mut() += 1;
        }))
        .unwrap();

    assert_eq!(outcome, MoveOutcome::Aborted);
    assert_eq!(count.into_inner(), 0);
}

#[test]
fn pause_freezes_motion_and_resumes_without_new_command() {
    let mut bench = Bench::new();
    bench.zero_all();
    {
        let mut w = bench.world.borrow_mut();
        w.schedule(20, SimEvent::Pause);
        w.schedule(520, SimEvent::Resume);
    }

    let request = MotionRequest::single(Axis::X, 1_000, 1_000).unwrap();
    let outcome = bench.motion().move_synchronized(&request).unwrap();

    assert_eq!(outcome, MoveOutcome::Completed);
    assert_eq!(bench.logical(Motor::X), 1_000);
    assert_eq!(
        bench.commands(Motor::X),
        vec![AxisCommand::Speed(1_000), AxisCommand::MoveTo(1_000)]
    );
    let snapshots = bench.world.borrow().service_snapshots.clone();
    assert!(snapshots.len() >= 4, "control channel serviced while paused");
    assert!(snapshots.windows(2).all(|w| w[0] == w[1]));
    assert!(bench.now_ms() >= 1_500);
}

#[test]
fn dwell_does_not_count_paused_time() {
    let mut bench = Bench::new();
    {
        let mut w = bench.world.borrow_mut();
        w.schedule(10, SimEvent::Pause);
        w.schedule(1_010, SimEvent::Resume);
    }
    let outcome = bench.motion().dwell(100);
    assert_eq!(outcome, MoveOutcome::Completed);
    assert!(bench.now_ms() >= 1_100);
}

#[test]
fn dwell_ends_on_abort() {
    let mut bench = Bench::new();
    bench.world.borrow_mut().schedule(50, SimEvent::Abort);
    assert_eq!(bench.motion().dwell(10_000), MoveOutcome::Aborted);
    assert!(bench.now_ms() < 100);
}

#[test]
fn trigger_checked_when_nothing_moves() {
    let mut bench = Bench::new();
    bench.zero_all();
    let request = MotionRequest::single(Axis::X, 100, 1_000).unwrap();
    bench.motion().move_synchronized(&request).unwrap();
    bench.clear_logs();

    let count = RefCell::new(0);
    let outcome = bench
        .motion()
        .move_synchronized_with_trigger(&request, Trigger::new(Axis::X, 80, || {
            *count.borrow_mut() += 1;
        }))
        .unwrap();
    assert_eq!(outcome, MoveOutcome::Completed);
    assert_eq!(count.into_inner(), 1, "already past the threshold");
    assert!(bench.commands(Motor::X).is_empty());

    let count = RefCell::new(0);
    bench
        .motion()
        .move_synchronized_with_trigger(&request, Trigger::new(Axis::X, 120, || {
            *count.borrow_mut() += 1;
        }))
        .unwrap();
    assert_eq!(count.into_inner(), 0, "threshold never reached");
}

#[test]
fn limit_switch_during_move_is_not_fatal() {
    let mut bench = Bench::new();
    bench.zero_all();
    // X starts clear of its switch; this target runs past the trip point.
    let target = -bench.physical(Motor::X) - 500;

    let request = MotionRequest::single(Axis::X, target, 5_000).unwrap();
    let outcome = bench.motion().move_synchronized(&request).unwrap();

    assert_eq!(outcome, MoveOutcome::Completed);
    assert_eq!(bench.logical(Motor::X), target);
    assert!(bench.rig.switches.is_triggered(Motor::X));
    assert_eq!(
        bench.commands(Motor::X),
        vec![AxisCommand::Speed(5_000), AxisCommand::MoveTo(target)]
    );
}
