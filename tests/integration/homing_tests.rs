//! Homing sequencer against the simulated gantry.

use paintbot::adapters::sim::AxisCommand;
use paintbot::config::MachineConfig;
use paintbot::error::HomingFailure;
use paintbot::motion::{Motor, RotationStatus};

use super::mock_hw::Bench;

fn quick_timeouts() -> MachineConfig {
    let mut config = MachineConfig::default();
    config.homing.timeout_ms = 3_000;
    config
}

#[test]
fn homes_every_axis_from_open_switches() {
    let mut bench = Bench::new();
    let report = bench.home();

    assert!(report.success(), "{report:?}");
    assert_eq!(report.outcome.rotation, RotationStatus::Homed);
    assert_eq!(report.switch_positions, Some([0, 0, 0, 0]));

    let away = bench.config.inches_to_steps(bench.config.homing.move_away_inches);
    assert_eq!(report.move_away_positions, Some([away, away, away, -away]));

    for m in Motor::TRANSLATIONAL {
        assert_eq!(bench.logical(m), 0, "{m} zeroed after finalize");
        assert!(!bench.is_running(m));
    }
}

#[test]
fn homing_ends_clear_of_the_switches() {
    let mut bench = Bench::new();
    bench.home();
    // Logical zero sits on the open side of each switch (trip point at physical 0).
    assert!(bench.physical(Motor::X) > 0);
    assert!(bench.physical(Motor::YLeft) > 0);
    assert!(bench.physical(Motor::Z) < 0);
}

#[test]
fn switches_stop_motors_independently() {
    let mut bench = Bench::new();
    // Y-right reaches its switch 500 steps later than Y-left.
    bench
        .world
        .borrow_mut()
        .switch_mut(Motor::YRight)
        .unwrap()
        .trip_at = -500;

    let report = bench.home();

    assert!(report.success());
    assert!(bench.commands(Motor::YLeft).contains(&AxisCommand::ForceStop(0)));
    assert!(bench.commands(Motor::YRight).contains(&AxisCommand::ForceStop(0)));
    let left = bench.physical(Motor::YLeft);
    let right = bench.physical(Motor::YRight);
    assert!(right < left - 400, "Y-right kept running: left {left}, right {right}");
}

#[test]
fn stuck_switch_times_out_and_keeps_travelled_position() {
    let mut bench = Bench::with_config(quick_timeouts(), true);
    bench.world.borrow_mut().switch_mut(Motor::X).unwrap().forced = Some(false);

    let report = bench.home();

    assert!(!report.success());
    assert_eq!(report.failure, Some(HomingFailure::SwitchTimeout));
    assert!(!report.outcome.is_homed(Motor::X));
    assert!(report.outcome.is_homed(Motor::YLeft));
    assert!(report.outcome.is_homed(Motor::Z));
    assert_eq!(report.move_away_positions, None);

    let x = bench.logical(Motor::X);
    assert!(!bench.is_running(Motor::X));
    assert_ne!(x, 0, "timed-out motor is not zeroed");
    assert_eq!(x, bench.physical(Motor::X), "frame never redefined");
    let last_stop = bench
        .commands(Motor::X)
        .into_iter()
        .rev()
        .find(|c| matches!(c, AxisCommand::ForceStop(_)));
    assert_eq!(last_stop, Some(AxisCommand::ForceStop(x)));
}

#[test]
fn move_away_timeout_is_reported() {
    let mut config = MachineConfig::default();
    config.homing.move_away_timeout_ms = 10;
    let mut bench = Bench::with_config(config, true);

    let report = bench.home();

    assert_eq!(report.failure, Some(HomingFailure::MoveAwayTimeout));
    assert!(report.switch_positions.is_some());
    for m in Motor::TRANSLATIONAL {
        assert!(!bench.is_running(m));
    }
}

#[test]
fn rotation_failure_is_only_a_warning() {
    let mut config = MachineConfig::default();
    config.homing.rotation_timeout_ms = 10;
    let mut bench = Bench::with_config(config, true);
    // Table left a quarter turn out.
    bench.world.borrow_mut().motor_mut(Motor::Rotation).physical = 800;

    let report = bench.home();

    assert_eq!(report.outcome.rotation, RotationStatus::Failed);
    assert!(report.success());
    assert!(!bench.is_running(Motor::Rotation));
}

#[test]
fn rotation_absent_without_table() {
    let mut bench = Bench::without_rotation();
    let report = bench.home();
    assert_eq!(report.outcome.rotation, RotationStatus::Absent);
    assert!(report.success());
}

#[test]
fn default_accelerations_restored_on_success_and_failure() {
    for stuck in [false, true] {
        let mut bench = Bench::with_config(quick_timeouts(), true);
        if stuck {
            bench.world.borrow_mut().switch_mut(Motor::Z).unwrap().forced = Some(false);
        }
        bench.home();

        let w = bench.world.borrow();
        assert_eq!(w.motor(Motor::X).accel, bench.config.x.default_accel);
        assert_eq!(w.motor(Motor::YRight).accel, bench.config.y.default_accel);
        assert_eq!(w.motor(Motor::Z).accel, bench.config.z.default_accel);
        assert_eq!(w.motor(Motor::Rotation).accel, bench.config.rotation.default_accel);
    }
}

#[test]
fn homing_uses_homing_speed() {
    let mut bench = Bench::new();
    bench.home();
    let x = bench.commands(Motor::X);
    let run_at = x
        .iter()
        .position(|c| matches!(c, AxisCommand::Run(_)))
        .unwrap();
    assert!(x[..run_at].contains(&AxisCommand::Speed(bench.config.x.homing_speed_hz)));
}
