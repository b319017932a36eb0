//! Painting program and Painting state on the simulated gantry.

use std::sync::Arc;

use paintbot::adapters::sim::{AxisCommand, SimEvent, SimWorld, ToolEvent};
use paintbot::app::commands::AppCommand;
use paintbot::app::ports::PaintProgram;
use paintbot::app::service::MachineService;
use paintbot::config::MachineConfig;
use paintbot::error::MotionError;
use paintbot::fsm::StateId;
use paintbot::fsm::context::{ControlSignals, PaintingStep};
use paintbot::motion::{Axis, Motor, MoveOutcome};
use paintbot::painting::AllSidesProgram;
use paintbot::painting::sides::paint_side;

use super::mock_hw::{Bench, RecordingSink, ScriptedProgram, scripted_rig};

const TICKS: u32 = 50;

/// Single-pass side 1 only matters for most checks; keep the rest short.
fn short_job() -> MachineConfig {
    let mut config = MachineConfig::default();
    config.painting.inter_coat_delay_secs = 1;
    config.painting.pressurize_ms = 100;
    for side in &mut config.painting.sides[1..] {
        side.sweeps = 2;
        side.sweep_y = 2.0;
    }
    config
}

fn homed_bench(config: MachineConfig) -> Bench {
    let mut bench = Bench::with_config(config, true);
    assert!(bench.home().success());
    bench.clear_logs();
    bench
}

#[test]
fn single_pass_cuts_gun_before_end_of_pass() {
    let mut bench = homed_bench(short_job());
    let config = bench.config.clone();
    let (mut motion, tools) = bench.rig.motion_and_tools(&bench.signals, &config);

    let outcome = paint_side(&mut motion, tools, &config, 1).unwrap();
    assert_eq!(outcome, MoveOutcome::Completed);

    let side = config.painting.sides[0];
    let start = config.inches_to_steps(side.start_x);
    let end = start + config.inches_to_steps(side.shift_x);
    let lead = config.inches_to_steps(config.painting.gun_off_lead_inches);

    let gun = bench.world.borrow().gun_history();
    assert_eq!(gun.len(), 2, "{gun:?}");
    assert_eq!(gun[0], (true, start));
    let (on, off_x) = gun[1];
    assert!(!on);
    assert!(off_x >= end - lead && off_x < end, "gun off at {off_x}");
}

#[test]
fn serpentine_alternates_sweeps_with_gun_per_sweep() {
    let mut bench = homed_bench(short_job());
    let config = bench.config.clone();
    let (mut motion, tools) = bench.rig.motion_and_tools(&bench.signals, &config);

    paint_side(&mut motion, tools, &config, 2).unwrap();

    let side = config.painting.sides[1];
    let gun = bench.world.borrow().gun_history();
    assert_eq!(gun.len(), 2 * usize::from(side.sweeps));

    // Ends one sweep down and one shift towards -X from the start.
    let start_x = config.inches_to_steps(side.start_x);
    let shift = config.inches_to_steps(side.shift_x);
    assert_eq!(bench.logical(Motor::X), start_x - shift);
    let y = bench.logical(Motor::YLeft);
    assert_eq!(y, config.inches_to_steps(side.start_y), "even sweep count ends back at start Y");
    assert_eq!(
        bench.logical(Motor::Z),
        config.inches_to_steps(side.safe_z_height)
    );
    assert!(!bench.world.borrow().is_gun_on());
}

#[test]
fn first_sweep_runs_slower() {
    let mut bench = homed_bench(short_job());
    let config = bench.config.clone();
    let (mut motion, tools) = bench.rig.motion_and_tools(&bench.signals, &config);
    paint_side(&mut motion, tools, &config, 3).unwrap();

    let side = config.painting.sides[2];
    let speeds: Vec<u32> = bench
        .commands(Motor::YLeft)
        .into_iter()
        .filter_map(|c| match c {
            AxisCommand::Speed(s) => Some(s),
            _ => None,
        })
        .collect();
    assert!(speeds.contains(&(side.paint_y_speed_hz * 3 / 4)));
    assert!(speeds.contains(&side.paint_y_speed_hz));
}

#[test]
fn side_turns_table_to_its_angle() {
    let mut bench = homed_bench(short_job());
    let config = bench.config.clone();
    let (mut motion, tools) = bench.rig.motion_and_tools(&bench.signals, &config);
    paint_side(&mut motion, tools, &config, 2).unwrap();

    assert_eq!(
        bench.logical(Motor::Rotation),
        config.degrees_to_steps(config.painting.sides[1].rotation_angle)
    );
}

#[test]
fn all_sides_program_paints_back_to_front_and_leaves_gun_off() {
    let mut bench = homed_bench(short_job());
    let config = bench.config.clone();
    let mut program = AllSidesProgram::new();
    program.request_coats(2);
    let (mut motion, tools) = bench.rig.motion_and_tools(&bench.signals, &config);

    let outcome = program.paint_all_sides(&mut motion, tools, &config).unwrap();
    assert_eq!(outcome, MoveOutcome::Completed);

    let w = bench.world.borrow();
    assert!(!w.is_gun_on());
    let servo: Vec<u16> = w
        .tool_log
        .iter()
        .filter_map(|r| match r.event {
            ToolEvent::Servo(a) => Some(a),
            _ => None,
        })
        .collect();
    // Coat: reset, sides 4..1; inter-coat park; coat two.
    assert_eq!(servo[0], 0);
    assert!(servo.contains(&180), "inter-coat servo park");
    // Loading bar crawl ends at its configured X.
    assert!(
        w.motor(Motor::X)
            .commands
            .contains(&AxisCommand::MoveTo(config.inches_to_steps(config.painting.loading_bar_end_x)))
    );
}

#[test]
fn program_without_table_keeps_painting() {
    let mut config = short_job();
    config.painting.coats = 1;
    let mut bench = Bench::with_config(config, false);
    assert!(bench.home().success());
    let config = bench.config.clone();
    let (mut motion, tools) = bench.rig.motion_and_tools(&bench.signals, &config);

    let outcome = AllSidesProgram::new().paint_all_sides(&mut motion, tools, &config);
    assert_eq!(outcome, Ok(MoveOutcome::Completed));
}

#[test]
fn abort_mid_program_stops_with_gun_off() {
    let mut bench = homed_bench(short_job());
    let at = bench.now_ms() + 3_000;
    bench.world.borrow_mut().schedule(at, SimEvent::Abort);
    let config = bench.config.clone();
    let (mut motion, tools) = bench.rig.motion_and_tools(&bench.signals, &config);

    let outcome = AllSidesProgram::new().paint_all_sides(&mut motion, tools, &config);
    assert_eq!(outcome, Ok(MoveOutcome::Aborted));
    assert!(!bench.world.borrow().is_gun_on());
    for m in Motor::TRANSLATIONAL {
        assert!(!bench.is_running(m));
    }
}

// ── Painting state with a scripted program ────────────────────

fn scripted_service(
    program: ScriptedProgram,
) -> (
    MachineService<super::mock_hw::ScriptedPlatform>,
    paintbot::adapters::sim::SharedWorld,
    RecordingSink,
) {
    let config = MachineConfig::default();
    let signals = Arc::new(ControlSignals::new());
    let world = SimWorld::new(Arc::clone(&signals), &config).shared();
    let rig = scripted_rig(&world, &config);
    let mut service = MachineService::new(rig, signals, config, program);
    let mut sink = RecordingSink::new();
    service.start_from(StateId::Homing, &mut sink);
    assert!(service.run_until_idle(TICKS, &mut sink));
    world.borrow_mut().clear_logs();
    (service, world, RecordingSink::new())
}

#[test]
fn completed_program_parks_then_homes() {
    let (mut service, world, mut sink) = scripted_service(ScriptedProgram::default());
    service.handle_command(AppCommand::PaintAllSides, &mut sink);
    assert!(service.run_until_idle(TICKS, &mut sink));

    assert_eq!(service.context().program.runs, 1);
    let park = service.config().painting.park_before_homing;
    let park_x = service.config().inches_to_steps(park[0]);
    assert!(
        world
            .borrow()
            .motor(Motor::X)
            .commands
            .contains(&AxisCommand::MoveTo(park_x))
    );
    assert_eq!(
        sink.transitions(),
        vec![
            (StateId::Idle, StateId::Painting),
            (StateId::Painting, StateId::Homing),
            (StateId::Homing, StateId::Idle),
        ]
    );
    assert_eq!(service.context().painting_step, PaintingStep::Idle);
}

#[test]
fn failed_program_goes_straight_to_homing() {
    let program = ScriptedProgram {
        result: Err(MotionError::AxisUnavailable(Axis::Rotation)),
        ..ScriptedProgram::default()
    };
    let (mut service, world, mut sink) = scripted_service(program);
    service.handle_command(AppCommand::PaintAllSides, &mut sink);
    assert!(service.run_until_idle(TICKS, &mut sink));

    let park_x = service
        .config()
        .inches_to_steps(service.config().painting.park_before_homing[0]);
    assert!(
        !world
            .borrow()
            .motor(Motor::X)
            .commands
            .contains(&AxisCommand::MoveTo(park_x)),
        "no park move after a failed program"
    );
    assert_eq!(sink.homing_reports().len(), 1);
}

#[test]
fn abort_during_program_rehomes_and_clears_abort() {
    let program = ScriptedProgram {
        move_x: Some(50_000),
        ..ScriptedProgram::default()
    };
    let (mut service, world, mut sink) = scripted_service(program);
    let at = world.borrow().now_ms() + 200;
    world.borrow_mut().schedule(at, SimEvent::Abort);

    service.handle_command(AppCommand::PaintAllSides, &mut sink);
    assert!(service.run_until_idle(TICKS, &mut sink));

    assert!(!service.signals().abort_requested());
    assert!(sink.homing_reports()[0].success());
    assert!(sink.transitions().contains(&(StateId::Painting, StateId::Homing)));
    assert!(!world.borrow().is_gun_on());
}

#[test]
fn start_painting_runs_pre_clean_first() {
    let (mut service, world, mut sink) = scripted_service(ScriptedProgram::default());
    service.handle_command(AppCommand::StartPainting, &mut sink);
    assert!(service.run_until_idle(TICKS, &mut sink));

    let t = sink.transitions();
    assert_eq!(t[0], (StateId::Idle, StateId::Painting));
    assert_eq!(t[1], (StateId::Painting, StateId::Cleaning));
    assert_eq!(t[2], (StateId::Cleaning, StateId::Painting));
    assert_eq!(service.context().program.runs, 1);

    // Short burst: the gun was on for the short spray only.
    let w = world.borrow();
    let on = w.tool_log.iter().find(|r| r.event == ToolEvent::GunOn).unwrap();
    let off = w.tool_log.iter().find(|r| r.event == ToolEvent::GunOff).unwrap();
    assert_eq!(
        off.at_ms - on.at_ms,
        u64::from(service.config().cleaning.short_burst_ms)
    );
}

#[test]
fn single_pass_without_travel_never_sprays() {
    let mut config = short_job();
    config.painting.sides[0].shift_x = 0.0;
    assert!(config.validate().is_err());

    let mut bench = homed_bench(config);
    let config = bench.config.clone();
    let (mut motion, tools) = bench.rig.motion_and_tools(&bench.signals, &config);

    let outcome = paint_side(&mut motion, tools, &config, 1).unwrap();

    assert_eq!(outcome, MoveOutcome::Completed);
    let w = bench.world.borrow();
    assert!(w.gun_history().is_empty(), "{:?}", w.gun_history());
    assert_eq!(
        w.motor(Motor::Z).logical(),
        config.inches_to_steps(config.painting.sides[0].safe_z_height)
    );
}
