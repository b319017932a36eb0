//! Test bench for integration tests.
//!
//! Wraps the simulated gantry so tests can drive the motion core
//! directly and assert on the full driver, tool and event history.

use std::sync::Arc;

use paintbot::adapters::sim::{
    AxisCommand, SharedWorld, SimAxis, SimClock, SimControl, SimDelay, SimPlatform, SimSwitch,
    SimTools, SimWorld, sim_rig, sim_rig_for,
};
use paintbot::app::events::AppEvent;
use paintbot::app::ports::{EventSink, PaintProgram, Platform};
use paintbot::config::MachineConfig;
use paintbot::error::MotionError;
use paintbot::fsm::StateId;
use paintbot::fsm::context::ControlSignals;
use paintbot::motion::{
    Axis, HomingReport, Motor, MotionCoordinator, MotionRequest, MoveOutcome, Rig,
};

// ── Event recorder ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(from, to)` of every recorded transition, in order.
    pub fn transitions(&self) -> Vec<(StateId, StateId)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    pub fn homing_reports(&self) -> Vec<HomingReport> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::HomingFinished(r) => Some(*r),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── Bench ─────────────────────────────────────────────────────

/// A simulated rig with its world, signals and config.
pub struct Bench {
    pub world: SharedWorld,
    pub signals: Arc<ControlSignals>,
    pub rig: Rig<SimPlatform>,
    pub config: MachineConfig,
}

#[allow(dead_code)]
impl Bench {
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default(), true)
    }

    pub fn without_rotation() -> Self {
        Self::with_config(MachineConfig::default(), false)
    }

    pub fn with_config(config: MachineConfig, with_rotation: bool) -> Self {
        let signals = Arc::new(ControlSignals::new());
        let world = SimWorld::new(Arc::clone(&signals), &config).shared();
        let rig = sim_rig(&world, &config, with_rotation);
        Self {
            world,
            signals,
            rig,
            config,
        }
    }

    pub fn motion(&mut self) -> MotionCoordinator<'_, SimPlatform> {
        self.rig.motion(&self.signals, &self.config)
    }

    pub fn home(&mut self) -> HomingReport {
        self.rig.homing(&self.config).run()
    }

    pub fn commands(&self, motor: Motor) -> Vec<AxisCommand> {
        self.world.borrow().motor(motor).commands.clone()
    }

    pub fn logical(&self, motor: Motor) -> i32 {
        self.world.borrow().motor(motor).logical()
    }

    pub fn physical(&self, motor: Motor) -> i32 {
        self.world.borrow().motor(motor).physical
    }

    pub fn is_running(&self, motor: Motor) -> bool {
        self.world.borrow().motor(motor).is_running()
    }

    pub fn now_ms(&self) -> u64 {
        self.world.borrow().now_ms()
    }

    pub fn clear_logs(&self) {
        self.world.borrow_mut().clear_logs();
    }

    /// Redefine every fitted motor's logical position as 0.
    pub fn zero_all(&mut self) {
        use paintbot::app::ports::AxisDriver;
        for m in [Motor::X, Motor::YLeft, Motor::YRight, Motor::Z, Motor::Rotation] {
            if let Some(d) = self.rig.gantry.motor_mut(m) {
                d.set_position(0);
            }
        }
        self.clear_logs();
    }
}

// ── Scripted paint program ────────────────────────────────────

/// Paint program stand-in: optionally one X move, then a fixed result.
#[derive(Debug)]
pub struct ScriptedProgram {
    pub runs: u32,
    /// X target (steps) moved to before returning.
    pub move_x: Option<i32>,
    pub result: Result<MoveOutcome, MotionError>,
}

impl Default for ScriptedProgram {
    fn default() -> Self {
        Self {
            runs: 0,
            move_x: None,
            result: Ok(MoveOutcome::Completed),
        }
    }
}

pub struct ScriptedPlatform;

impl Platform for ScriptedPlatform {
    type Axis = SimAxis;
    type Switch = SimSwitch;
    type Delay = SimDelay;
    type Clock = SimClock;
    type Control = SimControl;
    type Tools = SimTools;
    type Program = ScriptedProgram;
}

impl PaintProgram<ScriptedPlatform> for ScriptedProgram {
    fn paint_all_sides(
        &mut self,
        motion: &mut MotionCoordinator<'_, ScriptedPlatform>,
        _tools: &mut SimTools,
        config: &MachineConfig,
    ) -> Result<MoveOutcome, MotionError> {
        self.runs += 1;
        if let Some(x) = self.move_x {
            let outcome = motion.move_synchronized(&MotionRequest::single(
                Axis::X,
                x,
                config.x.default_speed_hz,
            )?)?;
            if outcome.is_aborted() {
                return Ok(outcome);
            }
        }
        self.result
    }
}

#[allow(dead_code)]
pub fn scripted_rig(world: &SharedWorld, config: &MachineConfig) -> Rig<ScriptedPlatform> {
    sim_rig_for::<ScriptedPlatform>(world, config, true)
}
