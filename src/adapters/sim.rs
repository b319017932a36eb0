//! Simulation adapter.
//!
//! A virtual machine that implements every port of the [`Platform`]
//! bundle, for the host binary and the integration tests.
//!
//! ```text
//!            ┌──────────────── SimWorld ────────────────┐
//!  SimAxis ──▶│ motors[5]   physical pos, origin, mode  │
//!  SimSwitch ◀│ switches[4] trip point per motor        │
//!  SimDelay ──▶│ clock (ns) ── advance ──▶ step motors  │
//!  SimClock ◀─│             scheduled pause/resume/abort │
//!  SimTools ──▶│ gun · pot · servo + tool log           │
//!            └──────────────────────────────────────────┘
//! ```
//!
//! Time only moves inside [`SimDelay`], so every poll loop runs
//! deterministically.  Motors travel at constant speed (acceleration is
//! recorded, not simulated) and hold still while the pause flag is set.

use core::cell::RefCell;
use core::convert::Infallible;
use std::rc::Rc;
use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin};
use log::debug;

use crate::app::ports::{AxisDriver, Clock, ControlChannel, Platform, ToolPort};
use crate::config::MachineConfig;
use crate::fsm::context::ControlSignals;
use crate::motion::{Axis, Direction, Gantry, Motor, Rig, SwitchBank};
use crate::painting::AllSidesProgram;

const NS_PER_MS: u64 = 1_000_000;
const NS_PER_SEC: u64 = 1_000_000_000;

/// Physical distance (inches) between each motor and its switch at power-up.
pub const DEFAULT_START_OFFSET_INCHES: f32 = 2.0;

// ───────────────────────────────────────────────────────────────
// Recorded traffic
// ───────────────────────────────────────────────────────────────

/// One call received by a simulated driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisCommand {
    Speed(u32),
    Accel(u32),
    MoveTo(i32),
    Run(Direction),
    ForceStop(i32),
    SetPosition(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolEvent {
    GunOn,
    GunOff,
    PotOn,
    PotOff,
    Servo(u16),
}

/// A tool output change with the time and X position it happened at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolRecord {
    pub at_ms: u64,
    pub x: i32,
    pub event: ToolEvent,
}

/// Control-signal change injected at a point in simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    Pause,
    Resume,
    Abort,
}

// ───────────────────────────────────────────────────────────────
// World
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    MoveTo,
    Run(Direction),
}

/// State of one simulated stepper.
#[derive(Debug, Clone)]
pub struct SimMotor {
    /// Position in the machine frame, never redefined.
    pub physical: i32,
    /// Physical position of logical zero.
    origin: i32,
    target: i32,
    mode: Mode,
    pub speed_hz: u32,
    pub accel: u32,
    step_accum: u64,
    pub commands: Vec<AxisCommand>,
}

impl SimMotor {
    fn new(physical: i32) -> Self {
        Self {
            physical,
            origin: 0,
            target: physical,
            mode: Mode::Idle,
            speed_hz: 0,
            accel: 0,
            step_accum: 0,
            commands: Vec::new(),
        }
    }

    pub fn logical(&self) -> i32 {
        self.physical - self.origin
    }

    pub fn is_running(&self) -> bool {
        self.mode != Mode::Idle
    }

    fn advance(&mut self, dt_ns: u64) {
        if self.mode == Mode::Idle {
            self.step_accum = 0;
            return;
        }
        self.step_accum += u64::from(self.speed_hz) * dt_ns;
        let budget = i64::try_from(self.step_accum / NS_PER_SEC).unwrap_or(i64::MAX);
        self.step_accum %= NS_PER_SEC;
        if budget == 0 {
            return;
        }
        match self.mode {
            Mode::Idle => {}
            Mode::MoveTo => {
                let remaining = i64::from(self.target) - i64::from(self.logical());
                let step = remaining.clamp(-budget, budget);
                self.physical += step as i32;
                if self.logical() == self.target {
                    self.mode = Mode::Idle;
                }
            }
            Mode::Run(dir) => {
                let step = budget.min(i64::from(i32::MAX / 2)) as i32;
                self.physical = self.physical.saturating_add(dir.sign() * step);
            }
        }
    }
}

/// Where a home switch sits in the machine frame.
#[derive(Debug, Clone, Copy)]
pub struct SimSwitchModel {
    /// Physical position at which the switch closes.
    pub trip_at: i32,
    /// Closed while the motor is at or beyond `trip_at` in this direction.
    pub side: Direction,
    /// Overrides the position model (stuck switch, wiring fault).
    pub forced: Option<bool>,
}

impl SimSwitchModel {
    fn pressed(&self, physical: i32) -> bool {
        if let Some(level) = self.forced {
            return level;
        }
        match self.side {
            Direction::Positive => physical >= self.trip_at,
            Direction::Negative => physical <= self.trip_at,
        }
    }
}

/// The whole simulated machine.
pub struct SimWorld {
    now_ns: u64,
    pub motors: [SimMotor; 5],
    pub switches: [SimSwitchModel; 4],
    active_high: bool,
    signals: Arc<ControlSignals>,
    schedule: Vec<(u64, SimEvent)>,
    /// Physical motor positions at every control-channel service.
    pub service_snapshots: Vec<[i32; 5]>,
    gun_on: bool,
    pot_on: bool,
    pub servo_angle: u16,
    pub tool_log: Vec<ToolRecord>,
}

/// Handle shared by every simulated adapter.
pub type SharedWorld = Rc<RefCell<SimWorld>>;

impl SimWorld {
    /// Every translational motor starts `DEFAULT_START_OFFSET_INCHES` away
    /// from a switch at physical 0 on its home side.  The rotary table
    /// starts at 0.
    pub fn new(signals: Arc<ControlSignals>, config: &MachineConfig) -> Self {
        let offset = config.inches_to_steps(DEFAULT_START_OFFSET_INCHES);
        let home = |m: Motor| match m.axis() {
            Axis::X => config.x.home_direction,
            Axis::Y => config.y.home_direction,
            _ => config.z.home_direction,
        };
        let motor = |m: Motor| SimMotor::new(-home(m).sign() * offset);
        let switch = |m: Motor| SimSwitchModel {
            trip_at: 0,
            side: home(m),
            forced: None,
        };
        Self {
            now_ns: 0,
            motors: [
                motor(Motor::X),
                motor(Motor::YLeft),
                motor(Motor::YRight),
                motor(Motor::Z),
                SimMotor::new(0),
            ],
            switches: Motor::TRANSLATIONAL.map(switch),
            active_high: config.motion.switch_active_high,
            signals,
            schedule: Vec::new(),
            service_snapshots: Vec::new(),
            gun_on: false,
            pot_on: false,
            servo_angle: 0,
            tool_log: Vec::new(),
        }
    }

    pub fn shared(self) -> SharedWorld {
        Rc::new(RefCell::new(self))
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ns / NS_PER_MS
    }

    pub fn motor(&self, motor: Motor) -> &SimMotor {
        &self.motors[motor as usize]
    }

    pub fn motor_mut(&mut self, motor: Motor) -> &mut SimMotor {
        &mut self.motors[motor as usize]
    }

    /// Switch of a translational motor; the rotary motor has none.
    pub fn switch_mut(&mut self, motor: Motor) -> Option<&mut SimSwitchModel> {
        Motor::TRANSLATIONAL
            .iter()
            .position(|&m| m == motor)
            .map(|i| &mut self.switches[i])
    }

    /// Forget recorded driver, tool and service traffic.
    pub fn clear_logs(&mut self) {
        for m in &mut self.motors {
            m.commands.clear();
        }
        self.tool_log.clear();
        self.service_snapshots.clear();
    }

    /// Raise `event` on the control signals once the clock reaches `at_ms`.
    pub fn schedule(&mut self, at_ms: u64, event: SimEvent) {
        self.schedule.push((at_ms * NS_PER_MS, event));
        self.schedule.sort_by_key(|&(t, _)| t);
    }

    pub fn is_gun_on(&self) -> bool {
        self.gun_on
    }

    pub fn is_pot_on(&self) -> bool {
        self.pot_on
    }

    /// Recorded gun changes as `(on, x)` pairs.
    pub fn gun_history(&self) -> Vec<(bool, i32)> {
        self.tool_log
            .iter()
            .filter_map(|r| match r.event {
                ToolEvent::GunOn => Some((true, r.x)),
                ToolEvent::GunOff => Some((false, r.x)),
                _ => None,
            })
            .collect()
    }

    /// Advance simulated time in slices of at most one millisecond.
    pub fn advance(&mut self, mut dt_ns: u64) {
        while dt_ns > 0 {
            let slice = dt_ns.min(NS_PER_MS);
            self.fire_due_events();
            if !self.signals.is_paused() {
                for m in &mut self.motors {
                    m.advance(slice);
                }
            }
            self.now_ns += slice;
            dt_ns -= slice;
        }
        self.fire_due_events();
    }

    fn fire_due_events(&mut self) {
        while let Some(&(at, event)) = self.schedule.first() {
            if at > self.now_ns {
                break;
            }
            self.schedule.remove(0);
            debug!("SIM: {:?} at {} ms", event, at / NS_PER_MS);
            match event {
                SimEvent::Pause => self.signals.pause(),
                SimEvent::Resume => self.signals.resume(),
                SimEvent::Abort => self.signals.request_abort(),
            }
        }
    }

    fn record_tool(&mut self, event: ToolEvent) {
        let x = self.motors[Motor::X as usize].logical();
        self.tool_log.push(ToolRecord {
            at_ms: self.now_ms(),
            x,
            event,
        });
    }
}

// ───────────────────────────────────────────────────────────────
// Port adapters
// ───────────────────────────────────────────────────────────────

/// One simulated stepper driver.
pub struct SimAxis {
    world: SharedWorld,
    motor: Motor,
}

impl SimAxis {
    fn with<R>(&self, f: impl FnOnce(&mut SimMotor) -> R) -> R {
        f(self.world.borrow_mut().motor_mut(self.motor))
    }
}

impl AxisDriver for SimAxis {
    fn set_speed_hz(&mut self, hz: u32) {
        self.with(|m| {
            m.speed_hz = hz;
            m.commands.push(AxisCommand::Speed(hz));
        });
    }

    fn set_acceleration(&mut self, accel: u32) {
        self.with(|m| {
            m.accel = accel;
            m.commands.push(AxisCommand::Accel(accel));
        });
    }

    fn move_to(&mut self, target: i32) {
        self.with(|m| {
            m.commands.push(AxisCommand::MoveTo(target));
            m.target = target;
            m.mode = if m.logical() == target {
                Mode::Idle
            } else {
                Mode::MoveTo
            };
        });
    }

    fn run_continuous(&mut self, direction: Direction) {
        self.with(|m| {
            m.commands.push(AxisCommand::Run(direction));
            m.mode = Mode::Run(direction);
        });
    }

    fn is_running(&self) -> bool {
        self.with(|m| m.is_running())
    }

    fn position(&self) -> i32 {
        self.with(|m| m.logical())
    }

    fn force_stop_at(&mut self, position: i32) {
        self.with(|m| {
            m.commands.push(AxisCommand::ForceStop(position));
            m.mode = Mode::Idle;
            m.origin = m.physical - position;
            m.target = position;
        });
    }

    fn set_position(&mut self, position: i32) {
        self.with(|m| {
            m.commands.push(AxisCommand::SetPosition(position));
            m.origin = m.physical - position;
            m.target = position;
        });
    }
}

/// Home switch input of one translational motor.
pub struct SimSwitch {
    world: SharedWorld,
    index: usize,
}

impl ErrorType for SimSwitch {
    type Error = Infallible;
}

impl InputPin for SimSwitch {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let w = self.world.borrow();
        let physical = w.motors[Motor::TRANSLATIONAL[self.index] as usize].physical;
        Ok(w.switches[self.index].pressed(physical) == w.active_high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|h| !h)
    }
}

/// Poll sleep; the only place simulated time advances.
pub struct SimDelay {
    world: SharedWorld,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.world.borrow_mut().advance(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.world.borrow_mut().advance(u64::from(us) * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.world.borrow_mut().advance(u64::from(ms) * NS_PER_MS);
    }
}

pub struct SimClock {
    world: SharedWorld,
}

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.world.borrow().now_ms()
    }
}

/// Control channel stand-in; records where the motors stood at each
/// service, events come from the schedule.
pub struct SimControl {
    world: SharedWorld,
}

impl ControlChannel for SimControl {
    fn service(&mut self) {
        let mut w = self.world.borrow_mut();
        let snapshot = w.motors.each_ref().map(|m| m.physical);
        w.service_snapshots.push(snapshot);
    }
}

pub struct SimTools {
    world: SharedWorld,
}

impl ToolPort for SimTools {
    fn paint_gun_on(&mut self) {
        let mut w = self.world.borrow_mut();
        if !w.gun_on {
            w.gun_on = true;
            w.record_tool(ToolEvent::GunOn);
        }
    }

    fn paint_gun_off(&mut self) {
        let mut w = self.world.borrow_mut();
        if w.gun_on {
            w.gun_on = false;
            w.record_tool(ToolEvent::GunOff);
        }
    }

    fn is_paint_gun_on(&self) -> bool {
        self.world.borrow().gun_on
    }

    fn pressure_pot_on(&mut self) {
        let mut w = self.world.borrow_mut();
        if !w.pot_on {
            w.pot_on = true;
            w.record_tool(ToolEvent::PotOn);
        }
    }

    fn pressure_pot_off(&mut self) {
        let mut w = self.world.borrow_mut();
        if w.pot_on {
            w.pot_on = false;
            w.record_tool(ToolEvent::PotOff);
        }
    }

    fn is_pressure_pot_on(&self) -> bool {
        self.world.borrow().pot_on
    }

    fn set_servo_angle(&mut self, degrees: u16) {
        let mut w = self.world.borrow_mut();
        w.servo_angle = degrees;
        w.record_tool(ToolEvent::Servo(degrees));
    }
}

// ───────────────────────────────────────────────────────────────
// Platform
// ───────────────────────────────────────────────────────────────

/// Simulated machine running the production paint program.
pub struct SimPlatform;

impl Platform for SimPlatform {
    type Axis = SimAxis;
    type Switch = SimSwitch;
    type Delay = SimDelay;
    type Clock = SimClock;
    type Control = SimControl;
    type Tools = SimTools;
    type Program = AllSidesProgram;
}

/// Build a rig whose adapters all share `world`.
pub fn sim_rig(world: &SharedWorld, config: &MachineConfig, with_rotation: bool) -> Rig<SimPlatform> {
    sim_rig_for::<SimPlatform>(world, config, with_rotation)
}

/// As [`sim_rig`], for any platform made of the simulated adapters
/// (a test platform with its own paint program, for instance).
pub fn sim_rig_for<P>(world: &SharedWorld, config: &MachineConfig, with_rotation: bool) -> Rig<P>
where
    P: Platform<
            Axis = SimAxis,
            Switch = SimSwitch,
            Delay = SimDelay,
            Clock = SimClock,
            Control = SimControl,
            Tools = SimTools,
        >,
{
    let axis = |motor| SimAxis {
        world: Rc::clone(world),
        motor,
    };
    let switch = |index| SimSwitch {
        world: Rc::clone(world),
        index,
    };
    Rig {
        gantry: Gantry {
            x: axis(Motor::X),
            y_left: axis(Motor::YLeft),
            y_right: axis(Motor::YRight),
            z: axis(Motor::Z),
            rotation: with_rotation.then(|| axis(Motor::Rotation)),
        },
        switches: SwitchBank::new(
            [switch(0), switch(1), switch(2), switch(3)],
            config.motion.limit_debounce_ms,
            config.motion.switch_active_high,
        ),
        delay: SimDelay {
            world: Rc::clone(world),
        },
        clock: SimClock {
            world: Rc::clone(world),
        },
        control: SimControl {
            world: Rc::clone(world),
        },
        tools: SimTools {
            world: Rc::clone(world),
        },
    }
}
