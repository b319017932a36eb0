//! Motion core: axis identities, move requests and the machine rig.
//!
//! ```text
//!   Axis (logical)        Motor (physical)
//!   ──────────────        ────────────────
//!   X          ────────▶  X
//!   Y          ──┬─────▶  YLeft
//!                └─────▶  YRight      (gantry kept square)
//!   Z          ────────▶  Z
//!   Rotation   ────────▶  Rotation    (optional)
//! ```
//!
//! Requests only ever name logical axes, so the two Y motors can never
//! receive different targets or speeds.  The [`Rig`] owns every motor,
//! switch and port; the [`MotionCoordinator`] and [`HomingSequencer`]
//! borrow it mutably for the duration of one blocking operation.

pub mod coordinator;
pub mod homing;
pub mod rotation;

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::app::ports::{AxisDriver, Platform};
use crate::config::MachineConfig;
use crate::drivers::debounce::Debouncer;
use crate::error::MotionError;
use crate::fsm::context::ControlSignals;

pub use coordinator::{MotionCoordinator, Trigger};
pub use homing::{HomingOutcome, HomingReport, HomingSequencer, RotationStatus};

// ───────────────────────────────────────────────────────────────
// Identities
// ───────────────────────────────────────────────────────────────

/// Physical motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Motor {
    X = 0,
    YLeft = 1,
    YRight = 2,
    Z = 3,
    Rotation = 4,
}

impl Motor {
    /// Motors that carry a home switch.
    pub const TRANSLATIONAL: [Motor; 4] = [Motor::X, Motor::YLeft, Motor::YRight, Motor::Z];

    pub fn name(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::YLeft => "Y-left",
            Self::YRight => "Y-right",
            Self::Z => "Z",
            Self::Rotation => "rotation",
        }
    }

    /// Logical axis this motor belongs to.
    pub fn axis(self) -> Axis {
        match self {
            Self::X => Axis::X,
            Self::YLeft | Self::YRight => Axis::Y,
            Self::Z => Axis::Z,
            Self::Rotation => Axis::Rotation,
        }
    }
}

impl fmt::Display for Motor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical axis as seen by move requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
    Rotation,
}

impl Axis {
    /// Motors driven by this axis; the first one is the reference for
    /// position reads.
    pub fn motors(self) -> &'static [Motor] {
        match self {
            Self::X => &[Motor::X],
            Self::Y => &[Motor::YLeft, Motor::YRight],
            Self::Z => &[Motor::Z],
            Self::Rotation => &[Motor::Rotation],
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
            Self::Rotation => "rotation",
        })
    }
}

/// Travel direction along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Positive => Self::Negative,
            Self::Negative => Self::Positive,
        }
    }

    /// +1 or -1.
    pub fn sign(self) -> i32 {
        match self {
            Self::Positive => 1,
            Self::Negative => -1,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Requests and outcomes
// ───────────────────────────────────────────────────────────────

/// Absolute target and speed for one logical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisTarget {
    pub axis: Axis,
    /// Absolute target (steps)
    pub target: i32,
    /// Travel speed (steps/s), never zero
    pub speed_hz: u32,
}

/// A set of per-axis targets executed together, at most one per axis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotionRequest {
    targets: heapless::Vec<AxisTarget, 4>,
}

impl MotionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target, rejecting zero speeds and repeated axes.
    pub fn with(mut self, axis: Axis, target: i32, speed_hz: u32) -> Result<Self, MotionError> {
        self.push(axis, target, speed_hz)?;
        Ok(self)
    }

    pub fn push(&mut self, axis: Axis, target: i32, speed_hz: u32) -> Result<(), MotionError> {
        if speed_hz == 0 {
            return Err(MotionError::ZeroSpeed(axis));
        }
        if self.target_of(axis).is_some() {
            return Err(MotionError::DuplicateAxis(axis));
        }
        // Four distinct axes fit exactly, so a full vec implies a duplicate above.
        self.targets
            .push(AxisTarget {
                axis,
                target,
                speed_hz,
            })
            .map_err(|_| MotionError::DuplicateAxis(axis))
    }

    /// X, Y and Z in one request, each with its own speed.
    pub fn xyz(
        x: (i32, u32),
        y: (i32, u32),
        z: (i32, u32),
    ) -> Result<Self, MotionError> {
        Self::new()
            .with(Axis::X, x.0, x.1)?
            .with(Axis::Y, y.0, y.1)?
            .with(Axis::Z, z.0, z.1)
    }

    /// Single-axis request.
    pub fn single(axis: Axis, target: i32, speed_hz: u32) -> Result<Self, MotionError> {
        Self::new().with(axis, target, speed_hz)
    }

    pub fn targets(&self) -> &[AxisTarget] {
        &self.targets
    }

    pub fn target_of(&self, axis: Axis) -> Option<&AxisTarget> {
        self.targets.iter().find(|t| t.axis == axis)
    }
}

/// How a blocking motion call ended.  Aborts are outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Every commanded motor stopped on its own.
    Completed,
    /// The abort signal stopped the call; motors were halted in place.
    Aborted,
}

impl MoveOutcome {
    pub fn is_aborted(self) -> bool {
        self == Self::Aborted
    }
}

// ───────────────────────────────────────────────────────────────
// Gantry (the set of motors)
// ───────────────────────────────────────────────────────────────

/// Every motor on the machine; the rotary table is optional.
pub struct Gantry<A> {
    pub x: A,
    pub y_left: A,
    pub y_right: A,
    pub z: A,
    pub rotation: Option<A>,
}

impl<A: AxisDriver> Gantry<A> {
    pub fn motor(&self, motor: Motor) -> Option<&A> {
        match motor {
            Motor::X => Some(&self.x),
            Motor::YLeft => Some(&self.y_left),
            Motor::YRight => Some(&self.y_right),
            Motor::Z => Some(&self.z),
            Motor::Rotation => self.rotation.as_ref(),
        }
    }

    pub fn motor_mut(&mut self, motor: Motor) -> Option<&mut A> {
        match motor {
            Motor::X => Some(&mut self.x),
            Motor::YLeft => Some(&mut self.y_left),
            Motor::YRight => Some(&mut self.y_right),
            Motor::Z => Some(&mut self.z),
            Motor::Rotation => self.rotation.as_mut(),
        }
    }

    pub fn has_rotation(&self) -> bool {
        self.rotation.is_some()
    }

    /// Whether every motor of `axis` is fitted.
    pub fn has_axis(&self, axis: Axis) -> bool {
        axis.motors().iter().all(|&m| self.motor(m).is_some())
    }

    /// Position of the axis' reference motor.
    pub fn position(&self, axis: Axis) -> Option<i32> {
        self.motor(axis.motors()[0]).map(AxisDriver::position)
    }

    pub fn is_running(&self, motor: Motor) -> bool {
        self.motor(motor).is_some_and(AxisDriver::is_running)
    }

    /// Set the acceleration of every motor of `axis`.
    pub fn set_axis_acceleration(&mut self, axis: Axis, accel: u32) {
        for &m in axis.motors() {
            if let Some(d) = self.motor_mut(m) {
                d.set_acceleration(accel);
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Switch bank
// ───────────────────────────────────────────────────────────────

/// Debounced home/limit switches, one per translational motor.
pub struct SwitchBank<S> {
    switches: [Debouncer<S>; 4],
    active_high: bool,
}

impl<S: embedded_hal::digital::InputPin> SwitchBank<S> {
    /// Pins in [`Motor::TRANSLATIONAL`] order.
    pub fn new(pins: [S; 4], interval_ms: u32, active_high: bool) -> Self {
        Self {
            switches: pins.map(|p| Debouncer::attach(p, interval_ms)),
            active_high,
        }
    }

    fn index(motor: Motor) -> Option<usize> {
        Motor::TRANSLATIONAL.iter().position(|&m| m == motor)
    }

    pub fn set_interval(&mut self, interval_ms: u32) {
        for s in &mut self.switches {
            s.set_interval(interval_ms);
        }
    }

    /// Advance one switch's debouncer.
    pub fn update(&mut self, motor: Motor, now_ms: u64) {
        if let Some(i) = Self::index(motor) {
            self.switches[i].update(now_ms);
        }
    }

    /// Advance every debouncer; returns the motors whose switch just
    /// became triggered.
    pub fn update_all(&mut self, now_ms: u64) -> heapless::Vec<Motor, 4> {
        let mut tripped = heapless::Vec::new();
        for (i, s) in self.switches.iter_mut().enumerate() {
            if s.update(now_ms) && s.read() == self.active_high {
                // Capacity equals the switch count.
                let _ = tripped.push(Motor::TRANSLATIONAL[i]);
            }
        }
        tripped
    }

    /// Debounced "switch pressed".  Motors without a switch never trigger.
    pub fn is_triggered(&self, motor: Motor) -> bool {
        Self::index(motor).is_some_and(|i| self.switches[i].read() == self.active_high)
    }

    /// Motors whose switch currently reads triggered.
    pub fn triggered(&self) -> impl Iterator<Item = Motor> + '_ {
        Motor::TRANSLATIONAL
            .into_iter()
            .filter(|&m| self.is_triggered(m))
    }
}

// ───────────────────────────────────────────────────────────────
// Rig
// ───────────────────────────────────────────────────────────────

/// All hardware the motion core drives, created once at startup.
pub struct Rig<P: Platform> {
    pub gantry: Gantry<P::Axis>,
    pub switches: SwitchBank<P::Switch>,
    pub delay: P::Delay,
    pub clock: P::Clock,
    pub control: P::Control,
    pub tools: P::Tools,
}

impl<P: Platform> Rig<P> {
    /// Borrow the rig for blocking moves.
    pub fn motion<'a>(
        &'a mut self,
        signals: &'a ControlSignals,
        config: &MachineConfig,
    ) -> MotionCoordinator<'a, P> {
        self.motion_and_tools(signals, config).0
    }

    /// Borrow the rig for blocking moves while keeping the tool outputs
    /// reachable (trigger actions switch the gun mid-move).
    pub fn motion_and_tools<'a>(
        &'a mut self,
        signals: &'a ControlSignals,
        config: &MachineConfig,
    ) -> (MotionCoordinator<'a, P>, &'a mut P::Tools) {
        let Rig {
            gantry,
            switches,
            delay,
            clock,
            control,
            tools,
        } = self;
        (
            MotionCoordinator::new(gantry, switches, delay, clock, control, signals, config),
            tools,
        )
    }

    /// Borrow the rig for one homing run.
    pub fn homing<'a>(&'a mut self, config: &'a MachineConfig) -> HomingSequencer<'a, P> {
        HomingSequencer::new(self, config)
    }
}
