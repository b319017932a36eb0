//! Port traits: the hexagonal boundary between the motion core and the machine.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ MachineService (domain)
//! ```
//!
//! Driven adapters (stepper drivers, tool outputs, the dashboard
//! transport, event sinks) implement these traits.  The domain consumes
//! them through the [`Platform`] bundle, so the core never touches
//! hardware directly and the whole machine runs against the simulator
//! in tests.
//!
//! Switch inputs and poll sleeps use the `embedded_hal` traits
//! ([`InputPin`], [`DelayNs`]) rather than crate-local ports.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;

use crate::config::MachineConfig;
use crate::error::MotionError;
use crate::motion::{Direction, MotionCoordinator, MoveOutcome};

// ───────────────────────────────────────────────────────────────
// Axis driver port (domain → stepper driver)
// ───────────────────────────────────────────────────────────────

/// One stepper motor behind a trapezoidal-profile driver.
///
/// Positions are signed steps in the driver's logical frame.  Motion
/// commands are non-blocking: the driver generates pulses on its own and
/// reports progress through [`position`](Self::position) and
/// [`is_running`](Self::is_running).
pub trait AxisDriver {
    /// Travel speed for subsequent moves (steps/s).
    fn set_speed_hz(&mut self, hz: u32);

    /// Acceleration for subsequent moves (steps/s²).
    fn set_acceleration(&mut self, accel: u32);

    /// Start an absolute move towards `target`.
    fn move_to(&mut self, target: i32);

    /// Run at the set speed until stopped.
    fn run_continuous(&mut self, direction: Direction);

    fn is_running(&self) -> bool;

    /// Current logical position (steps).
    fn position(&self) -> i32;

    /// Stop immediately and redefine the current position as `position`.
    /// Afterwards the motor is idle and its target equals `position`.
    fn force_stop_at(&mut self, position: i32);

    /// Redefine the logical position of an idle motor.
    fn set_position(&mut self, position: i32);
}

// ───────────────────────────────────────────────────────────────
// Time
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Control channel (external transport → domain)
// ───────────────────────────────────────────────────────────────

/// The external command transport (dashboard, serial console).
///
/// Servicing it may set the pause flag or the abort signal on the
/// shared [`ControlSignals`](crate::fsm::context::ControlSignals).  It
/// is pumped from inside every blocking wait so the machine stays
/// responsive while paused.
pub trait ControlChannel {
    fn service(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Tool outputs (domain → gun, pot, servo)
// ───────────────────────────────────────────────────────────────

/// Paint gun, pressure pot and spray servo.
pub trait ToolPort {
    fn paint_gun_on(&mut self);
    fn paint_gun_off(&mut self);
    fn is_paint_gun_on(&self) -> bool;

    fn pressure_pot_on(&mut self);
    fn pressure_pot_off(&mut self);
    fn is_pressure_pot_on(&self) -> bool;

    /// Spray servo angle (degrees).
    fn set_servo_angle(&mut self, degrees: u16);

    /// Gun and pot off.
    fn all_off(&mut self) {
        self.paint_gun_off();
        self.pressure_pot_off();
    }
}

// ───────────────────────────────────────────────────────────────
// Paint program (domain → pattern library)
// ───────────────────────────────────────────────────────────────

/// The painting pattern run by the Painting state.
pub trait PaintProgram<P: Platform> {
    /// Paint every side of the part for the configured number of coats.
    fn paint_all_sides(
        &mut self,
        motion: &mut MotionCoordinator<'_, P>,
        tools: &mut P::Tools,
        config: &MachineConfig,
    ) -> Result<MoveOutcome, MotionError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log,
/// dashboard socket, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Platform bundle
// ───────────────────────────────────────────────────────────────

/// Every concrete adapter type of one machine build.
pub trait Platform: Sized {
    type Axis: AxisDriver;
    type Switch: InputPin;
    type Delay: DelayNs;
    type Clock: Clock;
    type Control: ControlChannel;
    type Tools: ToolPort;
    type Program: PaintProgram<Self>;
}
