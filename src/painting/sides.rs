//! Settings-driven side patterns.
//!
//! Every side is painted from its own [`SideSettings`]:
//!
//! ```text
//!  single pass (sweep_y == 0)        serpentine (sweep_y > 0)
//!
//!   start ──gun on──▶──▶──▶╳ end      ↓   ↑   ↓   ↑   ↓   start at top right,
//!                        │           │   │   │   │   │   -Y first, shift -X
//!                gun off ┘ lead      └─◀─┘─◀─┘─◀─┘─◀─┘
//! ```
//!
//! The approach is the same for both: spray servo and pressure pot,
//! raise to the side's safe Z, turn the table, travel to the start,
//! lower to the painting height.  After the pattern the head goes back
//! to safe Z.

use log::{info, warn};

use crate::app::ports::{Platform, ToolPort};
use crate::config::{MachineConfig, SideSettings};
use crate::error::MotionError;
use crate::motion::{Axis, MotionCoordinator, MotionRequest, MoveOutcome, Trigger};

/// First serpentine sweep runs slower so the fan settles.
const FIRST_SWEEP_SPEED_PERCENT: u32 = 75;

fn first_sweep_speed(speed_hz: u32) -> u32 {
    (u64::from(speed_hz) * u64::from(FIRST_SWEEP_SPEED_PERCENT) / 100).max(1) as u32
}

/// Paint one side (`side` is 1-based).  The gun is always off when this
/// returns.
pub fn paint_side<P: Platform>(
    motion: &mut MotionCoordinator<'_, P>,
    tools: &mut P::Tools,
    config: &MachineConfig,
    side: usize,
) -> Result<MoveOutcome, MotionError> {
    let Some(settings) = side
        .checked_sub(1)
        .and_then(|i| config.painting.sides.get(i))
    else {
        warn!("PAINTING: no settings for side {}", side);
        return Ok(MoveOutcome::Completed);
    };

    info!("PAINTING: side {} start", side);
    let result = run_side(motion, tools, config, settings);
    tools.paint_gun_off();
    match result {
        Ok(MoveOutcome::Completed) => info!("PAINTING: side {} done", side),
        Ok(MoveOutcome::Aborted) => warn!("PAINTING: side {} aborted", side),
        Err(e) => warn!("PAINTING: side {} failed: {}", side, e),
    }
    result
}

fn run_side<P: Platform>(
    motion: &mut MotionCoordinator<'_, P>,
    tools: &mut P::Tools,
    config: &MachineConfig,
    s: &SideSettings,
) -> Result<MoveOutcome, MotionError> {
    let steps = |inches: f32| config.inches_to_steps(inches);
    let (xs, ys, zs) = (
        config.x.default_speed_hz,
        config.y.default_speed_hz,
        config.z.default_speed_hz,
    );
    let safe_z = steps(s.safe_z_height);
    let paint_z = steps(s.z_height);
    let start_x = steps(s.start_x);
    let start_y = steps(s.start_y);

    tools.set_servo_angle(s.servo_angle);
    tools.pressure_pot_on();

    // Approach.
    completed!(motion.move_synchronized(&MotionRequest::single(Axis::Z, safe_z, zs)?)?);
    if motion.has_rotation() {
        completed!(motion.rotate_to_angle(s.rotation_angle, config.rotation.default_speed_hz)?);
    } else {
        warn!("PAINTING: no rotary table, painting without turning to {} deg", s.rotation_angle);
    }
    completed!(motion.move_synchronized(&MotionRequest::xyz(
        (start_x, xs),
        (start_y, ys),
        (safe_z, zs)
    )?)?);
    completed!(motion.move_synchronized(&MotionRequest::single(Axis::Z, paint_z, zs)?)?);

    let (end_x, end_y) = if s.sweep_y == 0.0 {
        completed!(single_pass(motion, tools, config, s, start_x, start_y, paint_z)?);
        (start_x + steps(s.shift_x), start_y)
    } else {
        let mut x = start_x;
        let mut y = start_y;
        let sweep = steps(s.sweep_y);
        let shift = steps(s.shift_x);
        for i in 0..s.sweeps {
            let down = i % 2 == 0;
            y += if down { -sweep } else { sweep };
            let y_speed = if i == 0 {
                first_sweep_speed(s.paint_y_speed_hz)
            } else {
                s.paint_y_speed_hz
            };
            tools.paint_gun_on();
            let sweep_outcome = motion.move_synchronized(&MotionRequest::xyz(
                (x, s.paint_x_speed_hz),
                (y, y_speed),
                (paint_z, zs),
            )?);
            tools.paint_gun_off();
            completed!(sweep_outcome?);

            if i + 1 < s.sweeps {
                x -= shift;
                completed!(motion.move_synchronized(&MotionRequest::xyz(
                    (x, s.paint_x_speed_hz),
                    (y, s.paint_y_speed_hz),
                    (paint_z, zs),
                )?)?);
            }
        }
        (x, y)
    };

    completed!(motion.move_synchronized(&MotionRequest::xyz(
        (end_x, xs),
        (end_y, ys),
        (safe_z, zs)
    )?)?);
    Ok(MoveOutcome::Completed)
}

/// One +X pass with the gun on, shut off `gun_off_lead_inches` before the end.
fn single_pass<P: Platform>(
    motion: &mut MotionCoordinator<'_, P>,
    tools: &mut P::Tools,
    config: &MachineConfig,
    s: &SideSettings,
    start_x: i32,
    y: i32,
    z: i32,
) -> Result<MoveOutcome, MotionError> {
    let end_x = start_x + config.inches_to_steps(s.shift_x);
    if end_x == start_x {
        warn!("PAINTING: single pass has no X travel, skipped");
        return Ok(MoveOutcome::Completed);
    }
    let lead = config.inches_to_steps(config.painting.gun_off_lead_inches);
    let off_at = if end_x >= start_x { end_x - lead } else { end_x + lead };

    let request = MotionRequest::xyz(
        (end_x, s.paint_x_speed_hz),
        (y, s.paint_y_speed_hz),
        (z, config.z.default_speed_hz),
    )?;
    tools.paint_gun_on();
    motion.move_synchronized_with_trigger(
        &request,
        Trigger::new(Axis::X, off_at, || tools.paint_gun_off()),
    )
}
