//! All-sides painting program.
//!
//! One run paints sides 4, 3, 2 and 1 in that order.  Runs repeat for
//! the requested number of coats; between coats the X axis crawls from
//! the loading-bar start to its end over the inter-coat delay so the
//! operator can see the remaining wait.
//!
//! Every step is abortable: an aborted move ends the whole program with
//! [`MoveOutcome::Aborted`] and the gun off.

/// Stop the current routine on an aborted move.
macro_rules! completed {
    ($e:expr) => {
        if $e.is_aborted() {
            return Ok(MoveOutcome::Aborted);
        }
    };
}

pub mod sides;

use log::{info, warn};

use crate::app::ports::{PaintProgram, Platform, ToolPort};
use crate::config::MachineConfig;
use crate::error::MotionError;
use crate::motion::{Axis, MotionCoordinator, MotionRequest, MoveOutcome};

/// Painting order, 1-based side numbers.
pub const SIDE_ORDER: [usize; 4] = [4, 3, 2, 1];

/// Settle time after resetting the servo and gun.
const PREPARE_DWELL_MS: u32 = 200;
/// Servo parked out of the fan during the inter-coat wait.
const INTER_COAT_SERVO_ANGLE: u16 = 180;

/// The production painting program.
#[derive(Debug, Default)]
pub struct AllSidesProgram {
    requested_coats: Option<u8>,
}

impl AllSidesProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coats for the next run only; later runs fall back to the configured count.
    pub fn request_coats(&mut self, coats: u8) {
        self.requested_coats = Some(coats.max(1));
    }

    fn run<P: Platform>(
        motion: &mut MotionCoordinator<'_, P>,
        tools: &mut P::Tools,
        config: &MachineConfig,
        coats: u8,
    ) -> Result<MoveOutcome, MotionError> {
        for coat in 1..=coats {
            info!("PAINTING: coat {} of {}", coat, coats);
            completed!(Self::one_coat(motion, tools, config)?);
            if coat < coats {
                completed!(Self::inter_coat(motion, tools, config)?);
            }
        }
        info!("PAINTING: all coats complete");
        Ok(MoveOutcome::Completed)
    }

    fn one_coat<P: Platform>(
        motion: &mut MotionCoordinator<'_, P>,
        tools: &mut P::Tools,
        config: &MachineConfig,
    ) -> Result<MoveOutcome, MotionError> {
        tools.set_servo_angle(0);
        tools.paint_gun_off();
        completed!(motion.dwell(PREPARE_DWELL_MS));

        for side in SIDE_ORDER {
            completed!(sides::paint_side(motion, tools, config, side)?);
        }

        if !tools.is_pressure_pot_on() {
            info!("PAINTING: pressure pot off, pressurizing");
            tools.pressure_pot_on();
            completed!(motion.dwell(config.painting.pressurize_ms));
        }
        Ok(MoveOutcome::Completed)
    }

    /// Loading-bar move that doubles as the inter-coat delay.
    fn inter_coat<P: Platform>(
        motion: &mut MotionCoordinator<'_, P>,
        tools: &mut P::Tools,
        config: &MachineConfig,
    ) -> Result<MoveOutcome, MotionError> {
        let p = &config.painting;
        let start = config.inches_to_steps(p.loading_bar_start_x);
        let end = config.inches_to_steps(p.loading_bar_end_x);

        completed!(motion.move_synchronized(&MotionRequest::single(
            Axis::X,
            start,
            config.x.default_speed_hz
        )?)?);
        tools.set_servo_angle(INTER_COAT_SERVO_ANGLE);

        let distance = start.abs_diff(end);
        if p.inter_coat_delay_secs == 0 || distance == 0 {
            warn!("PAINTING: no loading bar travel, plain wait");
            return Ok(motion.dwell(p.inter_coat_delay_secs.saturating_mul(1000)));
        }
        let speed_hz = (distance / p.inter_coat_delay_secs).max(1);
        info!(
            "PAINTING: loading bar {} -> {} over {} s ({} Hz)",
            start, end, p.inter_coat_delay_secs, speed_hz
        );
        motion.move_synchronized(&MotionRequest::single(Axis::X, end, speed_hz)?)
    }
}

impl<P: Platform> PaintProgram<P> for AllSidesProgram {
    fn paint_all_sides(
        &mut self,
        motion: &mut MotionCoordinator<'_, P>,
        tools: &mut P::Tools,
        config: &MachineConfig,
    ) -> Result<MoveOutcome, MotionError> {
        let coats = self.requested_coats.take().unwrap_or(config.painting.coats);
        let result = Self::run(motion, tools, config, coats);
        tools.paint_gun_off();
        result
    }
}
