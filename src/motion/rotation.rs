//! Rotary table positioning.
//!
//! The table turns without end stops, so an absolute angle can be
//! reached in either direction.  The target is always picked on the
//! shorter arc, never more than half a turn away.

use crate::app::ports::Platform;
use crate::error::MotionError;

use super::{Axis, MotionCoordinator, MotionRequest, MoveOutcome};

/// Absolute step target that reaches `degrees` from `current` along the
/// shorter arc.  `current` may lie any number of turns from zero.
pub fn shortest_path_target(current: i32, degrees: f32, steps_per_degree: f32) -> i32 {
    let rev = (360.0 * steps_per_degree) as i32;
    if rev <= 0 {
        return current;
    }
    let wanted = (degrees.rem_euclid(360.0) * steps_per_degree) as i32;
    let mut delta = wanted - current.rem_euclid(rev);
    if delta > rev / 2 {
        delta -= rev;
    } else if delta < -(rev / 2) {
        delta += rev;
    }
    current + delta
}

impl<P: Platform> MotionCoordinator<'_, P> {
    /// Turn the rotary table to `degrees` along the shorter arc and wait.
    pub fn rotate_to_angle(
        &mut self,
        degrees: f32,
        speed_hz: u32,
    ) -> Result<MoveOutcome, MotionError> {
        let current = self
            .position(Axis::Rotation)
            .ok_or(MotionError::AxisUnavailable(Axis::Rotation))?;
        let target = shortest_path_target(current, degrees, self.steps_per_degree());
        log::debug!(
            "ROTATION: {:.1} deg -> step {} (from {})",
            degrees,
            target,
            current
        );
        let request = MotionRequest::single(Axis::Rotation, target, speed_hz)?;
        self.move_synchronized(&request)
    }
}
