//! Blocking, abortable, pause-aware synchronized moves.
//!
//! Every call commands its motors once and then polls until they stop:
//!
//! ```text
//!  command ──▶ ┌──────────────────────────────────────────┐
//!              │ while any commanded motor is running:    │
//!              │   (a) paused?  service control, wait     │
//!              │   (b) update limit switches, warn trips  │
//!              │   (c) abort?   force-stop in place → Aborted
//!              │   (d) trigger crossed? fire once         │
//!              │   sleep poll interval                    │
//!              └──────────────────────────────────────────┘
//!                         │ normal exit
//!                         ▼
//!              final trigger check ──▶ Completed
//! ```
//!
//! The abort signal is read every tick and never cleared here; only the
//! Homing state acknowledges it.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::ports::{AxisDriver, Clock, ControlChannel, Platform};
use crate::config::{MachineConfig, MotionConfig};
use crate::error::MotionError;
use crate::fsm::context::ControlSignals;

use super::{Axis, Gantry, Motor, MotionRequest, MoveOutcome, SwitchBank};

// ───────────────────────────────────────────────────────────────
// Trigger
// ───────────────────────────────────────────────────────────────

/// A one-shot action fired when `axis` crosses `threshold` during a move.
pub struct Trigger<F> {
    pub axis: Axis,
    /// Position (steps) at which the action fires
    pub threshold: i32,
    pub action: F,
}

impl<F: FnMut()> Trigger<F> {
    pub fn new(axis: Axis, threshold: i32, action: F) -> Self {
        Self {
            axis,
            threshold,
            action,
        }
    }
}

/// A trigger whose direction has been fixed from the start position.
struct ArmedTrigger<F> {
    axis: Axis,
    threshold: i32,
    positive: bool,
    action: F,
    fired: bool,
}

impl<F: FnMut()> ArmedTrigger<F> {
    fn crossed(&self, position: i32) -> bool {
        if self.positive {
            position >= self.threshold
        } else {
            position <= self.threshold
        }
    }

    /// Fire the action if still pending and the threshold is crossed.
    fn check(&mut self, position: i32) {
        if !self.fired && self.crossed(position) {
            (self.action)();
            self.fired = true;
            debug!(
                "MOTION: trigger on {} fired at {} ({} move)",
                self.axis,
                position,
                if self.positive { "positive" } else { "negative" }
            );
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Coordinator
// ───────────────────────────────────────────────────────────────

/// Borrowed view of the rig that runs blocking moves.
pub struct MotionCoordinator<'a, P: Platform> {
    gantry: &'a mut Gantry<P::Axis>,
    switches: &'a mut SwitchBank<P::Switch>,
    delay: &'a mut P::Delay,
    clock: &'a P::Clock,
    control: &'a mut P::Control,
    signals: &'a ControlSignals,
    config: MotionConfig,
    steps_per_degree: f32,
}

impl<'a, P: Platform> MotionCoordinator<'a, P> {
    pub(crate) fn new(
        gantry: &'a mut Gantry<P::Axis>,
        switches: &'a mut SwitchBank<P::Switch>,
        delay: &'a mut P::Delay,
        clock: &'a P::Clock,
        control: &'a mut P::Control,
        signals: &'a ControlSignals,
        config: &MachineConfig,
    ) -> Self {
        Self {
            gantry,
            switches,
            delay,
            clock,
            control,
            signals,
            config: config.motion,
            steps_per_degree: config.steps_per_degree,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Position of the axis' reference motor, `None` if not fitted.
    pub fn position(&self, axis: Axis) -> Option<i32> {
        self.gantry.position(axis)
    }

    pub fn gantry(&self) -> &Gantry<P::Axis> {
        &*self.gantry
    }

    pub fn has_rotation(&self) -> bool {
        self.gantry.has_rotation()
    }

    pub(crate) fn steps_per_degree(&self) -> f32 {
        self.steps_per_degree
    }

    // ── Moves ─────────────────────────────────────────────────

    /// Move every axis in `request` to its target and wait for all of them.
    pub fn move_synchronized(
        &mut self,
        request: &MotionRequest,
    ) -> Result<MoveOutcome, MotionError> {
        self.execute::<fn()>(request, None)
    }

    /// As [`move_synchronized`](Self::move_synchronized), firing
    /// `trigger.action` once when its axis crosses the threshold.
    ///
    /// Direction is fixed before any command is issued: positive when the
    /// target is at or beyond the start.  An axis not in the request
    /// keeps its start as target.
    pub fn move_synchronized_with_trigger<F: FnMut()>(
        &mut self,
        request: &MotionRequest,
        trigger: Trigger<F>,
    ) -> Result<MoveOutcome, MotionError> {
        self.execute(request, Some(trigger))
    }

    /// Wait `ms` milliseconds.  Paused time does not count; an abort ends
    /// the wait immediately.
    pub fn dwell(&mut self, ms: u32) -> MoveOutcome {
        let mut remaining = ms;
        while remaining > 0 {
            self.wait_while_paused();
            if self.signals.abort_requested() {
                info!("MOTION: dwell aborted with {} ms left", remaining);
                return MoveOutcome::Aborted;
            }
            let step = remaining.min(self.config.poll_interval_ms);
            self.delay.delay_ms(step);
            remaining -= step;
        }
        MoveOutcome::Completed
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn execute<F: FnMut()>(
        &mut self,
        request: &MotionRequest,
        trigger: Option<Trigger<F>>,
    ) -> Result<MoveOutcome, MotionError> {
        for t in request.targets() {
            if !self.gantry.has_axis(t.axis) {
                warn!("MOTION: {} requested but not fitted, move skipped", t.axis);
                return Err(MotionError::AxisUnavailable(t.axis));
            }
        }

        let mut armed = match trigger {
            Some(t) => {
                let start = self
                    .gantry
                    .position(t.axis)
                    .ok_or(MotionError::AxisUnavailable(t.axis))?;
                let target = request.target_of(t.axis).map_or(start, |a| a.target);
                Some(ArmedTrigger {
                    axis: t.axis,
                    threshold: t.threshold,
                    positive: target >= start,
                    action: t.action,
                    fired: false,
                })
            }
            None => None,
        };

        // Command every axis not already at its target.
        let mut commanded: heapless::Vec<(Motor, i32), 5> = heapless::Vec::new();
        for t in request.targets() {
            let motors = t.axis.motors();
            let at_target = motors
                .iter()
                .all(|&m| self.gantry.motor(m).is_some_and(|d| d.position() == t.target));
            if at_target {
                continue;
            }
            for &m in motors {
                if let Some(d) = self.gantry.motor_mut(m) {
                    d.set_speed_hz(t.speed_hz);
                    d.move_to(t.target);
                    // Five motors at most.
                    let _ = commanded.push((m, t.target));
                }
            }
        }

        if commanded.is_empty() {
            debug!("MOTION: all axes already at target");
            if let Some(trig) = armed.as_mut() {
                if let Some(pos) = self.gantry.position(trig.axis) {
                    trig.check(pos);
                }
            }
            return Ok(MoveOutcome::Completed);
        }

        while commanded.iter().any(|&(m, _)| self.gantry.is_running(m)) {
            // (a)
            self.wait_while_paused();

            // (b)
            for m in self.switches.update_all(self.clock.now_ms()) {
                warn!("MOTION: {} limit switch triggered during move", m);
            }

            // (c)
            if self.signals.abort_requested() {
                for &(m, _) in &commanded {
                    if let Some(d) = self.gantry.motor_mut(m) {
                        let here = d.position();
                        d.force_stop_at(here);
                    }
                }
                info!("MOTION: abort signal received, move stopped in place");
                return Ok(MoveOutcome::Aborted);
            }

            // (d)
            if let Some(trig) = armed.as_mut() {
                if let Some(pos) = self.gantry.position(trig.axis) {
                    trig.check(pos);
                }
            }

            self.delay.delay_ms(self.config.poll_interval_ms);
        }

        if let Some(trig) = armed.as_mut() {
            if let Some(pos) = self.gantry.position(trig.axis) {
                trig.check(pos);
            }
        }

        for &(m, target) in &commanded {
            if let Some(d) = self.gantry.motor(m) {
                if d.position() != target {
                    warn!(
                        "MOTION: {} stopped at {} instead of {}",
                        m,
                        d.position(),
                        target
                    );
                }
            }
        }
        debug!(
            "MOTION: move complete X:{:?} Y:{:?} Z:{:?}",
            self.position(Axis::X),
            self.position(Axis::Y),
            self.position(Axis::Z)
        );
        Ok(MoveOutcome::Completed)
    }

    /// Nested wait while the pause flag is held.  Only the control channel
    /// is serviced; no motor is commanded.
    fn wait_while_paused(&mut self) {
        if !self.signals.is_paused() {
            return;
        }
        info!("MOTION: paused");
        while self.signals.is_paused() {
            self.control.service();
            self.delay.delay_ms(self.config.pause_poll_interval_ms);
        }
        info!("MOTION: resumed");
    }
}
