//! Homing sequencer.
//!
//! Establishes the zero of every translational motor against its home
//! switch, then backs off a fixed distance so the switches are released.
//!
//! ```text
//!  Init ──▶ RotationHome? ──▶ AwaitSwitches ──▶ MoveAway ──▶ Finalize
//!                                  │ timeout        │ timeout
//!                                  ▼                ▼
//!                               Failure          Failure
//! ```
//!
//! Every wait is bounded by its own timeout.  A timed-out motor is
//! stopped where it is and keeps that position; the run is never
//! retried here.  Rotation trouble is only a warning.

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::app::ports::{AxisDriver, Clock, Platform};
use crate::config::MachineConfig;
use crate::error::HomingFailure;

use super::rotation::shortest_path_target;
use super::{Axis, Motor, Rig};

// ───────────────────────────────────────────────────────────────
// Outcome
// ───────────────────────────────────────────────────────────────

/// State of the optional rotary table after homing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStatus {
    /// No rotary motor fitted.
    Absent,
    /// Returned to 0° and zeroed.
    Homed,
    /// Did not reach 0° in time; stopped in place.
    Failed,
}

/// Per-motor homed flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomingOutcome {
    /// Indexed like [`Motor::TRANSLATIONAL`].
    pub homed: [bool; 4],
    pub rotation: RotationStatus,
}

impl HomingOutcome {
    fn new(rotation: RotationStatus) -> Self {
        Self {
            homed: [false; 4],
            rotation,
        }
    }

    /// True when every translational motor found its switch.
    pub fn success(&self) -> bool {
        self.homed.iter().all(|&h| h)
    }

    pub fn is_homed(&self, motor: Motor) -> bool {
        Motor::TRANSLATIONAL
            .iter()
            .position(|&m| m == motor)
            .is_some_and(|i| self.homed[i])
    }
}

/// Full result of one homing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomingReport {
    pub outcome: HomingOutcome,
    /// Phase that gave up, `None` on success.
    pub failure: Option<HomingFailure>,
    /// Logical positions at the end of AwaitSwitches, `[X, YL, YR, Z]`.
    pub switch_positions: Option<[i32; 4]>,
    /// Logical positions at the end of MoveAway, `[X, YL, YR, Z]`.
    pub move_away_positions: Option<[i32; 4]>,
}

impl HomingReport {
    pub fn success(&self) -> bool {
        self.failure.is_none() && self.outcome.success()
    }
}

// ───────────────────────────────────────────────────────────────
// Sequencer
// ───────────────────────────────────────────────────────────────

pub struct HomingSequencer<'a, P: Platform> {
    rig: &'a mut Rig<P>,
    config: &'a MachineConfig,
}

impl<'a, P: Platform> HomingSequencer<'a, P> {
    pub fn new(rig: &'a mut Rig<P>, config: &'a MachineConfig) -> Self {
        Self { rig, config }
    }

    /// Run the whole sequence.  Default accelerations are restored on
    /// every exit path.
    pub fn run(mut self) -> HomingReport {
        info!("HOMING: starting");
        self.rig
            .switches
            .set_interval(self.config.homing.switch_debounce_ms);

        let report = self.sequence();

        self.restore_defaults();
        self.rig
            .switches
            .set_interval(self.config.motion.limit_debounce_ms);

        match report.failure {
            None => info!("HOMING: completed, rotation {:?}", report.outcome.rotation),
            Some(f) => error!("HOMING: failed: {}", f),
        }
        report
    }

    fn sequence(&mut self) -> HomingReport {
        // ── Init ──
        self.rig.delay.delay_ms(self.config.homing.settle_ms);
        let now = self.rig.clock.now_ms();
        self.rig.switches.update_all(now);
        let closed: heapless::Vec<Motor, 4> = self.rig.switches.triggered().collect();
        info!("HOMING: switches triggered at start: {:?}", closed);
        self.apply_homing_profile();

        // ── RotationHome ──
        let rotation = self.home_rotation();
        let mut report = HomingReport {
            outcome: HomingOutcome::new(rotation),
            failure: None,
            switch_positions: None,
            move_away_positions: None,
        };

        // ── AwaitSwitches ──
        if let Err(f) = self.await_switches(&mut report.outcome) {
            report.failure = Some(f);
            return report;
        }
        report.switch_positions = Some(self.positions());
        info!("HOMING: all switches triggered");
        self.rig
            .delay
            .delay_ms(self.config.homing.post_switch_delay_ms);

        // ── MoveAway ──
        if let Err(f) = self.move_away() {
            report.failure = Some(f);
            return report;
        }
        report.move_away_positions = Some(self.positions());

        // ── Finalize ──
        for m in Motor::TRANSLATIONAL {
            if let Some(d) = self.rig.gantry.motor_mut(m) {
                d.set_position(0);
            }
        }
        report
    }

    fn apply_homing_profile(&mut self) {
        let c = self.config;
        for m in Motor::TRANSLATIONAL {
            let axis_cfg = axis_config(c, m.axis());
            if let Some(d) = self.rig.gantry.motor_mut(m) {
                d.set_speed_hz(axis_cfg.homing_speed_hz);
                d.set_acceleration(axis_cfg.homing_accel);
            }
        }
        if let Some(rot) = self.rig.gantry.rotation.as_mut() {
            rot.set_speed_hz((c.rotation.default_speed_hz / 2).max(1));
            rot.set_acceleration((c.rotation.default_accel / 2).max(1));
        }
    }

    fn restore_defaults(&mut self) {
        let c = self.config;
        for axis in [Axis::X, Axis::Y, Axis::Z, Axis::Rotation] {
            self.rig
                .gantry
                .set_axis_acceleration(axis, axis_config(c, axis).default_accel);
        }
    }

    /// Blocking shortest-path return of the rotary table to 0°.
    fn home_rotation(&mut self) -> RotationStatus {
        let steps_per_degree = self.config.steps_per_degree;
        let Some(rot) = self.rig.gantry.rotation.as_mut() else {
            return RotationStatus::Absent;
        };
        let target = shortest_path_target(rot.position(), 0.0, steps_per_degree);
        info!("HOMING: rotating to 0 deg (step {})", target);
        rot.move_to(target);

        let start = self.rig.clock.now_ms();
        let timeout = u64::from(self.config.homing.rotation_timeout_ms);
        loop {
            let Some(rot) = self.rig.gantry.rotation.as_mut() else {
                return RotationStatus::Absent;
            };
            if !rot.is_running() {
                rot.set_position(0);
                info!("HOMING: rotation zeroed");
                return RotationStatus::Homed;
            }
            if self.rig.clock.now_ms().saturating_sub(start) > timeout {
                let here = rot.position();
                rot.force_stop_at(here);
                warn!("HOMING: rotation did not reach 0 deg, stopped at {}", here);
                return RotationStatus::Failed;
            }
            self.rig.delay.delay_ms(self.config.motion.poll_interval_ms);
        }
    }

    fn await_switches(&mut self, outcome: &mut HomingOutcome) -> Result<(), HomingFailure> {
        for m in Motor::TRANSLATIONAL {
            let dir = axis_config(self.config, m.axis()).home_direction;
            if let Some(d) = self.rig.gantry.motor_mut(m) {
                d.run_continuous(dir);
            }
        }

        let start = self.rig.clock.now_ms();
        let timeout = u64::from(self.config.homing.timeout_ms);
        while !outcome.success() {
            let now = self.rig.clock.now_ms();
            if now.saturating_sub(start) > timeout {
                for (i, m) in Motor::TRANSLATIONAL.into_iter().enumerate() {
                    if outcome.homed[i] {
                        continue;
                    }
                    if let Some(d) = self.rig.gantry.motor_mut(m) {
                        let here = d.position();
                        d.force_stop_at(here);
                        error!("HOMING: {} switch never triggered, stopped at {}", m, here);
                    }
                }
                return Err(HomingFailure::SwitchTimeout);
            }

            for (i, m) in Motor::TRANSLATIONAL.into_iter().enumerate() {
                if outcome.homed[i] {
                    continue;
                }
                self.rig.switches.update(m, now);
                if self.rig.switches.is_triggered(m) {
                    if let Some(d) = self.rig.gantry.motor_mut(m) {
                        d.force_stop_at(0);
                    }
                    outcome.homed[i] = true;
                    info!("HOMING: {} switch triggered", m);
                }
            }

            if !outcome.success() {
                self.rig.delay.delay_ms(self.config.motion.poll_interval_ms);
            }
        }
        Ok(())
    }

    fn move_away(&mut self) -> Result<(), HomingFailure> {
        let c = self.config;
        let distance = c.inches_to_steps(c.homing.move_away_inches);
        info!("HOMING: backing off {} steps", distance);
        for m in Motor::TRANSLATIONAL {
            let axis_cfg = axis_config(c, m.axis());
            if let Some(d) = self.rig.gantry.motor_mut(m) {
                d.set_acceleration(axis_cfg.move_away_accel);
                d.move_to(axis_cfg.home_direction.opposite().sign() * distance);
            }
        }

        let start = self.rig.clock.now_ms();
        let timeout = u64::from(c.homing.move_away_timeout_ms);
        while Motor::TRANSLATIONAL
            .iter()
            .any(|&m| self.rig.gantry.is_running(m))
        {
            if self.rig.clock.now_ms().saturating_sub(start) > timeout {
                for m in Motor::TRANSLATIONAL {
                    if let Some(d) = self.rig.gantry.motor_mut(m) {
                        let here = d.position();
                        d.force_stop_at(here);
                    }
                }
                error!("HOMING: timed out moving away from switches");
                return Err(HomingFailure::MoveAwayTimeout);
            }
            self.rig.delay.delay_ms(c.motion.poll_interval_ms);
        }
        Ok(())
    }

    fn positions(&self) -> [i32; 4] {
        Motor::TRANSLATIONAL.map(|m| self.rig.gantry.motor(m).map_or(0, AxisDriver::position))
    }
}

fn axis_config(c: &MachineConfig, axis: Axis) -> &crate::config::AxisConfig {
    match axis {
        Axis::X => &c.x,
        Axis::Y => &c.y,
        Axis::Z => &c.z,
        Axis::Rotation => &c.rotation,
    }
}
