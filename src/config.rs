//! Machine configuration parameters
//!
//! All tunable parameters for the painting gantry.  Defaults match the
//! production machine; a JSON file can override them at startup.
//! Positions are stored in physical units (inches, degrees) and
//! converted to steps through [`MachineConfig::inches_to_steps`] and
//! [`MachineConfig::degrees_to_steps`].

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::motion::Direction;

/// Per-axis speed and acceleration profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Normal travel speed (steps/s)
    pub default_speed_hz: u32,
    /// Normal acceleration (steps/s²), restored after homing
    pub default_accel: u32,
    /// Speed while seeking the home switch (steps/s)
    pub homing_speed_hz: u32,
    /// Acceleration while seeking the home switch (steps/s²)
    pub homing_accel: u32,
    /// Acceleration for the back-off move after the switch fired
    pub move_away_accel: u32,
    /// Direction of travel towards the home switch
    pub home_direction: Direction,
}

/// Homing timing and geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomingConfig {
    /// Upper bound on the switch search (milliseconds)
    pub timeout_ms: u32,
    /// Distance to back off from every switch (inches)
    pub move_away_inches: f32,
    /// Upper bound on the back-off move (milliseconds)
    pub move_away_timeout_ms: u32,
    /// Upper bound on the rotary return to 0° (milliseconds)
    pub rotation_timeout_ms: u32,
    /// Quiet period before the sequence starts (milliseconds)
    pub settle_ms: u32,
    /// Home switch debounce interval (milliseconds)
    pub switch_debounce_ms: u32,
    /// Pause after all switches fired before backing off (milliseconds)
    pub post_switch_delay_ms: u32,
}

/// Motion coordinator poll cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Poll interval while axes are moving (milliseconds)
    pub poll_interval_ms: u32,
    /// Poll interval while the pause flag is held (milliseconds)
    pub pause_poll_interval_ms: u32,
    /// Limit switch debounce interval (milliseconds)
    pub limit_debounce_ms: u32,
    /// Home/limit switches read HIGH when triggered
    pub switch_active_high: bool,
}

/// Persisted settings for one side pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideSettings {
    /// Spray servo angle (degrees)
    pub servo_angle: u16,
    /// Rotary table angle presenting this side (degrees)
    pub rotation_angle: f32,
    /// Painting height (inches)
    pub z_height: f32,
    /// Safe travel height for this side (inches)
    pub safe_z_height: f32,
    /// Pattern start X (inches)
    pub start_x: f32,
    /// Pattern start Y (inches)
    pub start_y: f32,
    /// X shift between sweeps (towards -X), or the X pass length for
    /// single-pass sides (towards +X) (inches)
    pub shift_x: f32,
    /// Y sweep length; 0 selects the single X pass pattern (inches)
    pub sweep_y: f32,
    /// Number of Y sweeps (ignored for single-pass sides)
    pub sweeps: u8,
    /// Painting X speed (steps/s)
    pub paint_x_speed_hz: u32,
    /// Painting Y speed (steps/s)
    pub paint_y_speed_hz: u32,
}

/// All-sides painting program.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaintingConfig {
    /// Coats applied per painting run
    pub coats: u8,
    /// Delay between coats, shown as a loading-bar X move (seconds)
    pub inter_coat_delay_secs: u32,
    /// Pressure pot pressurization wait (milliseconds)
    pub pressurize_ms: u32,
    /// Gun shut-off lead before the end of a single X pass (inches)
    pub gun_off_lead_inches: f32,
    /// Loading-bar start X (inches)
    pub loading_bar_start_x: f32,
    /// Loading-bar end X (inches)
    pub loading_bar_end_x: f32,
    /// Position visited before requesting homing (inches: x, y, z)
    pub park_before_homing: [f32; 3],
    /// Side settings, index 0 = side 1
    pub sides: [SideSettings; 4],
}

/// Nozzle cleaning station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Station position (inches: x, y, z)
    pub station: [f32; 3],
    pub x_speed_hz: u32,
    pub y_speed_hz: u32,
    pub z_speed_hz: u32,
    /// Spray burst in short mode (milliseconds)
    pub short_burst_ms: u32,
    /// Spray burst in full mode (milliseconds)
    pub long_burst_ms: u32,
}

/// Pick-and-place station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickAndPlaceConfig {
    /// Station position (inches: x, y)
    pub station: [f32; 2],
}

/// Core machine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    // --- Geometry ---
    /// Linear steps per inch (X, Y, Z share one lead)
    pub steps_per_inch: f32,
    /// Rotary steps per degree
    pub steps_per_degree: f32,

    // --- Axes ---
    pub x: AxisConfig,
    pub y: AxisConfig,
    pub z: AxisConfig,
    pub rotation: AxisConfig,

    // --- Subsystems ---
    pub homing: HomingConfig,
    pub motion: MotionConfig,
    pub painting: PaintingConfig,
    pub cleaning: CleaningConfig,
    pub pick_and_place: PickAndPlaceConfig,
}

impl Default for MachineConfig {
    fn default() -> Self {
        let side = SideSettings {
            servo_angle: 35,
            rotation_angle: 0.0,
            z_height: -1.0,
            safe_z_height: 0.0,
            start_x: 4.0,
            start_y: 4.0,
            shift_x: 20.0,
            sweep_y: 0.0,
            sweeps: 1,
            paint_x_speed_hz: 10_000,
            paint_y_speed_hz: 10_000,
        };
        // Sweeps start at +Y and shift towards -X.
        let serpentine = SideSettings {
            start_x: 20.0,
            start_y: 24.0,
            sweep_y: 20.0,
            shift_x: 4.0,
            sweeps: 5,
            ..side
        };

        Self {
            steps_per_inch: 127.0 * 8.0, // 8 µsteps, 2 mm lead
            steps_per_degree: 8.888_889,

            x: AxisConfig {
                default_speed_hz: 20_000,
                default_accel: 20_000,
                homing_speed_hz: 3_000,
                homing_accel: 20_000,
                move_away_accel: 10_000,
                home_direction: Direction::Negative,
            },
            y: AxisConfig {
                default_speed_hz: 20_000,
                default_accel: 20_000,
                homing_speed_hz: 3_000,
                homing_accel: 20_000,
                move_away_accel: 10_000,
                home_direction: Direction::Negative,
            },
            z: AxisConfig {
                default_speed_hz: 4_000,
                default_accel: 10_000,
                homing_speed_hz: 2_000,
                homing_accel: 10_000,
                move_away_accel: 5_000,
                // Z homes upwards.
                home_direction: Direction::Positive,
            },
            rotation: AxisConfig {
                default_speed_hz: 2_000,
                default_accel: 2_000,
                homing_speed_hz: 1_000,
                homing_accel: 1_000,
                move_away_accel: 1_000,
                home_direction: Direction::Negative,
            },

            homing: HomingConfig {
                timeout_ms: 40_000,
                move_away_inches: 0.5,
                move_away_timeout_ms: 5_000,
                rotation_timeout_ms: 10_000,
                settle_ms: 250,
                switch_debounce_ms: 5,
                post_switch_delay_ms: 5,
            },
            motion: MotionConfig {
                poll_interval_ms: 1,
                pause_poll_interval_ms: 100,
                limit_debounce_ms: 5,
                switch_active_high: true,
            },
            painting: PaintingConfig {
                coats: 1,
                inter_coat_delay_secs: 10,
                pressurize_ms: 1_000,
                gun_off_lead_inches: 0.5,
                loading_bar_start_x: 24.0,
                loading_bar_end_x: 0.0,
                park_before_homing: [3.0, 3.0, 0.0],
                sides: [
                    SideSettings { rotation_angle: 0.0, ..side },
                    SideSettings { rotation_angle: 90.0, ..serpentine },
                    SideSettings { rotation_angle: 180.0, ..serpentine },
                    SideSettings { rotation_angle: 270.0, ..serpentine },
                ],
            },
            cleaning: CleaningConfig {
                station: [0.0, 2.0, -1.5],
                x_speed_hz: 15_000,
                y_speed_hz: 15_000,
                z_speed_hz: 4_000,
                short_burst_ms: 500,
                long_burst_ms: 3_000,
            },
            pick_and_place: PickAndPlaceConfig {
                station: [10.0, 10.0],
            },
        }
    }
}

impl MachineConfig {
    /// Convert a linear distance to whole steps (truncating, as the drivers do).
    pub fn inches_to_steps(&self, inches: f32) -> i32 {
        (inches * self.steps_per_inch) as i32
    }

    /// Convert a rotary angle to whole steps.
    pub fn degrees_to_steps(&self, degrees: f32) -> i32 {
        (degrees * self.steps_per_degree) as i32
    }

    /// Rotary steps in one full turn.
    pub fn steps_per_revolution(&self) -> i32 {
        self.degrees_to_steps(360.0)
    }

    /// Reject values that would make the machine unsafe or the loops unbounded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps_per_inch <= 0.0 {
            return Err(ConfigError::ValidationFailed("steps_per_inch must be > 0"));
        }
        if self.steps_per_degree <= 0.0 {
            return Err(ConfigError::ValidationFailed("steps_per_degree must be > 0"));
        }
        for axis in [&self.x, &self.y, &self.z, &self.rotation] {
            if axis.default_speed_hz == 0 || axis.homing_speed_hz == 0 {
                return Err(ConfigError::ValidationFailed("axis speeds must be > 0"));
            }
            if axis.default_accel == 0 || axis.homing_accel == 0 || axis.move_away_accel == 0 {
                return Err(ConfigError::ValidationFailed("axis accelerations must be > 0"));
            }
        }
        if self.homing.timeout_ms == 0 || self.homing.move_away_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("homing timeouts must be > 0"));
        }
        if self.homing.move_away_inches <= 0.0 {
            return Err(ConfigError::ValidationFailed("move_away_inches must be > 0"));
        }
        if self.motion.poll_interval_ms == 0 || self.motion.pause_poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("poll intervals must be > 0"));
        }
        if self.painting.coats == 0 {
            return Err(ConfigError::ValidationFailed("coats must be >= 1"));
        }
        for side in &self.painting.sides {
            if side.paint_x_speed_hz == 0 || side.paint_y_speed_hz == 0 {
                return Err(ConfigError::ValidationFailed("side painting speeds must be > 0"));
            }
            if side.sweep_y != 0.0 && side.sweeps == 0 {
                return Err(ConfigError::ValidationFailed("serpentine sides need >= 1 sweep"));
            }
            if side.sweep_y == 0.0 && self.inches_to_steps(side.shift_x) == 0 {
                return Err(ConfigError::ValidationFailed("single-pass sides need X travel"));
            }
        }
        let c = &self.cleaning;
        if c.x_speed_hz == 0 || c.y_speed_hz == 0 || c.z_speed_hz == 0 {
            return Err(ConfigError::ValidationFailed("cleaning speeds must be > 0"));
        }
        Ok(())
    }
}
