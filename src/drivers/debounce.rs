//! Time-based debouncer for home and limit switches.
//!
//! ## Hardware
//!
//! Mechanical micro-switches on every translational axis, read through
//! an `embedded_hal` [`InputPin`].  Contact bounce on closure lasts a few
//! milliseconds, so a raw level is only reported once it has been
//! constant for the configured interval.
//!
//! ```text
//!  raw     ‾‾‾|_|‾|___________________
//!  stable  ‾‾‾‾‾‾‾‾‾‾‾‾‾‾|____________
//!                 ◀─ interval ─▶
//! ```
//!
//! `update()` is called from the poll loops at control-tick rate with
//! the current monotonic time; there is no error path, a failed pin
//! read simply keeps the previous raw level.

use embedded_hal::digital::InputPin;

pub struct Debouncer<P> {
    pin: P,
    interval_ms: u32,
    raw: bool,
    stable: bool,
    last_change_ms: u64,
}

impl<P: InputPin> Debouncer<P> {
    /// Take ownership of `pin` and seed both readings from its current level.
    pub fn attach(mut pin: P, interval_ms: u32) -> Self {
        let level = pin.is_high().unwrap_or(false);
        Self {
            pin,
            interval_ms,
            raw: level,
            stable: level,
            last_change_ms: 0,
        }
    }

    /// Change the stability interval (homing uses a tighter window).
    pub fn set_interval(&mut self, interval_ms: u32) {
        self.interval_ms = interval_ms;
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Sample the pin and advance the stability timer.
    /// Returns `true` when the debounced reading changed on this call.
    pub fn update(&mut self, now_ms: u64) -> bool {
        let level = self.pin.is_high().unwrap_or(self.raw);
        if level != self.raw {
            self.raw = level;
            self.last_change_ms = now_ms;
        }

        if self.raw != self.stable
            && now_ms.saturating_sub(self.last_change_ms) >= u64::from(self.interval_ms)
        {
            self.stable = self.raw;
            return true;
        }
        false
    }

    /// Last level that was constant for at least the interval.
    pub fn read(&self) -> bool {
        self.stable
    }

    /// Latest undebounced sample.
    pub fn raw(&self) -> bool {
        self.raw
    }
}
