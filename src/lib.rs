//! PaintBot motion core.
//!
//! Motion coordination, homing and the operating-state machine of the
//! four-axis painting gantry.  Every hardware dependency sits behind the
//! port traits in [`app::ports`]; the [`adapters::sim`] platform runs the
//! whole machine on the host for the simulator binary and the tests.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod motion;
pub mod painting;

pub use error::{Error, Result};
