//! Application core: machine orchestration behind port traits.
//!
//! This module holds the service that drives the operating-state
//! machine, the commands it accepts and the events it emits.  All
//! interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable against the simulator.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
