//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the simulated gantry.  All tests run on the host with no
//! real hardware required.

mod homing_tests;
mod mock_hw;
mod motion_tests;
mod painting_tests;
