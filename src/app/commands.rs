//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (dashboard,
//! serial console, test harness) that the
//! [`MachineService`](super::service::MachineService) interprets and acts upon.

use crate::fsm::StateId;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Pre-clean, paint every side, park and re-home.
    StartPainting,

    /// Paint every side straight away, without the pre-paint clean.
    PaintAllSides,

    /// Full nozzle clean, then back to Idle.
    Clean,

    /// Abort whatever is running and re-home.
    Home,

    /// Hold all motion in place.
    Pause,

    /// Release a pause.
    Resume,

    /// Park the head at the pick-and-place station.
    PickAndPlace,

    /// Force the FSM into a specific state (debug / testing only).
    ForceState(StateId),
}
