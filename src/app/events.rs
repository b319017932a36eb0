//! Outbound application events.
//!
//! The [`MachineService`](super::service::MachineService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: log to serial, push to
//! the dashboard, record in a test.

use crate::fsm::StateId;
use crate::motion::HomingReport;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The application service has started (carries initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// A homing run finished.
    HomingFinished(HomingReport),

    /// A command was refused in the current state.
    CommandRejected { state: StateId },
}
