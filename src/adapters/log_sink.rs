//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (serial console on the machine, the tracing
//! subscriber in the simulator).  A dashboard adapter would implement
//! the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::HomingFinished(report) => {
                if report.success() {
                    info!(
                        "HOMED | rotation={:?} | switch_pos={:?}",
                        report.outcome.rotation, report.switch_positions
                    );
                } else {
                    warn!(
                        "HOMED | FAILED {:?} | homed={:?}",
                        report.failure, report.outcome.homed
                    );
                }
            }
            AppEvent::CommandRejected { state } => {
                warn!("CMD   | rejected in {:?}", state);
            }
        }
    }
}
