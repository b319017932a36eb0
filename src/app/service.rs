//! Application service: the hexagonal core.
//!
//! [`MachineService`] owns the FSM and the shared context (rig, config,
//! transition slots, paint program).  It exposes a clean,
//! hardware-agnostic API.  All I/O flows through the port traits of the
//! [`Platform`], making the whole machine testable with the simulator.
//!
//! ```text
//!  AppCommand ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                 │     MachineService      │
//!   Platform  ◀──│  FSM · Motion · Homing  │
//!                 └────────────────────────┘
//! ```

use std::sync::Arc;

use log::{info, warn};

use crate::config::MachineConfig;
use crate::fsm::context::{ControlSignals, FsmContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::motion::Rig;

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{EventSink, Platform};

// ───────────────────────────────────────────────────────────────
// MachineService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct MachineService<P: Platform> {
    fsm: Fsm<P>,
    ctx: FsmContext<P>,
    tick_count: u64,
}

impl<P: Platform> MachineService<P> {
    /// Construct the service around a rig and its shared control signals.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) or
    /// [`start_from`](Self::start_from) next.
    pub fn new(
        rig: Rig<P>,
        signals: Arc<ControlSignals>,
        config: MachineConfig,
        program: P::Program,
    ) -> Self {
        Self {
            fsm: Fsm::new(build_state_table()),
            ctx: FsmContext::new(rig, signals, config, program),
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the FSM in Idle.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.start_from(StateId::Idle, sink);
    }

    /// Start the FSM directly in `state` (e.g. Homing at power-up).
    pub fn start_from(&mut self, state: StateId, sink: &mut impl EventSink) {
        self.fsm.change_state(state, &mut self.ctx);
        sink.emit(&AppEvent::Started(state));
        info!("MachineService started in {:?}", state);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one update of the active state.  May block for the length of
    /// a move, a homing run or a whole painting program.
    pub fn tick(&mut self, sink: &mut impl EventSink) {
        self.tick_count += 1;
        let Some(prev) = self.fsm.current_state() else {
            warn!("tick before start");
            return;
        };

        self.fsm.update(&mut self.ctx);

        let Some(now) = self.fsm.current_state() else {
            return;
        };
        if prev == StateId::Homing && now != StateId::Homing {
            if let Some(report) = self.ctx.last_homing {
                sink.emit(&AppEvent::HomingFinished(report));
            }
        }
        if now != prev {
            sink.emit(&AppEvent::StateChanged {
                from: prev,
                to: now,
            });
        }
    }

    /// Tick until the machine rests in Idle or `max_ticks` runs out.
    /// Returns `true` when Idle was reached.
    pub fn run_until_idle(&mut self, max_ticks: u32, sink: &mut impl EventSink) -> bool {
        for _ in 0..max_ticks {
            self.tick(sink);
            if self.state() == Some(StateId::Idle) && !self.ctx.abort_requested() {
                return true;
            }
        }
        false
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.
    pub fn handle_command(&mut self, cmd: AppCommand, sink: &mut impl EventSink) {
        let current = self.fsm.current_state();
        match cmd {
            AppCommand::StartPainting => {
                if self.require_idle(current, sink) {
                    self.change_state(StateId::Painting, sink);
                }
            }
            AppCommand::PaintAllSides => {
                if self.require_idle(current, sink) {
                    self.ctx
                        .transitions
                        .set_transitioning_to_paint_all_sides(true);
                    self.change_state(StateId::Painting, sink);
                }
            }
            AppCommand::Clean => {
                if self.require_idle(current, sink) {
                    self.ctx.cleaning.short_mode = false;
                    self.change_state(StateId::Cleaning, sink);
                }
            }
            AppCommand::PickAndPlace => {
                if self.require_idle(current, sink) {
                    self.change_state(StateId::PickAndPlace, sink);
                }
            }
            AppCommand::Home => {
                if current == Some(StateId::Homing) {
                    info!("Home command ignored, already homing");
                } else {
                    self.ctx.signals.request_abort();
                }
            }
            AppCommand::Pause => {
                self.ctx.signals.pause();
                // A pending override belongs to a running sequence; the
                // flag alone holds that sequence's motion.
                if let Some(state) = current {
                    if state != StateId::Paused
                        && state != StateId::Homing
                        && self.ctx.transitions.next_state_override().is_none()
                    {
                        self.ctx.transitions.set_next_state_override(state);
                        self.change_state(StateId::Paused, sink);
                    }
                }
            }
            AppCommand::Resume => {
                self.ctx.signals.resume();
            }
            AppCommand::ForceState(target) => {
                self.change_state(target, sink);
            }
        }
    }

    /// Transition immediately, running exit and enter hooks.
    pub fn change_state(&mut self, next: StateId, sink: &mut impl EventSink) {
        let prev = self.fsm.current_state();
        self.fsm.change_state(next, &mut self.ctx);
        if let Some(from) = prev {
            sink.emit(&AppEvent::StateChanged { from, to: next });
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state, `None` before start.
    pub fn state(&self) -> Option<StateId> {
        self.fsm.current_state()
    }

    pub fn state_name(&self) -> &'static str {
        self.fsm
            .current_state()
            .map_or("<none>", |s| self.fsm.state_name(s))
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn context(&self) -> &FsmContext<P> {
        &self.ctx
    }

    pub fn signals(&self) -> &Arc<ControlSignals> {
        &self.ctx.signals
    }

    pub fn config(&self) -> &MachineConfig {
        &self.ctx.config
    }

    // ── Internal ──────────────────────────────────────────────

    fn require_idle(&self, current: Option<StateId>, sink: &mut impl EventSink) -> bool {
        match current {
            Some(StateId::Idle) => true,
            Some(state) => {
                warn!("Command refused in {:?}", state);
                sink.emit(&AppEvent::CommandRejected { state });
                false
            }
            None => false,
        }
    }
}
