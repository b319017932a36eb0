//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to.  It owns the rig, the configuration, the paint program and
//! the per-state bookkeeping.  Think of it as the "blackboard" in a
//! blackboard architecture.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::app::ports::Platform;
use crate::config::MachineConfig;
use crate::motion::{HomingReport, MotionCoordinator, Rig};

use super::StateId;

// ---------------------------------------------------------------------------
// Control signals (written by the control channel; read by the core)
// ---------------------------------------------------------------------------

/// Pause flag and abort signal.
///
/// Written from the external control channel (possibly another thread
/// or an interrupt), read by the poll loops every tick.
#[derive(Debug, Default)]
pub struct ControlSignals {
    paused: AtomicBool,
    abort: AtomicBool,
}

impl ControlSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Ask every running operation to stop and the machine to re-home.
    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    pub fn abort_requested(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    /// Acknowledge the abort.  Only the Homing state does this.
    pub fn clear_abort(&self) {
        self.abort.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Transition slots
// ---------------------------------------------------------------------------

/// One-shot "where to go next" slot plus the sticky all-sides flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionSlots {
    next_state_override: Option<StateId>,
    transitioning_to_paint_all_sides: bool,
}

impl TransitionSlots {
    pub fn set_next_state_override(&mut self, state: StateId) {
        self.next_state_override = Some(state);
    }

    /// Read and clear in one step.
    pub fn take_next_state_override(&mut self) -> Option<StateId> {
        self.next_state_override.take()
    }

    /// Peek without clearing.
    pub fn next_state_override(&self) -> Option<StateId> {
        self.next_state_override
    }

    pub fn set_transitioning_to_paint_all_sides(&mut self, value: bool) {
        self.transitioning_to_paint_all_sides = value;
    }

    pub fn is_transitioning_to_paint_all_sides(&self) -> bool {
        self.transitioning_to_paint_all_sides
    }

    pub fn clear_transitioning_to_paint_all_sides(&mut self) {
        self.transitioning_to_paint_all_sides = false;
    }
}

// ---------------------------------------------------------------------------
// Per-state bookkeeping
// ---------------------------------------------------------------------------

/// Sub-steps of the Painting state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaintingStep {
    #[default]
    Idle,
    RequestPreClean,
    PerformAllSides,
    MoveBeforeHoming,
    RequestHoming,
}

/// Sub-steps of the Cleaning state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CleaningStep {
    #[default]
    Idle,
    MoveToStation,
    Spray,
    Raise,
    Return,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningState {
    pub step: CleaningStep,
    /// Short burst instead of the full cleaning spray.
    pub short_mode: bool,
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext<P: Platform> {
    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,

    // -- Hardware --
    pub rig: Rig<P>,
    pub signals: Arc<ControlSignals>,

    // -- Configuration --
    pub config: MachineConfig,

    // -- Transition bookkeeping --
    pub transitions: TransitionSlots,
    pub painting_step: PaintingStep,
    pub cleaning: CleaningState,

    // -- Program --
    pub program: P::Program,

    // -- Homing --
    /// All translational motors zeroed by the last homing run.
    pub homed: bool,
    pub last_homing: Option<HomingReport>,
}

impl<P: Platform> FsmContext<P> {
    pub fn new(
        rig: Rig<P>,
        signals: Arc<ControlSignals>,
        config: MachineConfig,
        program: P::Program,
    ) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            rig,
            signals,
            config,
            transitions: TransitionSlots::default(),
            painting_step: PaintingStep::Idle,
            cleaning: CleaningState::default(),
            program,
            homed: false,
            last_homing: None,
        }
    }

    /// Borrow the rig for blocking moves.
    pub fn motion(&mut self) -> MotionCoordinator<'_, P> {
        self.rig.motion(&self.signals, &self.config)
    }

    pub fn abort_requested(&self) -> bool {
        self.signals.abort_requested()
    }
}
