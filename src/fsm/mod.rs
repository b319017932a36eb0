//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌──────────────┬───────────┬──────────┬───────────────────┐  │
//! │  │ StateId      │ on_enter  │ on_exit  │ on_update         │  │
//! │  ├──────────────┼───────────┼──────────┼───────────────────┤  │
//! │  │ Idle         │ fn(ctx)   │    -     │ fn(ctx)->Option<> │  │
//! │  │ Homing       │ fn(ctx)   │    -     │ fn(ctx)->Option<> │  │
//! │  │ Painting     │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  │ Cleaning     │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  │ Paused       │ fn(ctx)   │    -     │ fn(ctx)->Option<> │  │
//! │  │ PickAndPlace │ fn(ctx)   │    -     │ fn(ctx)->Option<> │  │
//! │  └──────────────┴───────────┴──────────┴───────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  An update may block for the length of a move.
//! All functions receive `&mut FsmContext` which holds the rig,
//! config, transition slots and per-state bookkeeping.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

use crate::app::ports::Platform;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all operating states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Homing = 1,
    Painting = 2,
    Cleaning = 3,
    Paused = 4,
    PickAndPlace = 5,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 6;

    pub const ALL: [StateId; Self::COUNT] = [
        Self::Idle,
        Self::Homing,
        Self::Painting,
        Self::Cleaning,
        Self::Paused,
        Self::PickAndPlace,
    ];
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn<P> = fn(&mut FsmContext<P>);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to request a transition, or `None` to stay.
pub type StateUpdateFn<P> = fn(&mut FsmContext<P>) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array: no heap, no `dyn`.
pub struct StateDescriptor<P: Platform> {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn<P>>,
    pub on_exit: Option<StateActionFn<P>>,
    pub on_update: StateUpdateFn<P>,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table (array of [`StateDescriptor`]).  The mutable
/// [`FsmContext`] is threaded through every handler call.
pub struct Fsm<P: Platform> {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor<P>; StateId::COUNT],
    /// Currently active state, `None` before the first `change_state`.
    current: Option<StateId>,
    /// Monotonically increasing tick counter.
    tick_count: u64,
    /// Tick at which the current state was entered.
    state_entry_tick: u64,
}

impl<P: Platform> Fsm<P> {
    /// Construct an FSM with no active state.
    pub fn new(table: [StateDescriptor<P>; StateId::COUNT]) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: None,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Transition to `next`: exit of the current state (if any), then
    /// enter of `next`.  Runs both hooks even when `next` is already
    /// the current state.
    pub fn change_state(&mut self, next: StateId, ctx: &mut FsmContext<P>) {
        match self.current {
            Some(cur) => {
                info!(
                    "FSM transition: {} -> {}",
                    self.table[cur as usize].name,
                    self.table[next as usize].name
                );
                if let Some(exit) = self.table[cur as usize].on_exit {
                    exit(ctx);
                }
            }
            None => info!("FSM starting in state: {}", self.table[next as usize].name),
        }

        self.current = Some(next);
        self.state_entry_tick = self.tick_count;
        ctx.ticks_in_state = 0;

        if let Some(enter) = self.table[next as usize].on_enter {
            enter(ctx);
        }
    }

    /// Run one update of the current state and execute any transition it
    /// requests.  No-op before the first `change_state`.
    pub fn update(&mut self, ctx: &mut FsmContext<P>) {
        let Some(cur) = self.current else {
            return;
        };
        self.tick_count += 1;
        ctx.ticks_in_state = self.tick_count - self.state_entry_tick;
        ctx.total_ticks = self.tick_count;

        if let Some(next) = (self.table[cur as usize].on_update)(ctx) {
            self.change_state(next, ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> Option<StateId> {
        self.current
    }

    pub fn state_name(&self, id: StateId) -> &'static str {
        self.table[id as usize].name
    }

    /// How many ticks the FSM has been in the current state.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }
}
