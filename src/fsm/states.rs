//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers: no closures, no
//! dynamic dispatch, no heap.  This is the classic embedded C FSM pattern
//! expressed in safe Rust.
//!
//! ```text
//!  IDLE ──[abort]──▶ HOMING ──[done]──▶ IDLE
//!
//!  PAINTING ──[pre-clean]──▶ CLEANING ──[override]──▶ PAINTING
//!     │
//!     └──[all sides · park]──▶ HOMING
//!
//!  PAUSED ──[resume]──▶ override | IDLE
//!  PICK_AND_PLACE ──[command]──▶ …
//!
//!  Any motion state ──[abort]──▶ HOMING
//! ```

use log::{error, info, warn};

use crate::app::ports::{PaintProgram, Platform, ToolPort};
use crate::error::MotionError;
use crate::motion::{Axis, MotionRequest, MoveOutcome};

use super::context::{CleaningStep, FsmContext, PaintingStep};
use super::{StateDescriptor, StateId};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table<P: Platform>() -> [StateDescriptor<P>; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter::<P>),
            on_exit: None,
            on_update: idle_update::<P>,
        },
        // Index 1: Homing
        StateDescriptor {
            id: StateId::Homing,
            name: "Homing",
            on_enter: Some(homing_enter::<P>),
            on_exit: None,
            on_update: homing_update::<P>,
        },
        // Index 2: Painting
        StateDescriptor {
            id: StateId::Painting,
            name: "Painting",
            on_enter: Some(painting_enter::<P>),
            on_exit: Some(painting_exit::<P>),
            on_update: painting_update::<P>,
        },
        // Index 3: Cleaning
        StateDescriptor {
            id: StateId::Cleaning,
            name: "Cleaning",
            on_enter: Some(cleaning_enter::<P>),
            on_exit: Some(cleaning_exit::<P>),
            on_update: cleaning_update::<P>,
        },
        // Index 4: Paused
        StateDescriptor {
            id: StateId::Paused,
            name: "Paused",
            on_enter: Some(paused_enter::<P>),
            on_exit: None,
            on_update: paused_update::<P>,
        },
        // Index 5: PickAndPlace
        StateDescriptor {
            id: StateId::PickAndPlace,
            name: "PickAndPlace",
            on_enter: Some(pick_and_place_enter::<P>),
            on_exit: None,
            on_update: pick_and_place_update::<P>,
        },
    ]
}

/// Synchronized X/Y/Z move to a position given in inches.
fn move_to_inches<P: Platform>(
    ctx: &mut FsmContext<P>,
    xyz: [f32; 3],
    speeds: [u32; 3],
) -> Result<MoveOutcome, MotionError> {
    let c = &ctx.config;
    let request = MotionRequest::xyz(
        (c.inches_to_steps(xyz[0]), speeds[0]),
        (c.inches_to_steps(xyz[1]), speeds[1]),
        (c.inches_to_steps(xyz[2]), speeds[2]),
    )?;
    ctx.motion().move_synchronized(&request)
}

fn default_speeds<P: Platform>(ctx: &FsmContext<P>) -> [u32; 3] {
    let c = &ctx.config;
    [c.x.default_speed_hz, c.y.default_speed_hz, c.z.default_speed_hz]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter<P: Platform>(ctx: &mut FsmContext<P>) {
    ctx.rig.tools.all_off();
}

fn idle_update<P: Platform>(ctx: &mut FsmContext<P>) -> Option<StateId> {
    if ctx.abort_requested() {
        info!("Idle: home command received");
        return Some(StateId::Homing);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  HOMING state
// ═══════════════════════════════════════════════════════════════════════════

fn homing_enter<P: Platform>(ctx: &mut FsmContext<P>) {
    if ctx.signals.abort_requested() {
        // An abort cancels whatever sequence was in flight.
        ctx.painting_step = PaintingStep::Idle;
        let _ = ctx.transitions.take_next_state_override();
    }
    ctx.signals.clear_abort();
    ctx.rig.tools.paint_gun_off();
}

fn homing_update<P: Platform>(ctx: &mut FsmContext<P>) -> Option<StateId> {
    let report = ctx.rig.homing(&ctx.config).run();
    ctx.homed = report.success();
    ctx.last_homing = Some(report);
    if !ctx.homed {
        error!("Homing: machine is not referenced");
    }
    Some(StateId::Idle)
}

// ═══════════════════════════════════════════════════════════════════════════
//  PAINTING state
// ═══════════════════════════════════════════════════════════════════════════

fn painting_enter<P: Platform>(ctx: &mut FsmContext<P>) {
    if ctx.transitions.is_transitioning_to_paint_all_sides() {
        info!("Painting: all-sides request, skipping pre-paint clean");
        ctx.painting_step = PaintingStep::PerformAllSides;
        ctx.transitions.clear_transitioning_to_paint_all_sides();
    } else if ctx.painting_step == PaintingStep::Idle {
        ctx.painting_step = PaintingStep::RequestPreClean;
    } else {
        info!("Painting: resuming at {:?}", ctx.painting_step);
    }
}

fn painting_exit<P: Platform>(ctx: &mut FsmContext<P>) {
    ctx.rig.tools.paint_gun_off();
}

fn painting_update<P: Platform>(ctx: &mut FsmContext<P>) -> Option<StateId> {
    if ctx.abort_requested() && ctx.painting_step != PaintingStep::Idle {
        warn!("Painting: aborted");
        ctx.painting_step = PaintingStep::Idle;
        return Some(StateId::Homing);
    }

    match ctx.painting_step {
        PaintingStep::Idle => None,
        PaintingStep::RequestPreClean => {
            info!("Painting: requesting short pre-paint clean");
            ctx.cleaning.short_mode = true;
            ctx.transitions.set_next_state_override(StateId::Painting);
            ctx.painting_step = PaintingStep::PerformAllSides;
            Some(StateId::Cleaning)
        }
        PaintingStep::PerformAllSides => {
            info!("Painting: starting all-sides program");
            let FsmContext {
                rig,
                signals,
                config,
                program,
                ..
            } = &mut *ctx;
            let (mut motion, tools) = rig.motion_and_tools(signals, config);
            let result = program.paint_all_sides(&mut motion, tools, config);
            ctx.painting_step = match result {
                Ok(MoveOutcome::Completed) => PaintingStep::MoveBeforeHoming,
                Ok(MoveOutcome::Aborted) => {
                    warn!("Painting: program aborted");
                    PaintingStep::RequestHoming
                }
                Err(e) => {
                    error!("Painting: program failed: {}", e);
                    PaintingStep::RequestHoming
                }
            };
            None
        }
        PaintingStep::MoveBeforeHoming => {
            let park = ctx.config.painting.park_before_homing;
            let speeds = default_speeds(ctx);
            match move_to_inches(ctx, park, speeds) {
                Ok(MoveOutcome::Completed) => info!("Painting: parked before homing"),
                Ok(MoveOutcome::Aborted) => warn!("Painting: park move aborted"),
                Err(e) => error!("Painting: park move failed: {}", e),
            }
            ctx.painting_step = PaintingStep::Idle;
            Some(StateId::Homing)
        }
        PaintingStep::RequestHoming => {
            ctx.painting_step = PaintingStep::Idle;
            Some(StateId::Homing)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CLEANING state
// ═══════════════════════════════════════════════════════════════════════════

fn cleaning_enter<P: Platform>(ctx: &mut FsmContext<P>) {
    ctx.cleaning.step = CleaningStep::MoveToStation;
    info!(
        "Cleaning: {} clean",
        if ctx.cleaning.short_mode { "short" } else { "full" }
    );
}

fn cleaning_exit<P: Platform>(ctx: &mut FsmContext<P>) {
    ctx.rig.tools.paint_gun_off();
}

fn cleaning_abort<P: Platform>(ctx: &mut FsmContext<P>) -> Option<StateId> {
    warn!("Cleaning: aborted");
    ctx.rig.tools.paint_gun_off();
    ctx.cleaning.step = CleaningStep::Idle;
    ctx.cleaning.short_mode = false;
    Some(StateId::Homing)
}

fn cleaning_update<P: Platform>(ctx: &mut FsmContext<P>) -> Option<StateId> {
    if ctx.abort_requested() {
        return cleaning_abort(ctx);
    }

    let station = ctx.config.cleaning;
    let outcome = match ctx.cleaning.step {
        CleaningStep::Idle => return None,
        CleaningStep::MoveToStation => {
            let speeds = [station.x_speed_hz, station.y_speed_hz, station.z_speed_hz];
            let r = move_to_inches(ctx, station.station, speeds);
            ctx.cleaning.step = CleaningStep::Spray;
            r
        }
        CleaningStep::Spray => {
            let burst = if ctx.cleaning.short_mode {
                station.short_burst_ms
            } else {
                station.long_burst_ms
            };
            ctx.rig.tools.paint_gun_on();
            let r = ctx.motion().dwell(burst);
            ctx.rig.tools.paint_gun_off();
            ctx.cleaning.step = CleaningStep::Raise;
            Ok(r)
        }
        CleaningStep::Raise => {
            let r = MotionRequest::single(Axis::Z, 0, station.z_speed_hz)
                .and_then(|req| ctx.motion().move_synchronized(&req));
            ctx.cleaning.step = CleaningStep::Return;
            r
        }
        CleaningStep::Return => {
            ctx.cleaning.step = CleaningStep::Idle;
            ctx.cleaning.short_mode = false;
            let next = ctx
                .transitions
                .take_next_state_override()
                .unwrap_or(StateId::Idle);
            info!("Cleaning: done, returning to {:?}", next);
            return Some(next);
        }
    };

    match outcome {
        Ok(MoveOutcome::Completed) => None,
        Ok(MoveOutcome::Aborted) => cleaning_abort(ctx),
        Err(e) => {
            error!("Cleaning: {}", e);
            cleaning_abort(ctx)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  PAUSED state
// ═══════════════════════════════════════════════════════════════════════════

fn paused_enter<P: Platform>(ctx: &mut FsmContext<P>) {
    ctx.rig.tools.paint_gun_off();
}

fn paused_update<P: Platform>(ctx: &mut FsmContext<P>) -> Option<StateId> {
    if ctx.abort_requested() {
        return Some(StateId::Homing);
    }
    if ctx.signals.is_paused() {
        return None;
    }
    Some(
        ctx.transitions
            .take_next_state_override()
            .unwrap_or(StateId::Idle),
    )
}

// ═══════════════════════════════════════════════════════════════════════════
//  PICK-AND-PLACE state
// ═══════════════════════════════════════════════════════════════════════════

fn pick_and_place_enter<P: Platform>(ctx: &mut FsmContext<P>) {
    let [x, y] = ctx.config.pick_and_place.station;
    let speeds = default_speeds(ctx);
    let raise = MotionRequest::single(Axis::Z, 0, speeds[2])
        .and_then(|req| ctx.motion().move_synchronized(&req));
    if !matches!(raise, Ok(MoveOutcome::Completed)) {
        warn!("PickAndPlace: raise did not complete: {:?}", raise);
        return;
    }
    let c = &ctx.config;
    let request = MotionRequest::new()
        .with(Axis::X, c.inches_to_steps(x), speeds[0])
        .and_then(|r| r.with(Axis::Y, c.inches_to_steps(y), speeds[1]));
    match request.and_then(|req| ctx.motion().move_synchronized(&req)) {
        Ok(MoveOutcome::Completed) => info!("PickAndPlace: at station"),
        other => warn!("PickAndPlace: station move did not complete: {:?}", other),
    }
}

fn pick_and_place_update<P: Platform>(ctx: &mut FsmContext<P>) -> Option<StateId> {
    if ctx.abort_requested() {
        return Some(StateId::Homing);
    }
    None
}
