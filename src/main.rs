//! PaintBot simulator: runs the motion core against the simulated gantry.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 Adapters (outer ring)                    │
//! │   SimAxis ×5   SimSwitch ×4   SimDelay   SimTools        │
//! │   SimControl   LogEventSink                              │
//! │                                                          │
//! │  ──────────────── Port Trait Boundary ─────────────────  │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │        MachineService (pure logic)                 │  │
//! │  │  FSM · MotionCoordinator · HomingSequencer         │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! # Home, pre-clean and paint one part with the built-in machine constants
//! paintbot-sim
//!
//! # Own config, two coats, no rotary table, debug logs
//! paintbot-sim --config machine.json --coats 2 --no-rotation -v
//!
//! # Pull the abort line 5 s into the job
//! paintbot-sim --abort-at-ms 5000
//! ```

#![deny(unused_must_use)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use paintbot::adapters::log_sink::LogEventSink;
use paintbot::adapters::sim::{SimEvent, SimWorld, sim_rig};
use paintbot::app::commands::AppCommand;
use paintbot::app::service::MachineService;
use paintbot::config::MachineConfig;
use paintbot::fsm::StateId;
use paintbot::fsm::context::ControlSignals;
use paintbot::painting::AllSidesProgram;

/// Upper bound on control ticks per phase; every tick may block for a whole move.
const MAX_TICKS: u32 = 1_000;

/// PaintBot motion-core simulator
#[derive(Parser, Debug)]
#[command(name = "paintbot-sim")]
#[command(version)]
#[command(about = "Run homing and a painting job on the simulated gantry")]
struct Args {
    /// Machine configuration (JSON).  Built-in constants when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Coats for this job, overriding the configured count.
    #[arg(long)]
    coats: Option<u8>,

    /// Simulate a gantry without the rotary table.
    #[arg(long)]
    no_rotation: bool,

    /// Skip the pre-clean and go straight to painting all sides.
    #[arg(long)]
    all_sides: bool,

    /// Pause the job at this simulated time (ms).
    #[arg(long, value_name = "MS")]
    pause_at_ms: Option<u64>,

    /// Resume after a pause at this simulated time (ms).
    #[arg(long, value_name = "MS")]
    resume_at_ms: Option<u64>,

    /// Raise the abort signal at this simulated time (ms).
    #[arg(long, value_name = "MS")]
    abort_at_ms: Option<u64>,

    /// Print the default configuration as JSON and exit.
    #[arg(long)]
    dump_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);
    if let Err(e) = run(&args) {
        error!("paintbot-sim failed: {:#}", e);
        std::process::exit(1);
    }
}

fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: Option<&PathBuf>) -> Result<MachineConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<MachineConfig>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => MachineConfig::default(),
    };
    config.validate().map_err(paintbot::Error::from)?;
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&MachineConfig::default())?);
        return Ok(());
    }

    let config = load_config(args.config.as_ref())?;
    info!("paintbot-sim v{} starting", env!("CARGO_PKG_VERSION"));

    let signals = Arc::new(ControlSignals::new());
    let world = SimWorld::new(Arc::clone(&signals), &config).shared();
    {
        let mut w = world.borrow_mut();
        if let Some(at) = args.pause_at_ms {
            w.schedule(at, SimEvent::Pause);
        }
        if let Some(at) = args.resume_at_ms {
            w.schedule(at, SimEvent::Resume);
        }
        if let Some(at) = args.abort_at_ms {
            w.schedule(at, SimEvent::Abort);
        }
    }

    let rig = sim_rig(&world, &config, !args.no_rotation);
    let mut program = AllSidesProgram::new();
    if let Some(coats) = args.coats {
        program.request_coats(coats);
    }

    let mut sink = LogEventSink::new();
    let mut service = MachineService::new(rig, signals, config, program);

    // Power-up homing.
    service.start_from(StateId::Homing, &mut sink);
    if !service.run_until_idle(MAX_TICKS, &mut sink) {
        bail!("machine did not settle after power-up homing");
    }
    if let Some(report) = service.context().last_homing {
        if let Some(failure) = report.failure {
            return Err(paintbot::Error::from(failure).into());
        }
    }

    let command = if args.all_sides {
        AppCommand::PaintAllSides
    } else {
        AppCommand::StartPainting
    };
    service.handle_command(command, &mut sink);
    if !service.run_until_idle(MAX_TICKS, &mut sink) {
        bail!("job did not finish within {} ticks", MAX_TICKS);
    }

    let w = world.borrow();
    info!(
        "job finished after {} ticks, {:.1} s simulated, {} gun switches",
        service.tick_count(),
        w.now_ms() as f64 / 1000.0,
        w.gun_history().len()
    );
    Ok(())
}
