//! # Gantry Sweep Controller
//!
//! Runs the sweep controller against the simulated rig described by a
//! TOML config: builds the rig, constructs the controller, then drives
//! the host tick loop until the sweep finishes or the tick budget runs
//! out. Each host tick performs controller work first, then advances
//! the simulated physics by one `tick_interval_s`.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use gantry_common::tick::TickReasons;
use gantry_controller::config::{build_sim_rig, load_config};
use gantry_controller::controller::Controller;
use gantry_controller::sweep::SweepPhase;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// Gantry Sweep Controller — tick-driven raster sweep over a simulated rig
#[derive(Parser, Debug)]
#[command(name = "gantry_controller")]
#[command(version)]
#[command(about = "Tick-driven cooperative sweep controller for a three-axis gantry rig")]
struct Args {
    /// Path to the sweep configuration TOML.
    #[arg(default_value = "demos/sweep.toml")]
    config: PathBuf,

    /// Maximum host ticks before giving up.
    #[arg(long, default_value_t = 100_000)]
    max_ticks: u64,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Gantry Sweep Controller v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = load_config(&args.config)?;
    info!(
        "Config OK: cell_width={}, velocity={}, fill_ratio={}",
        cfg.sweep.cell_width, cfg.sweep.velocity, cfg.sweep.fill_ratio,
    );

    let (rig, harness) = build_sim_rig(&cfg);
    let mut controller = Controller::new(rig, &cfg)?;

    let mut resume = false;
    let mut ticks = 0u64;
    while ticks < args.max_ticks {
        let reasons = if resume {
            TickReasons::PERIODIC | TickReasons::CONTINUATION
        } else {
            TickReasons::PERIODIC
        };
        let outcome = controller.handle_tick("", reasons)?;
        harness.tick();
        resume = outcome.resume;
        ticks += 1;

        if controller.phase() == SweepPhase::Finished && !resume {
            break;
        }
    }

    let stats = controller.stats();
    info!(
        phase = ?controller.phase(),
        ticks,
        scan_passes = stats.scan_passes,
        x_steps = stats.x_steps,
        z_steps = stats.z_steps,
        "run ended"
    );
    if controller.phase() != SweepPhase::Finished {
        error!("sweep did not finish within {} ticks", args.max_ticks);
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
