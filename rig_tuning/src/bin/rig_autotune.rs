//! # Rig Autotune
//!
//! Finds the ultimate gain and period of one axis by sweeping a pure
//! proportional controller toward a fixed target, then prints
//! Ziegler–Nichols PID gains.
//!
//! Run with the axis free to move. Ctrl-C stops the sweep; the motor is
//! commanded to zero and the driver released on every exit path.

use clap::Parser;
use rig_common::config::LogLevel;
use rig_hal::DriverRegistry;
use rig_tuning::TuneError;
use rig_tuning::config::{TuningConfig, load_tuning_config};
use rig_tuning::relay::RelayAutotuner;
use rig_tuning::rig::{DriverRig, WallClock};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, error, info, info_span, warn};
use tracing_subscriber::EnvFilter;

/// Rig Autotune — ultimate gain search
#[derive(Parser, Debug)]
#[command(name = "rig_autotune")]
#[command(version)]
#[command(about = "Ziegler-Nichols gains from a proportional gain sweep")]
struct Args {
    /// Path to the axis configuration TOML.
    #[arg(default_value = "config/axis.toml")]
    config: PathBuf,

    /// Trial target (overrides `[autotune] target`).
    #[arg(long)]
    target: Option<f64>,

    /// First gain tried (overrides `[autotune] start_gain`).
    #[arg(long)]
    start_gain: Option<f64>,

    /// Gain increment (overrides `[autotune] gain_step`).
    #[arg(long)]
    step: Option<f64>,

    /// Last gain tried (overrides `[autotune] max_gain`).
    #[arg(long)]
    max_gain: Option<f64>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = load_tuning_config(&args.config);
    let log_level = config
        .as_ref()
        .map_or(LogLevel::default(), |c| c.axis.shared.log_level);
    setup_tracing(&args, log_level);

    info!("Rig Autotune v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = match config {
        Ok(config) => run(&args, config),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }
}

fn run(args: &Args, mut config: TuningConfig) -> Result<(), Box<dyn std::error::Error>> {
    let tune = &mut config.autotune;
    if let Some(v) = args.target {
        tune.target = v;
    }
    if let Some(v) = args.start_gain {
        tune.start_gain = v;
    }
    if let Some(v) = args.step {
        tune.gain_step = v;
    }
    if let Some(v) = args.max_gain {
        tune.max_gain = v;
    }
    config.autotune.validate()?;
    let _span = info_span!("axis", name = %config.axis.shared.service_name).entered();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let bundle = DriverRegistry::with_builtin_drivers().open(&config.axis)?;
    let mut rig =
        DriverRig::open(&config.axis, bundle, WallClock::new())?.with_running_flag(running);

    let tuner = RelayAutotuner::new(config.autotune, config.axis.pid.direction);
    let result = tuner.run(&mut rig);
    rig.shutdown();

    match result {
        Ok(gains) => {
            info!("Ku = {:.3}, Pu = {:.3}s", gains.ku, gains.pu);
            println!("{gains}");
            Ok(())
        }
        Err(e @ TuneError::OscillationNotFound { .. }) => {
            warn!("Autotuning failed: {e}");
            println!("Autotuning failed: {e}");
            Ok(())
        }
        Err(TuneError::Interrupted) => {
            info!("Autotune interrupted");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Setup tracing subscriber based on CLI arguments.
///
/// `-v` forces DEBUG; otherwise `[shared] log_level` applies.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        log_level.as_level()
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
