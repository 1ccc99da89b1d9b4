//! # Rig Control Unit
//!
//! Positions one DC motor axis at the targets written to the setpoint file.
//!
//! Loads the axis TOML, opens the configured driver backend, configures the
//! driver, attaches the encoder and ticks the control loop until Ctrl-C or a
//! fatal fault. Every exit path commands zero and releases the encoder and
//! the driver.

use clap::Parser;
use rig_common::axis::AxisConfig;
use rig_common::config::LogLevel;
use rig_control_unit::config::load_config;
use rig_control_unit::cycle::ControlLoop;
use rig_control_unit::setpoint::FileSetpoint;
use rig_hal::DriverRegistry;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, error, info, info_span};
use tracing_subscriber::EnvFilter;

/// Rig Control Unit — closed-loop motor positioning
#[derive(Parser, Debug)]
#[command(name = "rig_control_unit")]
#[command(version)]
#[command(about = "Closed-loop DC motor position controller")]
struct Args {
    /// Path to the axis configuration TOML.
    #[arg(default_value = "config/axis.toml")]
    config: PathBuf,

    /// Setpoint file (overrides `[setpoint] path`).
    #[arg(long, value_name = "PATH")]
    setpoint: Option<PathBuf>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args.config, args.setpoint.as_deref());
    let log_level = config
        .as_ref()
        .map_or(LogLevel::default(), |c| c.shared.log_level);
    setup_tracing(&args, log_level);

    info!("Rig Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = match config {
        Ok(config) => run(&config),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Rig Control Unit shutdown complete");
}

fn run(config: &AxisConfig) -> Result<(), Box<dyn std::error::Error>> {
    let _span = info_span!("axis", name = %config.shared.service_name).entered();

    let registry = DriverRegistry::with_builtin_drivers();
    let bundle = registry.open(config)?;
    let setpoint = FileSetpoint::new(&config.setpoint.path);
    info!("Polling setpoint file {}", setpoint.path().display());

    let mut control = ControlLoop::new(config, bundle, setpoint)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    control.run(&running)?;
    Ok(())
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
