//! # Rig FRF
//!
//! Open-loop sine sweep of one axis. Writes the gain/phase table once the
//! whole sweep has completed; an interrupted sweep writes nothing.

use clap::Parser;
use rig_common::config::LogLevel;
use rig_hal::DriverRegistry;
use rig_tuning::TuneError;
use rig_tuning::config::{TuningConfig, load_tuning_config};
use rig_tuning::frf::FrequencyResponseAnalyzer;
use rig_tuning::rig::{DriverRig, WallClock};
use rig_tuning::table::save_table;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, error, info, info_span};
use tracing_subscriber::EnvFilter;

/// Rig FRF — sine-sweep frequency response
#[derive(Parser, Debug)]
#[command(name = "rig_frf")]
#[command(version)]
#[command(about = "Open-loop frequency response of a motor axis")]
struct Args {
    /// Path to the axis configuration TOML.
    #[arg(default_value = "config/axis.toml")]
    config: PathBuf,

    /// Result table (overrides `[frequency_response] output`).
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Sine amplitude (overrides `[frequency_response] amplitude`).
    #[arg(long)]
    amplitude: Option<f64>,

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

    info!("Rig FRF v{} starting...", env!("CARGO_PKG_VERSION"));

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
    if let Some(a) = args.amplitude {
        config.frequency_response.amplitude = a;
    }
    config.frequency_response.validate()?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.frequency_response.output));
    config
        .frequency_response
        .apply_ramp_limit(&mut config.axis.driver);
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

    let analyzer = FrequencyResponseAnalyzer::new(config.frequency_response);
    let result = analyzer.sweep(&mut rig);
    rig.shutdown();

    match result {
        Ok(points) => {
            save_table(&output, &points)?;
            info!("Test complete");
            Ok(())
        }
        Err(TuneError::Interrupted) => {
            info!("Sweep interrupted; no table written");
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
