//! Tuning configuration.
//!
//! The tools read the same axis TOML as the control unit; the
//! `[autotune]` and `[frequency_response]` sections are ignored by the
//! control unit and default when absent.

use rig_common::axis::{AxisConfig, DriverConfig};
use rig_common::config::{ConfigError, ConfigLoader};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Axis config plus both tool sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningConfig {
    #[serde(flatten)]
    pub axis: AxisConfig,
    #[serde(default)]
    pub autotune: AutotuneConfig,
    #[serde(default)]
    pub frequency_response: FrequencyResponseConfig,
}

impl TuningConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.axis.validate()?;
        self.autotune.validate()?;
        self.frequency_response.validate()
    }
}

/// Load and validate `path`.
pub fn load_tuning_config(path: &Path) -> Result<TuningConfig, ConfigError> {
    let config = TuningConfig::load(path)?;
    config.validate()?;
    info!(
        "Config '{}' loaded: driver={} channel={}",
        config.axis.shared.service_name, config.axis.driver.name, config.axis.driver.channel
    );
    Ok(config)
}

fn invalid(msg: String) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError(msg))
}

// ─── Autotune ───────────────────────────────────────────────────────

/// `[autotune]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AutotuneConfig {
    /// Fixed target for every trial [physical units].
    pub target: f64,
    /// First proportional gain tried.
    pub start_gain: f64,
    /// Gain increase after a trial without oscillation.
    pub gain_step: f64,
    /// Last gain tried.
    pub max_gain: f64,
    /// Trial length [s].
    pub window_s: f64,
    pub sample_interval_ms: u64,
    /// Zero-speed hold between trials [ms].
    pub settle_pause_ms: u64,
    /// Proportional command clamp (±).
    pub command_limit: i32,
}

impl Default for AutotuneConfig {
    fn default() -> Self {
        Self {
            target: 50.0,
            start_gain: 200.0,
            gain_step: 100.0,
            max_gain: 1000.0,
            window_s: 15.0,
            sample_interval_ms: 10,
            settle_pause_ms: 2000,
            command_limit: 800,
        }
    }
}

impl AutotuneConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.start_gain > 0.0) {
            return invalid(format!("autotune.start_gain {} must be > 0", self.start_gain));
        }
        if !(self.gain_step > 0.0) {
            return invalid(format!("autotune.gain_step {} must be > 0", self.gain_step));
        }
        if self.max_gain < self.start_gain {
            return invalid(format!(
                "autotune.max_gain {} below start_gain {}",
                self.max_gain, self.start_gain
            ));
        }
        if !(self.window_s > 0.0) {
            return invalid(format!("autotune.window_s {} must be > 0", self.window_s));
        }
        if self.sample_interval_ms == 0 {
            return invalid("autotune.sample_interval_ms must be >= 1".to_string());
        }
        if self.command_limit <= 0 {
            return invalid(format!(
                "autotune.command_limit {} must be > 0",
                self.command_limit
            ));
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs_f64(self.window_s)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn settle_pause(&self) -> Duration {
        Duration::from_millis(self.settle_pause_ms)
    }
}

// ─── Frequency Response ─────────────────────────────────────────────

/// `[frequency_response]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyResponseConfig {
    /// log10 of the lowest frequency [Hz].
    pub start_exponent: f64,
    /// log10 of the highest frequency [Hz].
    pub stop_exponent: f64,
    /// Number of log-spaced frequencies.
    pub points: usize,
    /// Sine command amplitude [speed units].
    pub amplitude: f64,
    pub warmup_cycles: f64,
    pub record_cycles: f64,
    pub sample_interval_ms: u64,
    /// Zero-speed hold after each frequency [ms].
    pub pause_ms: u64,
    /// Driver accel/decel limit during the sweep.
    pub ramp_limit: u16,
    /// Result table path.
    pub output: String,
}

impl Default for FrequencyResponseConfig {
    fn default() -> Self {
        Self {
            start_exponent: -1.0,
            stop_exponent: 1.3,
            points: 15,
            amplitude: 800.0,
            warmup_cycles: 2.0,
            record_cycles: 4.0,
            sample_interval_ms: 10,
            pause_ms: 1000,
            ramp_limit: 32767,
            output: "frequency_response_gain_phase.csv".to_string(),
        }
    }
}

impl FrequencyResponseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.points == 0 {
            return invalid("frequency_response.points must be >= 1".to_string());
        }
        if !(self.stop_exponent >= self.start_exponent) {
            return invalid(format!(
                "frequency_response.stop_exponent {} below start_exponent {}",
                self.stop_exponent, self.start_exponent
            ));
        }
        if !(self.amplitude > 0.0) {
            return invalid(format!(
                "frequency_response.amplitude {} must be > 0",
                self.amplitude
            ));
        }
        if self.warmup_cycles < 0.0 || !(self.record_cycles > 0.0) {
            return invalid(format!(
                "frequency_response cycles invalid: warmup {} record {}",
                self.warmup_cycles, self.record_cycles
            ));
        }
        if self.sample_interval_ms == 0 {
            return invalid("frequency_response.sample_interval_ms must be >= 1".to_string());
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    /// Swept frequencies [Hz].
    pub fn frequencies(&self) -> Vec<f64> {
        log_space(self.start_exponent, self.stop_exponent, self.points)
    }

    /// Open up the driver ramp so the sine reaches the motor unfiltered.
    pub fn apply_ramp_limit(&self, driver: &mut DriverConfig) {
        driver.max_acceleration = self.ramp_limit;
        driver.max_deceleration = self.ramp_limit;
    }
}

/// `n` values evenly spaced on a log10 scale from `10^start` to `10^stop`.
pub fn log_space(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![10f64.powf(start)],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| 10f64.powf(start + step * i as f64))
                .collect()
        }
    }
}
