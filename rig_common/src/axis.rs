//! Per-axis configuration.
//!
//! One TOML file describes one actuator: driver channel and limits, encoder
//! input, PID gains, command shaping, settle criteria, setpoint source, loop
//! period, safety thresholds, and the simulation plant used when no hardware
//! backend is selected. Every section except `[shared]` falls back to the
//! defaults in [`crate::consts`].

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig};
use crate::consts::*;
use crate::driver::ErrorResponse;

// ─── Top-Level ──────────────────────────────────────────────────────

/// Complete configuration for one axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Service identity and log level.
    pub shared: SharedConfig,
    /// Motor driver backend and limits.
    #[serde(default)]
    pub driver: DriverConfig,
    /// Quadrature input.
    #[serde(default)]
    pub encoder: EncoderConfig,
    /// Controller gains and bounds.
    #[serde(default)]
    pub pid: PidConfig,
    /// Deceleration zone and deadband.
    #[serde(default)]
    pub shaping: ShapingConfig,
    /// Target-reached criteria.
    #[serde(default)]
    pub settle: SettleConfig,
    /// External target input.
    #[serde(default)]
    pub setpoint: SetpointConfig,
    /// Loop pacing.
    #[serde(default)]
    pub cycle: CycleConfig,
    /// Fault monitoring.
    #[serde(default)]
    pub safety: SafetyConfig,
    /// Plant model for the simulation backend.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl AxisConfig {
    /// Minimal config with defaults for every section.
    pub fn with_service_name(name: &str) -> Self {
        Self {
            shared: SharedConfig {
                log_level: Default::default(),
                service_name: name.to_string(),
            },
            driver: DriverConfig::default(),
            encoder: EncoderConfig::default(),
            pid: PidConfig::default(),
            shaping: ShapingConfig::default(),
            settle: SettleConfig::default(),
            setpoint: SetpointConfig::default(),
            cycle: CycleConfig::default(),
            safety: SafetyConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }

    /// Validate parameter bounds across all sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        let fail = |msg: String| Err(ConfigError::ValidationError(msg));

        let ch = self.driver.channel;
        if !(CHANNEL_MIN..=CHANNEL_MAX).contains(&ch) {
            return fail(format!(
                "driver.channel {ch} out of range [{CHANNEL_MIN}, {CHANNEL_MAX}]"
            ));
        }
        let gain = self.encoder.gain;
        if !gain.is_finite() || gain == 0.0 {
            return fail(format!("encoder.gain {gain} must be finite and non-zero"));
        }
        if self.pid.output_min >= self.pid.output_max {
            return fail(format!(
                "pid.output_min {} must be below pid.output_max {}",
                self.pid.output_min, self.pid.output_max
            ));
        }
        if self.pid.integral_limit < 0.0 {
            return fail(format!(
                "pid.integral_limit {} must be >= 0",
                self.pid.integral_limit
            ));
        }
        let alpha = self.pid.derivative_alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return fail(format!("pid.derivative_alpha {alpha} out of range (0, 1]"));
        }
        if self.settle.threshold == 0 {
            return fail("settle.threshold must be >= 1".to_string());
        }
        if self.settle.epsilon <= 0.0 {
            return fail(format!("settle.epsilon {} must be > 0", self.settle.epsilon));
        }
        let ct = self.cycle.cycle_time_ms;
        if !(CYCLE_TIME_MS_MIN..=CYCLE_TIME_MS_MAX).contains(&ct) {
            return fail(format!(
                "cycle.cycle_time_ms {ct} out of range [{CYCLE_TIME_MS_MIN}, {CYCLE_TIME_MS_MAX}]"
            ));
        }
        if self.safety.retry_attempts == 0 {
            return fail("safety.retry_attempts must be >= 1".to_string());
        }
        if self.shaping.deadband < 0 {
            return fail(format!("shaping.deadband {} must be >= 0", self.shaping.deadband));
        }
        Ok(())
    }
}

// ─── Sections ───────────────────────────────────────────────────────

/// `[driver]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Registry key of the backend.
    pub name: String,
    /// Motor channel on the driver.
    pub channel: u8,
    /// Driver-side command timeout [ms].
    pub command_timeout_ms: u32,
    /// Max speed increase per 10 ms.
    pub max_acceleration: u16,
    /// Max speed decrease per 10 ms.
    pub max_deceleration: u16,
    /// Reaction to driver errors.
    pub error_response: ErrorResponse,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            name: "simulation".to_string(),
            channel: CHANNEL_MIN,
            command_timeout_ms: COMMAND_TIMEOUT_MS_DEFAULT,
            max_acceleration: MAX_ACCELERATION_DEFAULT,
            max_deceleration: MAX_DECELERATION_DEFAULT,
            error_response: ErrorResponse::Coast,
        }
    }
}

/// `[encoder]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Physical units per count.
    pub gain: f64,
    /// Input line A.
    pub pin_a: u8,
    /// Input line B.
    pub pin_b: u8,
    /// Edges shorter than this are ignored [µs].
    pub glitch_filter_us: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            gain: ENCODER_GAIN_DEFAULT,
            pin_a: ENCODER_PIN_A_DEFAULT,
            pin_b: ENCODER_PIN_B_DEFAULT,
            glitch_filter_us: GLITCH_FILTER_US_DEFAULT,
        }
    }
}

/// Motor polarity relative to the encoder count direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Positive command increases the count.
    #[default]
    Normal,
    /// Positive command decreases the count; every gain is negated.
    Reversed,
}

impl Direction {
    /// `1.0` or `-1.0`.
    #[inline]
    pub const fn sign(&self) -> f64 {
        match self {
            Self::Normal => 1.0,
            Self::Reversed => -1.0,
        }
    }
}

/// `[pid]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Weight of the newest raw derivative in the smoothed estimate.
    pub derivative_alpha: f64,
    /// Accumulator clamp (±).
    pub integral_limit: f64,
    pub output_min: f64,
    pub output_max: f64,
    /// Static friction offset applied as `feedforward·sign(error)`.
    pub feedforward: f64,
    /// Extra scale on the feedforward for negative error.
    pub feedforward_negative_scale: f64,
    pub direction: Direction,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 1000.0,
            ki: 400.0,
            kd: 100.0,
            derivative_alpha: DERIVATIVE_ALPHA_DEFAULT,
            integral_limit: 10.0,
            output_min: -(SPEED_LIMIT as f64),
            output_max: SPEED_LIMIT as f64,
            feedforward: 0.0,
            feedforward_negative_scale: 1.0,
            direction: Direction::Reversed,
        }
    }
}

/// `[shaping]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapingConfig {
    /// |error| below which the bounds shrink [physical units]. 0 disables.
    pub decel_zone: f64,
    /// Smallest bound magnitude inside the zone.
    pub decel_floor: f64,
    /// |command| below this is sent as 0.
    pub deadband: i32,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            decel_zone: 30.0,
            decel_floor: SPEED_LIMIT as f64,
            deadband: DEADBAND_DEFAULT,
        }
    }
}

/// `[settle]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleConfig {
    /// In-position tolerance [physical units].
    pub epsilon: f64,
    /// Consecutive in-tolerance samples.
    pub threshold: u32,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            epsilon: SETTLE_EPSILON_DEFAULT,
            threshold: SETTLE_THRESHOLD_DEFAULT,
        }
    }
}

/// `[setpoint]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetpointConfig {
    /// File holding a single float; `0` = no target.
    pub path: String,
}

impl Default for SetpointConfig {
    fn default() -> Self {
        Self {
            path: SETPOINT_PATH_DEFAULT.to_string(),
        }
    }
}

/// `[cycle]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    pub cycle_time_ms: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cycle_time_ms: CYCLE_TIME_MS_DEFAULT,
        }
    }
}

/// `[safety]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Run the fault check every tick.
    pub enabled: bool,
    /// Supply below this is fatal [mV].
    pub min_supply_mv: u32,
    /// Attempts per status/voltage read.
    pub retry_attempts: u32,
    /// Delay between attempts [ms].
    pub retry_backoff_ms: u64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_supply_mv: MIN_SUPPLY_MV_DEFAULT,
            retry_attempts: RETRY_ATTEMPTS_DEFAULT,
            retry_backoff_ms: RETRY_BACKOFF_MS_DEFAULT,
        }
    }
}

/// `[simulation]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Steady-state counts per second per unit of command.
    pub counts_per_unit: f64,
    /// Motor wiring relative to the encoder count direction.
    pub direction: Direction,
    /// First-order velocity time constant [s].
    pub time_constant_s: f64,
    /// Reported supply voltage [mV].
    pub supply_mv: u32,
    /// Commands with |value| at or below this produce no motion.
    pub stiction: f64,
    /// Physics thread period [ms].
    pub physics_period_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            counts_per_unit: 1.5,
            direction: Direction::Reversed,
            time_constant_s: 0.05,
            supply_mv: 12_000,
            stiction: 0.0,
            physics_period_ms: 1,
        }
    }
}
