//! Filtered PID with conditional-integration anti-windup.
//!
//! The derivative is exponentially smoothed; the integral only accumulates
//! while the output is unsaturated or the update pulls the accumulator back
//! toward zero. Output is clamped to bounds that the command shaper may
//! narrow on every tick.

use rig_common::axis::PidConfig;
use rig_common::consts::PID_DEFAULT_DT;
use std::time::Instant;
use tracing::trace;

/// Internal state of the PID controller.
///
/// Must be reset via [`PidState::reset`] whenever a setpoint is retired.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidState {
    /// Integral accumulator, always within ±integral_limit.
    integral: f64,
    /// Previous error (for derivative).
    last_error: f64,
    /// Smoothed derivative.
    filtered_derivative: f64,
}

impl PidState {
    /// Reset all internal state to zero.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Current accumulator value.
    #[inline]
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Current smoothed derivative.
    #[inline]
    pub fn filtered_derivative(&self) -> f64 {
        self.filtered_derivative
    }
}

/// Gains with the axis polarity already applied.
#[derive(Debug, Clone, Copy)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Weight of the newest raw derivative (0, 1].
    pub alpha: f64,
    /// Accumulator clamp (±).
    pub integral_limit: f64,
    /// Friction offset for positive error.
    pub feedforward: f64,
    /// Scale on the feedforward for negative error.
    pub feedforward_negative_scale: f64,
    pub out_min: f64,
    pub out_max: f64,
}

impl PidGains {
    /// Build from config; a reversed axis negates every gain.
    pub fn from_config(cfg: &PidConfig) -> Self {
        let s = cfg.direction.sign();
        Self {
            kp: s * cfg.kp,
            ki: s * cfg.ki,
            kd: s * cfg.kd,
            alpha: cfg.derivative_alpha,
            integral_limit: cfg.integral_limit,
            feedforward: s * cfg.feedforward,
            feedforward_negative_scale: cfg.feedforward_negative_scale,
            out_min: cfg.output_min,
            out_max: cfg.output_max,
        }
    }

    /// Discontinuous friction offset; zero at zero error.
    #[inline]
    pub fn feedforward_term(&self, error: f64) -> f64 {
        if error > 0.0 {
            self.feedforward
        } else if error < 0.0 {
            -self.feedforward * self.feedforward_negative_scale
        } else {
            0.0
        }
    }
}

/// Compute one PID tick.
///
/// # Arguments
/// - `state`: Mutable PID internal state.
/// - `gains`: Gains and bounds for this tick.
/// - `error`: setpoint − measurement [units].
/// - `dt`: Time since the previous tick [s]; `dt <= 0` disables the derivative.
///
/// # Returns
/// Output clamped to `[out_min, out_max]`.
pub fn pid_compute(state: &mut PidState, gains: &PidGains, error: f64, dt: f64) -> f64 {
    // ── D term (exponential smoothing) ──────────────────────
    let raw_derivative = if dt > 0.0 {
        (error - state.last_error) / dt
    } else {
        0.0
    };
    state.filtered_derivative =
        gains.alpha * raw_derivative + (1.0 - gains.alpha) * state.filtered_derivative;

    let p_term = gains.kp * error;
    let d_term = gains.kd * state.filtered_derivative;
    let ff_term = gains.feedforward_term(error);
    let pre_output = p_term + d_term + ff_term;

    // ── I term (conditional integration) ────────────────────
    let dt_i = dt.max(0.0);
    let candidate = state.integral + error * dt_i;
    let unsaturated = pre_output > gains.out_min && pre_output < gains.out_max;
    if unsaturated || candidate * error < 0.0 {
        state.integral = candidate;
    }
    state.integral = state
        .integral
        .clamp(-gains.integral_limit, gains.integral_limit);
    let i_term = gains.ki * state.integral;

    state.last_error = error;

    let output = (pre_output + i_term).clamp(gains.out_min, gains.out_max);
    trace!(
        "pid e={error:.4} dt={dt:.4} P={p_term:.2} I={i_term:.2} D={d_term:.2} FF={ff_term:.2} out={output:.2}"
    );
    output
}

/// PID bound to a setpoint and a wall clock.
#[derive(Debug, Clone)]
pub struct FilteredPid {
    gains: PidGains,
    /// Configured bounds; per-tick bounds never exceed these.
    limits: (f64, f64),
    state: PidState,
    setpoint: f64,
    last_time: Option<Instant>,
}

impl FilteredPid {
    pub fn new(cfg: &PidConfig) -> Self {
        let gains = PidGains::from_config(cfg);
        Self {
            limits: (gains.out_min, gains.out_max),
            gains,
            state: PidState::default(),
            setpoint: 0.0,
            last_time: None,
        }
    }

    /// Compute the output for `measurement` taken at `now`.
    ///
    /// dt is the wall-clock delta to the previous call, or 0.01 s on the first
    /// call after construction or [`Self::reset`].
    pub fn compute(&mut self, measurement: f64, now: Instant) -> f64 {
        let dt = match self.last_time {
            Some(prev) => now.saturating_duration_since(prev).as_secs_f64(),
            None => PID_DEFAULT_DT,
        };
        self.last_time = Some(now);
        pid_compute(&mut self.state, &self.gains, self.setpoint - measurement, dt)
    }

    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// Bounds for the next tick, clamped into the configured limits.
    pub fn set_output_bounds(&mut self, min: f64, max: f64) {
        let (lo, hi) = self.limits;
        self.gains.out_min = min.clamp(lo, hi);
        self.gains.out_max = max.clamp(lo, hi);
    }

    /// Configured `(min, max)` output limits.
    pub fn limits(&self) -> (f64, f64) {
        self.limits
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    pub fn state(&self) -> &PidState {
        &self.state
    }

    /// Neutral state and configured bounds; the setpoint is kept.
    pub fn reset(&mut self) {
        self.state.reset();
        self.last_time = None;
        let (lo, hi) = self.limits;
        self.gains.out_min = lo;
        self.gains.out_max = hi;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
