//! Ultimate gain / period search.
//!
//! Pure proportional control toward a fixed target with an increasing gain.
//! The first gain whose trial shows sustained oscillation (6 sign changes of
//! the error) is the ultimate gain `Ku`; the span of those crossings gives
//! the ultimate period `Pu`. Classic Ziegler–Nichols:
//!
//! ```text
//! Kp = 0.6·Ku     Ki = 2·Kp / Pu     Kd = Kp·Pu / 8
//! ```

use rig_common::axis::Direction;
use std::fmt;
use tracing::{debug, info};

use crate::config::AutotuneConfig;
use crate::error::TuneError;
use crate::rig::{TuningRig, hold};

/// Sign changes needed before a trial counts as oscillating.
pub const CROSSINGS_REQUIRED: usize = 6;

/// Full cycles bounded by the last [`CROSSINGS_REQUIRED`] crossings.
const CYCLES_SPANNED: f64 = (CROSSINGS_REQUIRED - 1) as f64 / 2.0;

/// Oscillation period from crossing timestamps [s], once enough exist.
pub fn estimate_period(crossings: &[f64]) -> Option<f64> {
    let n = crossings.len();
    if n < CROSSINGS_REQUIRED {
        return None;
    }
    Some((crossings[n - 1] - crossings[n - CROSSINGS_REQUIRED]) / CYCLES_SPANNED)
}

/// Ultimate point and the gains derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZieglerNichols {
    pub ku: f64,
    /// [s]
    pub pu: f64,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl ZieglerNichols {
    pub fn from_ultimate(ku: f64, pu: f64) -> Self {
        let kp = 0.6 * ku;
        Self {
            ku,
            pu,
            kp,
            ki: 2.0 * kp / pu,
            kd: kp * pu / 8.0,
        }
    }
}

impl fmt::Display for ZieglerNichols {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kp = {:.3}, Ki = {:.3}, Kd = {:.3}", self.kp, self.ki, self.kd)
    }
}

/// Gain sweep for one axis.
#[derive(Debug, Clone)]
pub struct RelayAutotuner {
    config: AutotuneConfig,
    direction: Direction,
}

impl RelayAutotuner {
    /// `direction` is the axis polarity; a reversed axis negates the command.
    pub fn new(config: AutotuneConfig, direction: Direction) -> Self {
        Self { config, direction }
    }

    pub fn config(&self) -> &AutotuneConfig {
        &self.config
    }

    /// Sweep gains until one oscillates.
    ///
    /// # Errors
    /// `OscillationNotFound` when `max_gain` passes without oscillation;
    /// driver errors and interruption end the sweep early.
    pub fn run<R: TuningRig + ?Sized>(&self, rig: &mut R) -> Result<ZieglerNichols, TuneError> {
        info!(
            "Starting autotune: target={} P={}..{} step {}",
            self.config.target, self.config.start_gain, self.config.max_gain, self.config.gain_step
        );
        let mut trial = 0u32;
        loop {
            let gain = self.config.start_gain + self.config.gain_step * trial as f64;
            if gain > self.config.max_gain {
                break;
            }
            info!("Testing P={gain:.2}");
            let period = self.trial(rig, gain)?;
            hold(
                rig,
                0,
                self.config.settle_pause(),
                self.config.sample_interval(),
            )?;

            if let Some(pu) = period {
                info!("Oscillation detected. Ku={gain:.2}, Pu={pu:.2}");
                return Ok(ZieglerNichols::from_ultimate(gain, pu));
            }
            trial += 1;
        }
        Err(TuneError::OscillationNotFound {
            max_gain: self.config.max_gain,
        })
    }

    /// One fixed-window proportional run; the period if it oscillated.
    pub fn trial<R: TuningRig + ?Sized>(
        &self,
        rig: &mut R,
        gain: f64,
    ) -> Result<Option<f64>, TuneError> {
        let target = self.config.target;
        let limit = self.config.command_limit;
        let interval = self.config.sample_interval();
        let window = self.config.window();
        let polarity = self.direction.sign();

        rig.zero();
        let start = rig.elapsed();
        let mut last_positive: Option<bool> = None;
        let mut crossings: Vec<f64> = Vec::new();

        loop {
            if rig.is_cancelled() {
                rig.command(0)?;
                return Err(TuneError::Interrupted);
            }
            let now = rig.elapsed().saturating_sub(start);
            if now >= window {
                return Ok(None);
            }

            let position = rig.position();
            let error = target - position;
            let speed = ((polarity * gain * error) as i32).clamp(-limit, limit);
            rig.command(speed)?;
            debug!("current position {position:.4}, target: {target}, speed: {speed}");

            let positive = error > 0.0;
            if last_positive.is_some_and(|prev| prev != positive) {
                crossings.push(now.as_secs_f64());
                if let Some(period) = estimate_period(&crossings) {
                    return Ok(Some(period));
                }
            }
            last_positive = Some(positive);
            rig.sleep(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use std::time::Duration;

    /// Error generator: oscillates with `period` around the target from
    /// trial `oscillating_from` on, otherwise creeps toward it.
    struct SyntheticLoop {
        now: Duration,
        origin: Duration,
        trials: u32,
        oscillating_from: u32,
        period: f64,
        target: f64,
        speeds: Vec<i32>,
    }

    impl SyntheticLoop {
        fn new(oscillating_from: u32, period: f64) -> Self {
            Self {
                now: Duration::ZERO,
                origin: Duration::ZERO,
                trials: 0,
                oscillating_from,
                period,
                target: AutotuneConfig::default().target,
                speeds: Vec::new(),
            }
        }
    }

    impl TuningRig for SyntheticLoop {
        fn position(&self) -> f64 {
            let t = (self.now - self.origin).as_secs_f64();
            if self.trials >= self.oscillating_from {
                self.target - 5.0 * (2.0 * PI * t / self.period + 0.3).cos()
            } else {
                self.target * (1.0 - (-t).exp()) * 0.9
            }
        }
        fn counts(&self) -> i64 {
            (self.position() * 100.0) as i64
        }
        fn command(&mut self, speed: i32) -> Result<(), TuneError> {
            self.speeds.push(speed);
            Ok(())
        }
        fn elapsed(&self) -> Duration {
            self.now
        }
        fn sleep(&mut self, d: Duration) {
            self.now += d;
        }
        fn zero(&mut self) {
            self.trials += 1;
            self.origin = self.now;
        }
    }

    fn fast_config() -> AutotuneConfig {
        AutotuneConfig {
            settle_pause_ms: 100,
            ..Default::default()
        }
    }

    #[test]
    fn period_needs_six_crossings() {
        assert_eq!(estimate_period(&[0.0, 0.5, 1.0, 1.5, 2.0]), None);
        let p = estimate_period(&[0.1, 0.6, 1.1, 1.6, 2.1, 2.6]).unwrap();
        assert!((p - 1.0).abs() < 1e-12);
    }

    #[test]
    fn period_uses_latest_crossings() {
        let p = estimate_period(&[0.0, 9.0, 10.0, 10.2, 10.4, 10.6, 10.8, 11.0]).unwrap();
        assert!((p - 0.4).abs() < 1e-12);
    }

    #[test]
    fn ziegler_nichols_gains() {
        let zn = ZieglerNichols::from_ultimate(500.0, 0.8);
        assert!((zn.kp - 300.0).abs() < 1e-12);
        assert!((zn.ki - 750.0).abs() < 1e-9);
        assert!((zn.kd - 30.0).abs() < 1e-12);
        assert_eq!(zn.to_string(), "Kp = 300.000, Ki = 750.000, Kd = 30.000");
    }

    #[test]
    fn recovers_ultimate_gain_and_period() {
        for &period in &[0.4, 1.0, 2.7] {
            // Trials 1..=3 are P=200,300,400; trial 4 is P=500.
            let mut rig = SyntheticLoop::new(4, period);
            let tuner = RelayAutotuner::new(fast_config(), Direction::Reversed);
            let zn = tuner.run(&mut rig).unwrap();
            assert_eq!(zn.ku, 500.0);
            assert!((zn.pu - period).abs() < 0.01, "Pu {} vs {period}", zn.pu);
            assert_eq!(rig.trials, 4);
        }
    }

    #[test]
    fn oscillation_not_found_reports_max_gain() {
        let mut rig = SyntheticLoop::new(u32::MAX, 1.0);
        let tuner = RelayAutotuner::new(fast_config(), Direction::Normal);
        let err = tuner.run(&mut rig).unwrap_err();
        assert!(matches!(err, TuneError::OscillationNotFound { max_gain } if max_gain == 1000.0));
        // P = 200, 300, ..., 1000
        assert_eq!(rig.trials, 9);
        assert_eq!(rig.speeds.last(), Some(&0));
    }

    #[test]
    fn command_follows_polarity_and_clamp() {
        let mut rig = SyntheticLoop::new(u32::MAX, 1.0);
        let mut cfg = fast_config();
        cfg.window_s = 0.005;
        let tuner = RelayAutotuner::new(cfg, Direction::Reversed);
        assert_eq!(tuner.trial(&mut rig, 200.0).unwrap(), None);
        // error 50 → -10000, clamped.
        assert_eq!(rig.speeds, vec![-800]);

        let mut rig = SyntheticLoop::new(u32::MAX, 1.0);
        let tuner = RelayAutotuner::new(cfg, Direction::Normal);
        tuner.trial(&mut rig, 2.5).unwrap();
        assert_eq!(rig.speeds, vec![125]);
    }
}
