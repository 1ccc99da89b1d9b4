//! Command shaping between the PID output and the driver.
//!
//! Narrows the PID bounds inside the deceleration zone, then converts the
//! float output to the driver's integer speed with a deadband.

use rig_common::axis::ShapingConfig;

/// Deceleration-zone bounds and deadband for one axis.
#[derive(Debug, Clone, Copy)]
pub struct CommandShaper {
    zone: f64,
    floor: f64,
    deadband: i32,
}

impl CommandShaper {
    pub fn new(cfg: &ShapingConfig) -> Self {
        Self {
            zone: cfg.decel_zone,
            floor: cfg.decel_floor.abs(),
            deadband: cfg.deadband,
        }
    }

    /// Output bounds for this tick given the configured `limits`.
    ///
    /// Inside the zone each side is scaled by `|error| / zone`, never below
    /// the floor nor beyond its configured limit.
    pub fn bounds(&self, error: f64, limits: (f64, f64)) -> (f64, f64) {
        let (lo, hi) = limits;
        if self.zone <= 0.0 || error.abs() >= self.zone {
            return limits;
        }
        let ratio = error.abs() / self.zone;
        (self.scale(lo, ratio), self.scale(hi, ratio))
    }

    fn scale(&self, limit: f64, ratio: f64) -> f64 {
        let mag = limit.abs();
        let scaled = (mag * ratio).clamp(self.floor.min(mag), mag);
        scaled.copysign(limit)
    }

    /// Truncate to an integer speed; anything under the deadband is 0.
    #[inline]
    pub fn to_speed(&self, output: f64) -> i32 {
        let speed = output as i32;
        if speed.abs() < self.deadband { 0 } else { speed }
    }
}
