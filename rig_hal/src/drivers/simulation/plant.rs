//! DC motor plant physics.
//!
//! First-order velocity response to the applied command, integrated into a
//! continuous encoder position. Whole-count crossings become quadrature
//! edges.
//!
//! ```text
//! u_eff = 0            if |u| <= stiction
//!       = s·u          otherwise (s = ±1 wiring)
//! dv/dt = (k·u_eff − v) / tau
//! x    += v·dt                      [counts]
//! ```

use rig_common::axis::SimulationConfig;

/// Motor + encoder model for one axis.
#[derive(Debug, Clone)]
pub struct PlantModel {
    counts_per_unit: f64,
    polarity: f64,
    time_constant_s: f64,
    stiction: f64,
    /// Velocity [counts/s].
    velocity: f64,
    /// Continuous position [counts].
    position: f64,
    /// Last position reported as edges [counts].
    emitted: i64,
}

impl PlantModel {
    /// Create a plant at rest at count 0.
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            counts_per_unit: config.counts_per_unit,
            polarity: config.direction.sign(),
            time_constant_s: config.time_constant_s,
            stiction: config.stiction,
            velocity: 0.0,
            position: 0.0,
            emitted: 0,
        }
    }

    /// Advance by `dt` seconds under `command`; returns the signed number of
    /// whole counts crossed.
    pub fn step(&mut self, command: f64, dt: f64) -> i64 {
        if dt <= 0.0 {
            return 0;
        }
        let drive = if command.abs() <= self.stiction {
            0.0
        } else {
            self.polarity * command
        };
        let target_velocity = self.counts_per_unit * drive;

        if self.time_constant_s > 0.0 {
            // Exact discretization: stable for any dt.
            let decay = (-dt / self.time_constant_s).exp();
            let v0 = self.velocity;
            let v1 = target_velocity + (v0 - target_velocity) * decay;
            // Position advances by the integral of v over the step.
            self.position += target_velocity * dt
                + (v0 - target_velocity) * self.time_constant_s * (1.0 - decay);
            self.velocity = v1;
        } else {
            self.velocity = target_velocity;
            self.position += target_velocity * dt;
        }

        let now = self.position.floor() as i64;
        let crossed = now - self.emitted;
        self.emitted = now;
        crossed
    }

    /// Velocity [counts/s].
    #[inline]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Continuous position [counts].
    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }
}
