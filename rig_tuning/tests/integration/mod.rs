mod autotune;
mod frequency_response;

use rig_common::axis::AxisConfig;
use rig_hal::{SimHandle, simulated_bundle};
use rig_tuning::rig::{Clock, DriverRig};
use std::time::Duration;

/// Virtual clock that advances the simulated plant while "sleeping".
pub struct SimClock {
    sim: SimHandle,
}

impl Clock for SimClock {
    fn now(&self) -> Duration {
        self.sim.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        let slice = Duration::from_millis(1);
        let mut left = duration;
        while !left.is_zero() {
            let dt = left.min(slice);
            self.sim.step(dt);
            left -= dt;
        }
    }
}

/// Rig over a manually stepped simulation.
pub fn sim_rig(cfg: &AxisConfig) -> (DriverRig<SimClock>, SimHandle) {
    let (bundle, sim) = simulated_bundle(cfg, false);
    let clock = SimClock { sim: sim.clone() };
    let rig = DriverRig::open(cfg, bundle, clock).unwrap();
    (rig, sim)
}
