//! Simulation driver module.
//!
//! This module provides a software simulation of one motor channel and its
//! encoder for development and testing without physical hardware.

mod driver;
mod encoder;
mod physics;
mod plant;
mod state;

pub use driver::SimulationDriver;
pub use encoder::SimulatedEncoder;
pub use physics::PhysicsThread;
pub use plant::PlantModel;
pub use state::SimHandle;

use rig_common::axis::AxisConfig;
use rig_common::driver::{DriverBundle, DriverError};
use std::time::Duration;

/// Build a simulated rig and its driver/encoder pair.
///
/// Returns the handle too, so callers can inject faults.
pub fn simulated_bundle(config: &AxisConfig, threaded: bool) -> (DriverBundle, SimHandle) {
    let sim = SimHandle::new(&config.simulation, config.driver.channel);
    let driver = if threaded {
        let period = Duration::from_millis(config.simulation.physics_period_ms.max(1));
        SimulationDriver::with_physics_thread(sim.clone(), period)
    } else {
        SimulationDriver::new(sim.clone())
    };
    let bundle = DriverBundle {
        driver: Box::new(driver),
        encoder: Box::new(SimulatedEncoder::new(sim.clone())),
    };
    (bundle, sim)
}

/// Factory function registered under `"simulation"`.
pub fn create_driver(config: &AxisConfig) -> Result<DriverBundle, DriverError> {
    if config.simulation.counts_per_unit == 0.0 {
        return Err(DriverError::Config(
            "simulation.counts_per_unit must be non-zero".to_string(),
        ));
    }
    Ok(simulated_bundle(config, true).0)
}
