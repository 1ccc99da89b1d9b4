//! Simulated quadrature encoder.

use rig_common::axis::EncoderConfig;
use rig_common::driver::DriverError;
use rig_common::encoder::{EdgeCallback, EncoderRegistration, EncoderSource};
use std::sync::Arc;
use tracing::{debug, info};

use super::state::SimHandle;

/// Delivers the plant's count crossings as ±1 callbacks.
pub struct SimulatedEncoder {
    sim: SimHandle,
}

impl SimulatedEncoder {
    /// Encoder reading the plant behind `sim`.
    pub fn new(sim: SimHandle) -> Self {
        Self { sim }
    }
}

impl EncoderSource for SimulatedEncoder {
    fn register(
        &mut self,
        config: &EncoderConfig,
        callback: EdgeCallback,
    ) -> Result<Box<dyn EncoderRegistration>, DriverError> {
        let mut s = self.sim.inner.lock();
        if s.callback.is_some() {
            return Err(DriverError::InitFailed(format!(
                "encoder on pins {}/{} already registered",
                config.pin_a, config.pin_b
            )));
        }
        s.callback = Some(Arc::new(callback));
        info!(
            "Simulated encoder registered (A={}, B={}, glitch={}us)",
            config.pin_a, config.pin_b, config.glitch_filter_us
        );
        Ok(Box::new(SimulatedRegistration {
            sim: Some(self.sim.clone()),
        }))
    }
}

struct SimulatedRegistration {
    sim: Option<SimHandle>,
}

impl EncoderRegistration for SimulatedRegistration {
    fn cancel(&mut self) {
        if let Some(sim) = self.sim.take() {
            sim.inner.lock().callback = None;
            debug!("Simulated encoder cancelled");
        }
    }
}
