//! Driver fault and supply-voltage monitor.
//!
//! Any fault bit, an under-voltage reading or an exhausted read sends the
//! driver to speed 0 and a hard reset before the fault is returned.

use rig_common::axis::{AxisConfig, SafetyConfig};
use rig_common::driver::MotorDriver;
use tracing::{debug, error, warn};

use super::retry::RetryPolicy;
use crate::error::SafetyFault;

/// Checks one driver channel.
#[derive(Debug, Clone)]
pub struct MotorSafetyMonitor {
    channel: u8,
    enabled: bool,
    min_supply_mv: u32,
    retry: RetryPolicy,
}

impl MotorSafetyMonitor {
    pub fn new(channel: u8, cfg: &SafetyConfig) -> Self {
        Self {
            channel,
            enabled: cfg.enabled,
            min_supply_mv: cfg.min_supply_mv,
            retry: RetryPolicy::from_config(cfg),
        }
    }

    pub fn from_axis(cfg: &AxisConfig) -> Self {
        Self::new(cfg.driver.channel, &cfg.safety)
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Read status and supply voltage; abort the driver on any fault.
    ///
    /// A disabled monitor always passes.
    pub fn check(&self, driver: &mut dyn MotorDriver) -> Result<(), SafetyFault> {
        if !self.enabled {
            return Ok(());
        }
        let result = self.inspect(driver);
        if let Err(ref fault) = result {
            error!("Safety fault: {fault}");
            self.abort(driver);
        }
        result
    }

    fn inspect(&self, driver: &mut dyn MotorDriver) -> Result<(), SafetyFault> {
        let flags = self.retry.run("status", || driver.status_flags())?;
        if flags.has_fault() {
            return Err(SafetyFault::DriverFault {
                flags: flags.faults(),
            });
        }

        let measured_mv = self.retry.run("voltage", || driver.supply_voltage_mv())?;
        if measured_mv < self.min_supply_mv {
            return Err(SafetyFault::UnderVoltage {
                measured_mv,
                min_mv: self.min_supply_mv,
            });
        }
        debug!("Safety OK: flags={flags:?} vin={measured_mv}mV");
        Ok(())
    }

    /// Command zero and hard-reset the driver. Best effort.
    pub fn abort(&self, driver: &mut dyn MotorDriver) {
        if let Err(e) = driver.set_speed(self.channel, 0) {
            warn!("Failed to zero channel {} during abort: {e}", self.channel);
        }
        if let Err(e) = driver.reset() {
            warn!("Driver reset failed during abort: {e}");
        }
    }
}
