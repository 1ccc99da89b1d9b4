//! Control unit error types.
//!
//! Every variant is fatal for the loop. The driver has already been reset and
//! commanded to zero by the time a [`SafetyFault`] is returned.

use rig_common::config::ConfigError;
use rig_common::driver::{DriverError, StatusFlags};
use thiserror::Error;

/// Condition detected by the safety monitor.
#[derive(Debug, Clone, Error)]
pub enum SafetyFault {
    /// A fault bit in the driver status register is set.
    #[error("Driver fault: {flags:?}")]
    DriverFault { flags: StatusFlags },

    /// Supply voltage below the configured minimum.
    #[error("Supply voltage too low: {measured_mv} mV < {min_mv} mV")]
    UnderVoltage { measured_mv: u32, min_mv: u32 },

    /// A status or voltage read kept failing.
    #[error("{what} read failed after {attempts} attempts: {source}")]
    BusExhausted {
        what: &'static str,
        attempts: u32,
        #[source]
        source: DriverError,
    },
}

/// Fatal control loop error.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Safety fault: {0}")]
    Fault(#[from] SafetyFault),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
