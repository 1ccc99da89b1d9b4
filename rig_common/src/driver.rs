//! Motor driver capability trait and error types.
//!
//! This module defines:
//! - `MotorDriver` trait - Interface to the motor-driver chip
//! - `StatusFlags` - Driver status bitmask
//! - `DriverError` enum - Error types for driver operations
//! - `DriverBundle` / `DriverFactory` - What a registered backend produces
//! - `configure_driver` - The startup command sequence

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::axis::{AxisConfig, DriverConfig};
use crate::encoder::EncoderSource;

/// Error types for driver operations.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Bus transfer failed (I2C NACK, short read, ...)
    #[error("Bus communication error: {0}")]
    Communication(String),

    /// Response failed its CRC check
    #[error("CRC mismatch on {0}")]
    Crc(&'static str),

    /// Channel outside the driver's range
    #[error("Invalid motor channel {0}")]
    InvalidChannel(u8),

    /// No backend registered under this name
    #[error("Driver not found: {0}")]
    NotFound(String),

    /// Backend-specific configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DriverError {
    /// Whether the failure may clear on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Communication(_) | Self::Crc(_))
    }
}

bitflags! {
    /// Driver status bitmask (bit positions follow the driver's status register).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StatusFlags: u16 {
        /// Malformed command received.
        const PROTOCOL_ERROR          = 1 << 0;
        /// Command failed its CRC check.
        const CRC_ERROR               = 1 << 1;
        /// Command timeout occurred since last clear.
        const COMMAND_TIMEOUT_LATCHED = 1 << 2;
        /// Motor fault occurred since last clear.
        const MOTOR_FAULT_LATCHED     = 1 << 3;
        /// Motor power lost since last clear.
        const NO_POWER_LATCHED        = 1 << 4;
        /// Serial framing error.
        const UART_ERROR              = 1 << 5;
        /// Driver reset since the flag was last cleared.
        const RESET                   = 1 << 9;
        /// No command received within the command timeout.
        const COMMAND_TIMEOUT         = 1 << 10;
        /// A motor is currently faulting.
        const MOTOR_FAULTING          = 1 << 11;
        /// Motor power currently absent.
        const NO_POWER                = 1 << 12;
        /// An error is currently stopping the motors.
        const ERROR_ACTIVE            = 1 << 13;
        /// Motor outputs are enabled.
        const MOTOR_OUTPUT_ENABLED    = 1 << 14;
        /// A motor is being driven.
        const MOTOR_DRIVING           = 1 << 15;
    }
}

impl StatusFlags {
    /// Flags the control loop treats as fatal.
    pub const FAULT_MASK: Self = Self::from_bits_truncate(
        Self::PROTOCOL_ERROR.bits()
            | Self::CRC_ERROR.bits()
            | Self::COMMAND_TIMEOUT_LATCHED.bits()
            | Self::MOTOR_FAULT_LATCHED.bits()
            | Self::NO_POWER_LATCHED.bits()
            | Self::RESET.bits()
            | Self::COMMAND_TIMEOUT.bits(),
    );

    /// Returns the fatal subset of these flags.
    #[inline]
    pub const fn faults(&self) -> Self {
        self.intersection(Self::FAULT_MASK)
    }

    /// Returns true if any fatal flag is set.
    #[inline]
    pub const fn has_fault(&self) -> bool {
        self.intersects(Self::FAULT_MASK)
    }
}

/// How the driver reacts to an active error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorResponse {
    /// Decelerate to a stop, then coast.
    #[default]
    Coast,
    /// Decelerate to a stop, then brake.
    Brake,
    /// Coast immediately.
    CoastNow,
    /// Brake immediately.
    BrakeNow,
}

/// Interface to the motor-driver chip.
///
/// The command protocol itself is implemented by the backend; the control
/// unit and the tuning tools only see this trait.
///
/// # Lifecycle
///
/// 1. [`configure_driver`] - once, before the first tick
/// 2. `set_speed()` / `status_flags()` / `supply_voltage_mv()` - every tick
/// 3. `shutdown()` - once, on every exit path
pub trait MotorDriver: Send {
    /// Returns the backend's identifier (e.g. "simulation").
    fn name(&self) -> &'static str;

    /// Restore default settings and clear latched state.
    fn reinitialize(&mut self) -> Result<(), DriverError>;

    /// Set signed speed on one channel.
    fn set_speed(&mut self, channel: u8, speed: i32) -> Result<(), DriverError>;

    /// Read the status register.
    fn status_flags(&mut self) -> Result<StatusFlags, DriverError>;

    /// Read the motor supply voltage [mV].
    fn supply_voltage_mv(&mut self) -> Result<u32, DriverError>;

    /// Hard reset: stops every motor and returns to power-on state.
    fn reset(&mut self) -> Result<(), DriverError>;

    /// Clear the latched motor fault.
    fn clear_motor_fault(&mut self) -> Result<(), DriverError>;

    /// Clear the RESET status flag.
    fn clear_reset_flag(&mut self) -> Result<(), DriverError>;

    /// Select how the driver reacts to errors.
    fn set_error_response(&mut self, response: ErrorResponse) -> Result<(), DriverError>;

    /// Select which status flags count as errors.
    fn set_error_mask(&mut self, mask: StatusFlags) -> Result<(), DriverError>;

    /// Stop the motors if no command arrives within `timeout`.
    fn set_command_timeout(&mut self, timeout: Duration) -> Result<(), DriverError>;

    /// Max speed increase per driver update period.
    fn set_max_acceleration(&mut self, channel: u8, value: u16) -> Result<(), DriverError>;

    /// Max speed decrease per driver update period.
    fn set_max_deceleration(&mut self, channel: u8, value: u16) -> Result<(), DriverError>;

    /// Release the bus handle. Default: no-op.
    fn shutdown(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Driver and encoder produced by one backend for one axis.
pub struct DriverBundle {
    /// Motor-driver handle.
    pub driver: Box<dyn MotorDriver>,
    /// Quadrature input for the same axis.
    pub encoder: Box<dyn EncoderSource>,
}

/// Factory function type for creating backend instances.
pub type DriverFactory = fn(&AxisConfig) -> Result<DriverBundle, DriverError>;

/// Run the startup command sequence against a freshly opened driver.
///
/// reinitialize → clear reset flag → error response → error mask →
/// command timeout → accel/decel limits → clear motor fault.
pub fn configure_driver(
    driver: &mut dyn MotorDriver,
    config: &DriverConfig,
) -> Result<(), DriverError> {
    let channel = config.channel;
    driver.reinitialize()?;
    driver.clear_reset_flag()?;
    driver.set_error_response(config.error_response)?;
    driver.set_error_mask(StatusFlags::FAULT_MASK)?;
    driver.set_command_timeout(Duration::from_millis(config.command_timeout_ms as u64))?;
    driver.set_max_acceleration(channel, config.max_acceleration)?;
    driver.set_max_deceleration(channel, config.max_deceleration)?;
    driver.clear_motor_fault()?;
    debug!(
        "accel={} decel={} timeout={}ms",
        config.max_acceleration, config.max_deceleration, config.command_timeout_ms
    );
    info!("Driver '{}' configured on channel {}", driver.name(), channel);
    Ok(())
}
