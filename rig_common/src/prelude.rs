//! Common re-exports.

pub use crate::axis::{AxisConfig, Direction, EncoderConfig, PidConfig};
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::driver::{
    DriverBundle, DriverError, DriverFactory, ErrorResponse, MotorDriver, StatusFlags,
    configure_driver,
};
pub use crate::encoder::{EdgeCallback, EncoderRegistration, EncoderSource};
