//! Axis configuration loader with validation.
//!
//! Loads an `AxisConfig` from TOML and applies command-line overrides before
//! validating bounds.

use std::path::Path;

use rig_common::axis::AxisConfig;
use rig_common::config::{ConfigError, ConfigLoader};
use tracing::info;

/// Load and validate `path`, replacing the setpoint path when given.
pub fn load_config(path: &Path, setpoint_override: Option<&Path>) -> Result<AxisConfig, ConfigError> {
    let mut config = AxisConfig::load(path)?;
    if let Some(sp) = setpoint_override {
        config.setpoint.path = sp.display().to_string();
    }
    config.validate()?;
    info!(
        "Config '{}' loaded: driver={} channel={} cycle={}ms",
        config.shared.service_name,
        config.driver.name,
        config.driver.channel,
        config.cycle.cycle_time_ms
    );
    Ok(config)
}

/// Parse and validate TOML text.
pub fn load_config_from_str(toml: &str) -> Result<AxisConfig, ConfigError> {
    let config = AxisConfig::from_toml(toml)?;
    config.validate()?;
    Ok(config)
}
