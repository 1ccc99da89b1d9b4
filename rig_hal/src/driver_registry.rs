//! Driver registry for motor-driver backends.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving backend
//! factories. Constructed at startup and passed by value; no global state.

use rig_common::axis::AxisConfig;
use rig_common::driver::{DriverBundle, DriverError, DriverFactory};
use std::collections::HashMap;
use tracing::info;

use crate::drivers::register_all_drivers;

/// Registry of available backends.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in backend.
    pub fn with_builtin_drivers() -> Self {
        let mut reg = Self::new();
        register_all_drivers(&mut reg);
        reg
    }

    /// Register a backend factory.
    ///
    /// # Panics
    /// Panics if a backend with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a backend factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Open the backend named in `config.driver.name`.
    ///
    /// # Errors
    /// Returns `DriverError::NotFound` if no backend with that name is registered.
    pub fn open(&self, config: &AxisConfig) -> Result<DriverBundle, DriverError> {
        let name = config.driver.name.as_str();
        let factory = self
            .get_factory(name)
            .ok_or_else(|| DriverError::NotFound(name.to_string()))?;
        let bundle = factory(config)?;
        info!("Opened driver backend '{name}'");
        Ok(bundle)
    }

    /// List all registered backend names.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
