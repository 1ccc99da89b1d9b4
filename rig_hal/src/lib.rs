//! # Rig HAL Library
//!
//! Pluggable motor-driver backends behind the `MotorDriver` / `EncoderSource`
//! traits defined in `rig_common`.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Backend factory registration
//! - [`drivers`] - Backend implementations (currently: simulation)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌────────────────────┐
//! │  rig_control_unit /  │────►│  DriverRegistry    │
//! │  rig_tuning          │     │  open(axis config) │
//! └──────────┬───────────┘     └─────────┬──────────┘
//!            │ DriverBundle              │ factory
//!            ▼                           ▼
//!   Box<dyn MotorDriver>       simulation::create_driver
//!   Box<dyn EncoderSource>     (SimHandle + physics thread)
//! ```

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;

pub use crate::driver_registry::DriverRegistry;
pub use crate::drivers::simulation::{SimHandle, simulated_bundle};
