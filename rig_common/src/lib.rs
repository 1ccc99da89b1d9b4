//! Rig Common Library
//!
//! Shared types for every crate in the rig workspace.
//!
//! # Module Structure
//!
//! - [`driver`] - `MotorDriver` capability trait, status bitmask and driver errors
//! - [`encoder`] - `EncoderSource` capability trait for quadrature inputs
//! - [`config`] - Configuration loading traits and types
//! - [`axis`] - Per-axis TOML configuration
//! - [`consts`] - Defaults shared by the controller and the tuning tools
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use rig_common::config::ConfigLoader;
//! use rig_common::driver::{MotorDriver, StatusFlags};
//! ```

pub mod axis;
pub mod config;
pub mod consts;
pub mod driver;
pub mod encoder;
pub mod prelude;
