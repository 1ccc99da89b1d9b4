//! # Rig Tuning Library
//!
//! Offline characterization of one axis, run in isolated sessions against
//! the same driver/encoder pair the control unit uses.
//!
//! # Module Structure
//!
//! - [`rig`] - `TuningRig` abstraction over driver, encoder and clock
//! - [`relay`] - Ultimate gain/period search and Ziegler–Nichols gains
//! - [`fit`] - Linear detrending and least-squares sinusoid fitting
//! - [`frf`] - Sine-sweep frequency response
//! - [`table`] - Gain/phase CSV artifact
//! - [`config`] - `[autotune]` / `[frequency_response]` sections
//! - [`error`] - `TuneError`

pub mod config;
pub mod error;
pub mod fit;
pub mod frf;
pub mod relay;
pub mod rig;
pub mod table;

pub use error::TuneError;
