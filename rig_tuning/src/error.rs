//! Tuning error types.

use rig_common::config::ConfigError;
use rig_common::driver::DriverError;
use thiserror::Error;

/// Failure of an offline tuning procedure.
#[derive(Debug, Error)]
pub enum TuneError {
    /// The gain sweep ended without sustained oscillation. Not fatal.
    #[error("No sustained oscillation found up to P={max_gain:.2}")]
    OscillationNotFound { max_gain: f64 },

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Too few samples in a record window to fit a sinusoid.
    #[error("Only {count} samples recorded at {frequency_hz:.4} Hz")]
    InsufficientSamples { frequency_hz: f64, count: usize },

    /// The sin/cos normal equations have no unique solution.
    #[error("Least-squares fit is singular at {frequency_hz:.4} Hz")]
    Singular { frequency_hz: f64 },

    /// The user stopped the procedure.
    #[error("Interrupted")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed gain/phase table.
    #[error("Line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
