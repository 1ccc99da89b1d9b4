//! Quadrature encoder capability.
//!
//! The GPIO interrupt service is external; a backend decodes the two input
//! lines and calls the registered callback with `+1` or `-1` per valid
//! transition, from its own thread.

use crate::axis::EncoderConfig;
use crate::driver::DriverError;

/// Direction callback: `+1` or `-1` per decoded transition.
pub type EdgeCallback = Box<dyn Fn(i8) + Send + Sync>;

/// Source of decoded quadrature transitions.
pub trait EncoderSource: Send {
    /// Configure both input lines and start delivering transitions.
    ///
    /// The callback runs asynchronously to the caller until the returned
    /// registration is cancelled.
    fn register(
        &mut self,
        config: &EncoderConfig,
        callback: EdgeCallback,
    ) -> Result<Box<dyn EncoderRegistration>, DriverError>;
}

/// An active callback registration.
pub trait EncoderRegistration: Send {
    /// Stop delivering transitions and release the interrupt registration.
    ///
    /// Must be idempotent.
    fn cancel(&mut self);
}
