//! Safety module root.
//!
//! Driver fault monitoring and the bounded retry applied to its reads.

pub mod monitor;
pub mod retry;

pub use monitor::MotorSafetyMonitor;
pub use retry::RetryPolicy;
