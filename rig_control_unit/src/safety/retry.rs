//! Bounded retry for driver reads.

use rig_common::axis::SafetyConfig;
use rig_common::driver::DriverError;
use std::thread;
use std::time::Duration;
use tracing::warn;

use crate::error::SafetyFault;

/// Attempts and delay for one status or voltage read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Sleep between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    pub fn from_config(cfg: &SafetyConfig) -> Self {
        Self::new(
            cfg.retry_attempts.max(1),
            Duration::from_millis(cfg.retry_backoff_ms),
        )
    }

    /// Run `op` until it succeeds or the attempts run out.
    ///
    /// Non-transient errors are not retried.
    pub fn run<T>(
        &self,
        what: &'static str,
        mut op: impl FnMut() -> Result<T, DriverError>,
    ) -> Result<T, SafetyFault> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!("{what} read failed (attempt {attempt}/{attempts}): {e}");
                    if !self.backoff.is_zero() {
                        thread::sleep(self.backoff);
                    }
                    attempt += 1;
                }
                Err(e) => {
                    warn!("{what} read failed (attempt {attempt}/{attempts}): {e}");
                    return Err(SafetyFault::BusExhausted {
                        what,
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SafetyConfig::default())
    }
}
