//! Target-reached detection.
//!
//! Pure state machine; the control loop performs the side effects of
//! [`SettleEvent::Settled`] (zero command, PID reset, rebase, acknowledgement).

use rig_common::axis::SettleConfig;

/// Outcome of one [`SettlingDetector::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleEvent {
    /// No active target.
    Idle,
    /// Target active; `count` consecutive in-tolerance samples so far.
    Tracking { count: u32 },
    /// Threshold reached on this sample; the detector is idle again.
    Settled,
}

/// Counts consecutive samples with `|error| < epsilon`.
#[derive(Debug, Clone)]
pub struct SettlingDetector {
    epsilon: f64,
    threshold: u32,
    count: u32,
    active: bool,
}

impl SettlingDetector {
    pub fn new(cfg: &SettleConfig) -> Self {
        Self {
            epsilon: cfg.epsilon,
            threshold: cfg.threshold.max(1),
            count: 0,
            active: false,
        }
    }

    /// Start tracking a new target.
    pub fn arm(&mut self) {
        self.active = true;
        self.count = 0;
    }

    /// Drop the current target without settling.
    pub fn disarm(&mut self) {
        self.active = false;
        self.count = 0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Feed one error sample.
    pub fn update(&mut self, error: f64) -> SettleEvent {
        if !self.active {
            return SettleEvent::Idle;
        }
        if error.abs() < self.epsilon {
            self.count += 1;
            if self.count >= self.threshold {
                self.disarm();
                return SettleEvent::Settled;
            }
        } else {
            self.count = 0;
        }
        SettleEvent::Tracking { count: self.count }
    }
}
