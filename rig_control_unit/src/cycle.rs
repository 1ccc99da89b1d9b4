//! Control loop runner.
//!
//! One tick: poll setpoint → safety check → read position → shape bounds →
//! PID → deadband → `set_speed` → settle detection. While no target is
//! active the loop keeps commanding 0 so the driver's command timeout never
//! trips.
//!
//! Pacing is sleep-based: each tick sleeps for whatever remains of the cycle
//! period. Overruns are counted in [`CycleStats`].

use rig_common::axis::AxisConfig;
use rig_common::driver::{DriverBundle, MotorDriver, configure_driver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::control::output::CommandShaper;
use crate::control::pid::FilteredPid;
use crate::control::settle::{SettleEvent, SettlingDetector};
use crate::encoder::PositionEstimator;
use crate::error::ControlError;
use crate::safety::MotorSafetyMonitor;
use crate::setpoint::{FileSetpoint, SetpointInbox, SetpointPoller, SetpointSource, channel};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// Timing statistics for the control loop.
#[derive(Debug, Clone, Copy)]
pub struct CycleStats {
    /// Total ticks executed.
    pub cycle_count: u64,
    /// Last tick duration [ns].
    pub last_cycle_ns: u64,
    /// Minimum tick duration [ns].
    pub min_cycle_ns: u64,
    /// Maximum tick duration [ns].
    pub max_cycle_ns: u64,
    /// Running sum for average computation.
    pub sum_cycle_ns: u64,
    /// Ticks that took longer than the cycle period.
    pub overruns: u64,
}

impl CycleStats {
    /// Create a new zeroed stats instance.
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: u64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
        }
    }

    /// Record one tick against the cycle budget.
    #[inline]
    pub fn record(&mut self, duration: Duration, budget: Duration) {
        let ns = duration.as_nanos().min(u64::MAX as u128) as u64;
        self.cycle_count += 1;
        self.last_cycle_ns = ns;
        self.min_cycle_ns = self.min_cycle_ns.min(ns);
        self.max_cycle_ns = self.max_cycle_ns.max(ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(ns);
        if duration > budget {
            self.overruns += 1;
        }
    }

    /// Average tick time [ns] (returns 0 if no ticks).
    #[inline]
    pub fn avg_cycle_ns(&self) -> u64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Control Loop ───────────────────────────────────────────────────

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No target; 0 commanded.
    Idle,
    /// Driving toward the target.
    Tracking { error: f64, speed: i32 },
    /// Target reached on this tick and retired.
    Settled { target: f64 },
}

/// Closed-loop position controller for one axis.
pub struct ControlLoop<S: SetpointSource = FileSetpoint> {
    driver: Box<dyn MotorDriver>,
    encoder: PositionEstimator,
    pid: FilteredPid,
    shaper: CommandShaper,
    settle: SettlingDetector,
    safety: MotorSafetyMonitor,
    poller: SetpointPoller<S>,
    inbox: SetpointInbox,
    channel: u8,
    cycle_time: Duration,
    target: Option<f64>,
    stats: CycleStats,
    shut_down: bool,
}

impl<S: SetpointSource> ControlLoop<S> {
    /// Configure the driver, attach the encoder and wire the setpoint.
    pub fn new(config: &AxisConfig, bundle: DriverBundle, setpoint: S) -> Result<Self, ControlError> {
        let DriverBundle {
            mut driver,
            mut encoder,
        } = bundle;
        configure_driver(driver.as_mut(), &config.driver)?;
        let estimator = PositionEstimator::attach(encoder.as_mut(), &config.encoder)?;
        let (poller, inbox) = channel(setpoint);

        let safety = MotorSafetyMonitor::from_axis(config);
        if !safety.is_enabled() {
            warn!("Safety monitor disabled for '{}'", config.shared.service_name);
        }

        Ok(Self {
            driver,
            encoder: estimator,
            pid: FilteredPid::new(&config.pid),
            shaper: CommandShaper::new(&config.shaping),
            settle: SettlingDetector::new(&config.settle),
            safety,
            poller,
            inbox,
            channel: config.driver.channel,
            cycle_time: Duration::from_millis(config.cycle.cycle_time_ms),
            target: None,
            stats: CycleStats::new(),
            shut_down: false,
        })
    }

    /// Execute one tick at time `now`.
    pub fn tick(&mut self, now: Instant) -> Result<TickOutcome, ControlError> {
        self.poller.poll();
        if let Some(value) = self.inbox.latest() {
            self.accept(value);
        }

        self.safety.check(self.driver.as_mut())?;

        let Some(target) = self.target else {
            self.command(0)?;
            return Ok(TickOutcome::Idle);
        };

        let position = self.encoder.position();
        let error = target - position;
        let (lo, hi) = self.shaper.bounds(error, self.pid.limits());
        self.pid.set_output_bounds(lo, hi);
        let output = self.pid.compute(position, now);
        let speed = self.shaper.to_speed(output);
        self.command(speed)?;
        debug!("Position: {position:.4}, Target: {target:.4}, Speed: {speed}");

        match self.settle.update(error) {
            SettleEvent::Settled => {
                self.retire(target)?;
                Ok(TickOutcome::Settled { target })
            }
            _ => Ok(TickOutcome::Tracking { error, speed }),
        }
    }

    fn accept(&mut self, value: f64) {
        if value == 0.0 || self.target.is_some() {
            return;
        }
        info!("New target accepted: {value}");
        self.target = Some(value);
        self.pid.set_setpoint(value);
        self.settle.arm();
    }

    fn retire(&mut self, target: f64) -> Result<(), ControlError> {
        self.command(0)?;
        self.target = None;
        self.pid.reset();
        self.pid.set_setpoint(0.0);
        self.encoder.rebase(target);
        self.inbox.retire();
        self.poller.flush_acks();
        info!("Target {target} reached");
        Ok(())
    }

    /// `set_speed`; a failure aborts the driver and is fatal.
    fn command(&mut self, speed: i32) -> Result<(), ControlError> {
        if let Err(e) = self.driver.set_speed(self.channel, speed) {
            self.safety.abort(self.driver.as_mut());
            return Err(e.into());
        }
        Ok(())
    }

    /// Tick at the configured period until `running` clears or a fault ends
    /// the loop. Always shuts down before returning.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), ControlError> {
        info!("Control loop running (cycle={:?})", self.cycle_time);
        let result = self.run_inner(running);
        self.shutdown();
        result
    }

    fn run_inner(&mut self, running: &AtomicBool) -> Result<(), ControlError> {
        while running.load(Ordering::SeqCst) {
            let start = Instant::now();
            self.tick(start)?;
            let elapsed = start.elapsed();
            self.stats.record(elapsed, self.cycle_time);
            match self.cycle_time.checked_sub(elapsed) {
                Some(rest) => thread::sleep(rest),
                None => debug!(
                    "Cycle overrun: {:?} > {:?} ({} total)",
                    elapsed, self.cycle_time, self.stats.overruns
                ),
            }
        }
        info!(
            "Control loop stopped after {} ticks (avg {}µs, max {}µs, overruns {})",
            self.stats.cycle_count,
            self.stats.avg_cycle_ns() / 1000,
            self.stats.max_cycle_ns / 1000,
            self.stats.overruns
        );
        Ok(())
    }

    /// Command 0, release the encoder and the driver. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if let Err(e) = self.driver.set_speed(self.channel, 0) {
            warn!("Failed to zero motor on shutdown: {e}");
        }
        self.poller.flush_acks();
        self.encoder.cancel();
        if let Err(e) = self.driver.shutdown() {
            warn!("Driver shutdown failed: {e}");
        }
        info!("Control loop shut down");
    }

    /// Active target, if any.
    pub fn target(&self) -> Option<f64> {
        self.target
    }

    /// Current position [units].
    pub fn position(&self) -> f64 {
        self.encoder.position()
    }

    pub fn encoder(&self) -> &PositionEstimator {
        &self.encoder
    }

    pub fn pid(&self) -> &FilteredPid {
        &self.pid
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn setpoint_source(&self) -> &S {
        self.poller.source()
    }
}

impl<S: SetpointSource> Drop for ControlLoop<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
