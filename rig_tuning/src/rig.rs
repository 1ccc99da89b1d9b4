//! Tuning rig abstraction.
//!
//! The procedures only need a position, a speed command and a clock. A
//! [`DriverRig`] provides them from a real (or simulated) driver bundle;
//! tests provide synthetic rigs with a virtual clock.

use rig_common::axis::AxisConfig;
use rig_common::driver::{DriverBundle, MotorDriver, configure_driver};
use rig_control_unit::encoder::PositionEstimator;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::TuneError;

/// What a tuning procedure drives.
pub trait TuningRig {
    /// Position [physical units].
    fn position(&self) -> f64;

    /// Raw encoder count.
    fn counts(&self) -> i64;

    /// Send a signed speed to the motor.
    fn command(&mut self, speed: i32) -> Result<(), TuneError>;

    /// Time since the rig was opened.
    fn elapsed(&self) -> Duration;

    /// Wait for `duration`.
    fn sleep(&mut self, duration: Duration);

    /// Make the current position the origin.
    fn zero(&mut self);

    /// Whether the user asked to stop.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Command `speed` every `interval` for `duration`.
///
/// Used for the zero-speed pauses; re-sending keeps the driver's command
/// timeout from tripping.
pub fn hold<R: TuningRig + ?Sized>(
    rig: &mut R,
    speed: i32,
    duration: Duration,
    interval: Duration,
) -> Result<(), TuneError> {
    let start = rig.elapsed();
    loop {
        rig.command(speed)?;
        let spent = rig.elapsed().saturating_sub(start);
        if spent >= duration || rig.is_cancelled() {
            return Ok(());
        }
        rig.sleep(interval.min(duration - spent));
    }
}

// ─── Clocks ─────────────────────────────────────────────────────────

/// Time source for a [`DriverRig`].
pub trait Clock {
    /// Time since the clock was created.
    fn now(&self) -> Duration;
    fn sleep(&mut self, duration: Duration);
}

/// Monotonic wall clock with `thread::sleep`.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    start: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

// ─── Driver Rig ─────────────────────────────────────────────────────

/// Motor driver + encoder for one axis.
pub struct DriverRig<C: Clock = WallClock> {
    driver: Box<dyn MotorDriver>,
    encoder: PositionEstimator,
    channel: u8,
    clock: C,
    running: Option<Arc<AtomicBool>>,
    shut_down: bool,
}

impl<C: Clock> DriverRig<C> {
    /// Configure the driver and attach the encoder.
    pub fn open(config: &AxisConfig, bundle: DriverBundle, clock: C) -> Result<Self, TuneError> {
        let DriverBundle {
            mut driver,
            mut encoder,
        } = bundle;
        configure_driver(driver.as_mut(), &config.driver)?;
        let encoder = PositionEstimator::attach(encoder.as_mut(), &config.encoder)?;
        Ok(Self {
            driver,
            encoder,
            channel: config.driver.channel,
            clock,
            running: None,
            shut_down: false,
        })
    }

    /// Report cancellation once `running` clears.
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
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
        self.encoder.cancel();
        if let Err(e) = self.driver.shutdown() {
            warn!("Driver shutdown failed: {e}");
        }
        info!("Tuning rig shut down");
    }
}

impl<C: Clock> TuningRig for DriverRig<C> {
    fn position(&self) -> f64 {
        self.encoder.position()
    }

    fn counts(&self) -> i64 {
        self.encoder.counts()
    }

    fn command(&mut self, speed: i32) -> Result<(), TuneError> {
        self.driver.set_speed(self.channel, speed)?;
        Ok(())
    }

    fn elapsed(&self) -> Duration {
        self.clock.now()
    }

    fn sleep(&mut self, duration: Duration) {
        self.clock.sleep(duration);
    }

    fn zero(&mut self) {
        self.encoder.zero();
    }

    fn is_cancelled(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.load(Ordering::SeqCst))
    }
}

impl<C: Clock> Drop for DriverRig<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
