//! Shared simulation state.
//!
//! The driver, the encoder and the physics thread all hold a [`SimHandle`]
//! to the same plant. Edge callbacks are invoked after the lock is released.

use parking_lot::Mutex;
use rig_common::axis::SimulationConfig;
use rig_common::consts::{CHANNEL_MAX, DRIVER_UPDATE_PERIOD_S};
use rig_common::driver::{ErrorResponse, StatusFlags};
use rig_common::encoder::EdgeCallback;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use super::plant::PlantModel;

/// Per-channel command state.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ChannelState {
    /// Last commanded speed.
    pub target: i32,
    /// Speed currently applied after acceleration limiting.
    pub applied: f64,
    /// Max increase per update period (0 = unlimited).
    pub max_acceleration: u16,
    /// Max decrease per update period (0 = unlimited).
    pub max_deceleration: u16,
}

impl ChannelState {
    /// Move `applied` toward `target` within the configured ramp limits.
    fn ramp(&mut self, target: f64, dt: f64) {
        let periods = dt / DRIVER_UPDATE_PERIOD_S;
        let delta = target - self.applied;
        // Growing magnitude (same sign) is acceleration; anything else decelerates.
        let accelerating = self.applied == 0.0 || (delta.signum() == self.applied.signum());
        let limit = if accelerating {
            self.max_acceleration
        } else {
            self.max_deceleration
        };
        if limit == 0 {
            self.applied = target;
        } else {
            let step = limit as f64 * periods;
            self.applied += delta.clamp(-step, step);
        }
    }
}

pub(crate) struct SimState {
    pub plant: PlantModel,
    pub channels: [ChannelState; CHANNEL_MAX as usize],
    /// Channel whose output drives the plant.
    pub plant_channel: u8,
    pub flags: StatusFlags,
    pub error_mask: StatusFlags,
    pub error_response: ErrorResponse,
    pub command_timeout: Duration,
    pub since_command: Duration,
    pub supply_mv: u32,
    /// Remaining injected read failures.
    pub failing_reads: u32,
    pub reset_count: u32,
    pub callback: Option<Arc<EdgeCallback>>,
    pub elapsed: Duration,
}

impl SimState {
    fn new(config: &SimulationConfig, plant_channel: u8) -> Self {
        Self {
            plant: PlantModel::new(config),
            channels: [ChannelState::default(); CHANNEL_MAX as usize],
            plant_channel,
            flags: StatusFlags::RESET,
            error_mask: StatusFlags::FAULT_MASK,
            error_response: ErrorResponse::Coast,
            command_timeout: Duration::ZERO,
            since_command: Duration::ZERO,
            supply_mv: config.supply_mv,
            failing_reads: 0,
            reset_count: 0,
            callback: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Power-on state; plant motion and callback registration are kept.
    pub fn power_on(&mut self) {
        for ch in self.channels.iter_mut() {
            ch.target = 0;
            ch.applied = 0.0;
        }
        self.flags = StatusFlags::RESET;
        self.error_mask = StatusFlags::FAULT_MASK;
        self.error_response = ErrorResponse::Coast;
        self.command_timeout = Duration::ZERO;
        self.since_command = Duration::ZERO;
    }

    /// True while a masked error holds the outputs off.
    fn error_active(&self) -> bool {
        self.flags.intersects(self.error_mask)
    }

    /// Consume one injected failure, if any.
    pub fn take_failure(&mut self) -> bool {
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            true
        } else {
            false
        }
    }
}

/// Cloneable handle to the simulated rig.
///
/// Besides stepping physics, exposes fault injection for tests.
#[derive(Clone)]
pub struct SimHandle {
    pub(crate) inner: Arc<Mutex<SimState>>,
}

impl SimHandle {
    /// Create a rig whose plant is driven by `plant_channel`.
    pub fn new(config: &SimulationConfig, plant_channel: u8) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimState::new(config, plant_channel))),
        }
    }

    /// Advance the simulation by `dt` and deliver encoder edges.
    pub fn step(&self, dt: Duration) {
        let (crossed, callback) = {
            let mut s = self.inner.lock();
            let dt_s = dt.as_secs_f64();
            s.elapsed += dt;

            if !s.command_timeout.is_zero() {
                s.since_command += dt;
                if s.since_command > s.command_timeout
                    && !s.flags.contains(StatusFlags::COMMAND_TIMEOUT)
                {
                    debug!("Simulated command timeout after {:?}", s.since_command);
                    s.flags |= StatusFlags::COMMAND_TIMEOUT | StatusFlags::COMMAND_TIMEOUT_LATCHED;
                }
            }

            if s.supply_mv == 0 {
                s.flags |= StatusFlags::NO_POWER | StatusFlags::NO_POWER_LATCHED;
            } else {
                s.flags.remove(StatusFlags::NO_POWER);
            }
            let active = s.error_active();
            s.flags.set(StatusFlags::ERROR_ACTIVE, active);

            let idx = (s.plant_channel - 1) as usize;
            let target = if active { 0.0 } else { s.channels[idx].target as f64 };
            let immediate = active
                && matches!(
                    s.error_response,
                    ErrorResponse::CoastNow | ErrorResponse::BrakeNow
                );
            if immediate {
                s.channels[idx].applied = 0.0;
            } else {
                s.channels[idx].ramp(target, dt_s);
            }
            let applied = s.channels[idx].applied;
            s.flags.set(StatusFlags::MOTOR_DRIVING, applied != 0.0);

            let crossed = s.plant.step(applied, dt_s);
            (crossed, s.callback.clone())
        };

        if let Some(cb) = callback {
            let dir: i8 = if crossed >= 0 { 1 } else { -1 };
            for _ in 0..crossed.unsigned_abs() {
                cb(dir);
            }
        }
        if crossed != 0 {
            trace!("Simulated plant crossed {crossed} counts");
        }
    }

    /// Set status flags as if the hardware raised them.
    pub fn inject_flags(&self, flags: StatusFlags) {
        self.inner.lock().flags |= flags;
    }

    /// Fail the next `n` status/voltage reads with a CRC error.
    pub fn fail_next_reads(&self, n: u32) {
        self.inner.lock().failing_reads = n;
    }

    /// Change the reported supply voltage.
    pub fn set_supply_mv(&self, mv: u32) {
        self.inner.lock().supply_mv = mv;
    }

    /// Current status flags.
    pub fn flags(&self) -> StatusFlags {
        self.inner.lock().flags
    }

    /// Number of hard resets received.
    pub fn reset_count(&self) -> u32 {
        self.inner.lock().reset_count
    }

    /// Last commanded speed on `channel`.
    pub fn commanded_speed(&self, channel: u8) -> i32 {
        let s = self.inner.lock();
        s.channels
            .get((channel as usize).wrapping_sub(1))
            .map_or(0, |c| c.target)
    }

    /// Speed currently applied to the plant.
    pub fn applied_speed(&self) -> f64 {
        let s = self.inner.lock();
        s.channels[(s.plant_channel - 1) as usize].applied
    }

    /// Continuous plant position [counts].
    pub fn plant_position(&self) -> f64 {
        self.inner.lock().plant.position()
    }

    /// Plant velocity [counts/s].
    pub fn plant_velocity(&self) -> f64 {
        self.inner.lock().plant.velocity()
    }

    /// Whether an encoder callback is registered.
    pub fn encoder_registered(&self) -> bool {
        self.inner.lock().callback.is_some()
    }

    /// Total simulated time.
    pub fn elapsed(&self) -> Duration {
        self.inner.lock().elapsed
    }
}
