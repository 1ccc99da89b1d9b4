//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `MotorDriver` trait on top of a
//! [`SimHandle`], so the control unit and the tuning tools run without
//! physical hardware.

use rig_common::consts::{CHANNEL_MAX, CHANNEL_MIN, SPEED_LIMIT};
use rig_common::driver::{DriverError, ErrorResponse, MotorDriver, StatusFlags};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::physics::PhysicsThread;
use super::state::SimHandle;

/// Simulation driver implementing the MotorDriver trait.
pub struct SimulationDriver {
    /// Shared rig state
    sim: SimHandle,
    /// Background physics, when not stepped manually
    physics: Option<PhysicsThread>,
}

impl SimulationDriver {
    /// Create a driver over `sim`; physics must be stepped by the caller.
    pub fn new(sim: SimHandle) -> Self {
        Self { sim, physics: None }
    }

    /// Create a driver that advances physics on a background thread.
    pub fn with_physics_thread(sim: SimHandle, period: Duration) -> Self {
        let physics = PhysicsThread::spawn(sim.clone(), period);
        Self {
            sim,
            physics: Some(physics),
        }
    }

    /// Handle to the shared rig state.
    pub fn handle(&self) -> SimHandle {
        self.sim.clone()
    }

    fn check_channel(channel: u8) -> Result<usize, DriverError> {
        if (CHANNEL_MIN..=CHANNEL_MAX).contains(&channel) {
            Ok((channel - 1) as usize)
        } else {
            Err(DriverError::InvalidChannel(channel))
        }
    }
}

impl MotorDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn reinitialize(&mut self) -> Result<(), DriverError> {
        self.sim.inner.lock().power_on();
        debug!("Simulation driver reinitialized");
        Ok(())
    }

    fn set_speed(&mut self, channel: u8, speed: i32) -> Result<(), DriverError> {
        let idx = Self::check_channel(channel)?;
        let mut s = self.sim.inner.lock();
        s.channels[idx].target = speed.clamp(-SPEED_LIMIT, SPEED_LIMIT);
        s.since_command = Duration::ZERO;
        s.flags.remove(StatusFlags::COMMAND_TIMEOUT);
        Ok(())
    }

    fn status_flags(&mut self) -> Result<StatusFlags, DriverError> {
        let mut s = self.sim.inner.lock();
        if s.take_failure() {
            return Err(DriverError::Crc("status flags"));
        }
        Ok(s.flags)
    }

    fn supply_voltage_mv(&mut self) -> Result<u32, DriverError> {
        let mut s = self.sim.inner.lock();
        if s.take_failure() {
            return Err(DriverError::Crc("supply voltage"));
        }
        Ok(s.supply_mv)
    }

    fn reset(&mut self) -> Result<(), DriverError> {
        let mut s = self.sim.inner.lock();
        s.power_on();
        s.reset_count += 1;
        warn!("Simulation driver hard reset (#{})", s.reset_count);
        Ok(())
    }

    fn clear_motor_fault(&mut self) -> Result<(), DriverError> {
        self.sim
            .inner
            .lock()
            .flags
            .remove(StatusFlags::MOTOR_FAULT_LATCHED | StatusFlags::MOTOR_FAULTING);
        Ok(())
    }

    fn clear_reset_flag(&mut self) -> Result<(), DriverError> {
        self.sim.inner.lock().flags.remove(StatusFlags::RESET);
        Ok(())
    }

    fn set_error_response(&mut self, response: ErrorResponse) -> Result<(), DriverError> {
        self.sim.inner.lock().error_response = response;
        Ok(())
    }

    fn set_error_mask(&mut self, mask: StatusFlags) -> Result<(), DriverError> {
        self.sim.inner.lock().error_mask = mask;
        Ok(())
    }

    fn set_command_timeout(&mut self, timeout: Duration) -> Result<(), DriverError> {
        self.sim.inner.lock().command_timeout = timeout;
        Ok(())
    }

    fn set_max_acceleration(&mut self, channel: u8, value: u16) -> Result<(), DriverError> {
        let idx = Self::check_channel(channel)?;
        self.sim.inner.lock().channels[idx].max_acceleration = value;
        Ok(())
    }

    fn set_max_deceleration(&mut self, channel: u8, value: u16) -> Result<(), DriverError> {
        let idx = Self::check_channel(channel)?;
        self.sim.inner.lock().channels[idx].max_deceleration = value;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), DriverError> {
        info!("Shutting down simulation driver");
        if let Some(mut physics) = self.physics.take() {
            physics.stop();
        }
        Ok(())
    }
}
