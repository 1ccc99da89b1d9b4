mod end_to_end;
mod safety_stop;
mod setpoint_file;

use rig_common::axis::AxisConfig;
use rig_control_unit::cycle::ControlLoop;
use rig_control_unit::setpoint::FileSetpoint;
use rig_hal::{SimHandle, simulated_bundle};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Axis config matching the field rig, with a zero retry backoff.
pub fn axis_config() -> AxisConfig {
    let mut cfg = AxisConfig::with_service_name("axis-it");
    cfg.safety.retry_backoff_ms = 0;
    cfg
}

/// Control loop over a manually stepped simulation and a temp setpoint file.
pub struct Bench {
    pub control: ControlLoop<FileSetpoint>,
    pub sim: SimHandle,
    pub setpoint: PathBuf,
    pub now: Instant,
    pub cycle: Duration,
    _dir: TempDir,
}

impl Bench {
    pub fn new(cfg: &AxisConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let setpoint = dir.path().join("target.txt");
        fs::write(&setpoint, "0").unwrap();
        let (bundle, sim) = simulated_bundle(cfg, false);
        let control = ControlLoop::new(cfg, bundle, FileSetpoint::new(&setpoint)).unwrap();
        Self {
            control,
            sim,
            setpoint,
            now: Instant::now(),
            cycle: Duration::from_millis(cfg.cycle.cycle_time_ms),
            _dir: dir,
        }
    }

    pub fn write_target(&self, value: &str) {
        fs::write(&self.setpoint, value).unwrap();
    }

    pub fn read_target(&self) -> String {
        fs::read_to_string(&self.setpoint).unwrap()
    }

    /// Step the plant for one cycle in 10 ms slices.
    pub fn advance(&mut self) {
        let slice = Duration::from_millis(10);
        let mut left = self.cycle;
        while !left.is_zero() {
            let dt = left.min(slice);
            self.sim.step(dt);
            left -= dt;
        }
        self.now += self.cycle;
    }
}
