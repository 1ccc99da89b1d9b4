//! Integration test: fault monitor aborts the loop.
//!
//! Every fatal condition must leave the simulated driver reset and the
//! channel commanded to zero.

use super::{Bench, axis_config};
use rig_common::driver::StatusFlags;
use rig_control_unit::error::{ControlError, SafetyFault};

fn tracking_bench() -> Bench {
    let mut bench = Bench::new(&axis_config());
    bench.write_target("50");
    for _ in 0..5 {
        bench.control.tick(bench.now).unwrap();
        bench.advance();
    }
    assert_ne!(bench.sim.commanded_speed(1), 0);
    bench
}

#[test]
fn driver_fault_resets_and_zeroes() {
    let mut bench = tracking_bench();
    bench.sim.inject_flags(StatusFlags::NO_POWER_LATCHED);
    let err = bench.control.tick(bench.now).unwrap_err();
    assert!(matches!(
        err,
        ControlError::Fault(SafetyFault::DriverFault { flags }) if flags == StatusFlags::NO_POWER_LATCHED
    ));
    assert_eq!(bench.sim.reset_count(), 1);
    assert_eq!(bench.sim.commanded_speed(1), 0);
}

#[test]
fn under_voltage_resets_and_zeroes() {
    let mut bench = tracking_bench();
    bench.sim.set_supply_mv(3000);
    let err = bench.control.tick(bench.now).unwrap_err();
    assert!(matches!(
        err,
        ControlError::Fault(SafetyFault::UnderVoltage { measured_mv: 3000, .. })
    ));
    assert_eq!(bench.sim.reset_count(), 1);
    assert_eq!(bench.sim.commanded_speed(1), 0);
}

#[test]
fn transient_reads_within_bound_do_not_abort() {
    let mut bench = tracking_bench();
    bench.sim.fail_next_reads(2);
    assert!(bench.control.tick(bench.now).is_ok());
    assert_eq!(bench.sim.reset_count(), 0);
}

#[test]
fn exhausted_reads_abort() {
    let mut bench = tracking_bench();
    bench.sim.fail_next_reads(3);
    let err = bench.control.tick(bench.now).unwrap_err();
    assert!(matches!(
        err,
        ControlError::Fault(SafetyFault::BusExhausted { attempts: 3, .. })
    ));
    assert_eq!(bench.sim.reset_count(), 1);
    assert_eq!(bench.sim.commanded_speed(1), 0);
}

#[test]
fn disabled_monitor_ignores_faults() {
    let mut cfg = axis_config();
    cfg.safety.enabled = false;
    let mut bench = Bench::new(&cfg);
    bench.sim.set_supply_mv(1000);
    assert!(bench.control.tick(bench.now).is_ok());
    assert_eq!(bench.sim.reset_count(), 0);
}

#[test]
fn shutdown_after_fault_releases_encoder() {
    let mut bench = tracking_bench();
    bench.sim.inject_flags(StatusFlags::MOTOR_FAULT_LATCHED);
    assert!(bench.control.tick(bench.now).is_err());
    bench.control.shutdown();
    assert!(!bench.sim.encoder_registered());
}
