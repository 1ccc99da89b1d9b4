//! Integration test: setpoint file handling and threaded run.

use super::{Bench, axis_config};
use rig_control_unit::cycle::{ControlLoop, TickOutcome};
use rig_control_unit::setpoint::FileSetpoint;
use rig_hal::simulated_bundle;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[test]
fn malformed_file_means_no_target() {
    let mut bench = Bench::new(&axis_config());
    bench.write_target("abc\n");
    assert_eq!(bench.control.tick(bench.now).unwrap(), TickOutcome::Idle);
    assert_eq!(bench.read_target(), "abc\n");

    bench.write_target(" 12.5\n");
    bench.advance();
    assert!(matches!(
        bench.control.tick(bench.now).unwrap(),
        TickOutcome::Tracking { .. }
    ));
    assert_eq!(bench.control.target(), Some(12.5));
}

#[test]
fn missing_file_means_no_target() {
    let mut bench = Bench::new(&axis_config());
    fs::remove_file(&bench.setpoint).unwrap();
    assert_eq!(bench.control.tick(bench.now).unwrap(), TickOutcome::Idle);
    assert_eq!(bench.sim.commanded_speed(1), 0);
}

#[test]
fn new_value_ignored_while_tracking() {
    let mut bench = Bench::new(&axis_config());
    bench.write_target("30");
    bench.control.tick(bench.now).unwrap();
    bench.advance();
    bench.write_target("60");
    bench.control.tick(bench.now).unwrap();
    assert_eq!(bench.control.target(), Some(30.0));
}

#[test]
fn threaded_run_settles_and_stops_on_flag() {
    let mut cfg = axis_config();
    cfg.cycle.cycle_time_ms = 20;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("target.txt");
    fs::write(&path, "5").unwrap();

    let (bundle, sim) = simulated_bundle(&cfg, true);
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    let file = path.clone();
    let handle = thread::spawn(move || {
        let mut control = ControlLoop::new(&cfg, bundle, FileSetpoint::new(file)).unwrap();
        control.run(&r).unwrap();
        control.stats().cycle_count
    });

    let deadline = Instant::now() + Duration::from_secs(15);
    while fs::read_to_string(&path).unwrap().trim() != "0" {
        assert!(Instant::now() < deadline, "target never acknowledged");
        thread::sleep(Duration::from_millis(20));
    }

    running.store(false, Ordering::SeqCst);
    let ticks = handle.join().unwrap();
    assert!(ticks > 20);
    assert!(!sim.encoder_registered());
    assert_eq!(sim.commanded_speed(1), 0);
}

/// Tick until the active target settles.
fn settle(bench: &mut Bench) {
    for _ in 0..600 {
        let outcome = bench.control.tick(bench.now).unwrap();
        bench.advance();
        if matches!(outcome, TickOutcome::Settled { .. }) {
            return;
        }
    }
    panic!("target never settled");
}

#[test]
fn target_written_after_settle_is_kept() {
    let mut bench = Bench::new(&axis_config());
    bench.write_target("5");
    settle(&mut bench);
    assert_eq!(bench.read_target(), "0");

    // Scheduler queues the next target before the following tick.
    bench.write_target("7");
    assert!(matches!(
        bench.control.tick(bench.now).unwrap(),
        TickOutcome::Tracking { .. }
    ));
    assert_eq!(bench.control.target(), Some(7.0));
    assert_eq!(bench.read_target(), "7");
}

#[test]
fn settled_target_is_acknowledged_before_shutdown() {
    let mut bench = Bench::new(&axis_config());
    bench.write_target("5");
    settle(&mut bench);

    bench.control.run(&AtomicBool::new(false)).unwrap();
    assert_eq!(bench.read_target(), "0");
    assert!(!bench.sim.encoder_registered());
}
