//! Integration test: settle on a target and retire it.
//!
//! A first-order plant produces encoder edges; the loop must reach the
//! target within tolerance, retire it (zero command, rebase, file
//! acknowledged) and accept the next one.

use super::{Bench, axis_config};
use rig_common::consts::ENCODER_GAIN_DEFAULT;
use rig_control_unit::cycle::TickOutcome;

const MAX_TICKS: usize = 600;

/// Tick until settled; returns the tick count and the smallest |error| seen.
fn drive_to_settle(bench: &mut Bench) -> (usize, f64) {
    let mut best = f64::MAX;
    for i in 0..MAX_TICKS {
        match bench.control.tick(bench.now).unwrap() {
            TickOutcome::Settled { .. } => return (i, best),
            TickOutcome::Tracking { error, .. } => best = best.min(error.abs()),
            TickOutcome::Idle => {}
        }
        bench.advance();
    }
    panic!("did not settle within {MAX_TICKS} ticks (best |error| {best})");
}

#[test]
fn reaches_100mm_and_retires_setpoint() {
    let cfg = axis_config();
    assert_eq!(cfg.encoder.gain, ENCODER_GAIN_DEFAULT);
    let mut bench = Bench::new(&cfg);
    bench.write_target("100");

    let (ticks, best) = drive_to_settle(&mut bench);
    assert!(best < 0.15, "best |error| {best}");
    assert!(ticks > 20, "settled too early: {ticks}");

    // Output returns to zero and the target is gone.
    assert_eq!(bench.sim.commanded_speed(1), 0);
    assert_eq!(bench.control.target(), None);
    assert_eq!(bench.control.pid().state().integral(), 0.0);

    // Rebased: the new origin is the achieved target.
    assert!(bench.control.position().abs() < 0.2);

    // Acknowledged on the settling tick itself.
    assert_eq!(bench.read_target(), "0");
    bench.advance();
    assert_eq!(bench.control.tick(bench.now).unwrap(), TickOutcome::Idle);
    assert_eq!(bench.read_target(), "0");
}

#[test]
fn accepts_new_target_after_settling() {
    let cfg = axis_config();
    let mut bench = Bench::new(&cfg);
    bench.write_target("5");
    drive_to_settle(&mut bench);
    bench.advance();
    bench.control.tick(bench.now).unwrap();

    // Relative to the rebased origin.
    bench.write_target("-20");
    bench.advance();
    let out = bench.control.tick(bench.now).unwrap();
    assert!(matches!(out, TickOutcome::Tracking { .. }));
    assert_eq!(bench.control.target(), Some(-20.0));

    drive_to_settle(&mut bench);
    assert_eq!(bench.control.target(), None);
    assert_eq!(bench.sim.commanded_speed(1), 0);
}

#[test]
fn idle_loop_holds_motor_still() {
    let cfg = axis_config();
    let mut bench = Bench::new(&cfg);
    for _ in 0..20 {
        assert_eq!(bench.control.tick(bench.now).unwrap(), TickOutcome::Idle);
        bench.advance();
    }
    assert_eq!(bench.control.encoder().counts(), 0);
    assert_eq!(bench.sim.commanded_speed(1), 0);
}
