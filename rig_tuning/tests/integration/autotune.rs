use rig_common::axis::AxisConfig;
use rig_tuning::TuneError;
use rig_tuning::config::AutotuneConfig;
use rig_tuning::relay::RelayAutotuner;
use rig_tuning::rig::TuningRig;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use super::sim_rig;

fn short_sweep() -> AutotuneConfig {
    AutotuneConfig {
        start_gain: 200.0,
        gain_step: 100.0,
        max_gain: 300.0,
        window_s: 2.0,
        settle_pause_ms: 200,
        ..Default::default()
    }
}

#[test]
fn saturated_trials_never_cross_and_leave_motor_stopped() {
    // At full command the axis covers ~27 of the 50 units in 2 s.
    let cfg = AxisConfig::with_service_name("axis-autotune");
    let (mut rig, sim) = sim_rig(&cfg);

    let tuner = RelayAutotuner::new(short_sweep(), cfg.pid.direction);
    let err = tuner.run(&mut rig).unwrap_err();
    assert!(matches!(err, TuneError::OscillationNotFound { max_gain } if max_gain == 300.0));

    // Reversed gains against reversed wiring drive toward the target.
    let pos = rig.position();
    assert!(pos > 15.0 && pos < 40.0, "position {pos}");
    assert_eq!(sim.commanded_speed(cfg.driver.channel), 0);
    assert!(!sim.flags().has_fault());
    assert_eq!(sim.reset_count(), 0);
}

#[test]
fn interrupted_sweep_commands_zero() {
    let cfg = AxisConfig::with_service_name("axis-autotune");
    let (rig, sim) = sim_rig(&cfg);
    let mut rig = rig.with_running_flag(Arc::new(AtomicBool::new(false)));

    let err = RelayAutotuner::new(short_sweep(), cfg.pid.direction)
        .run(&mut rig)
        .unwrap_err();
    assert!(matches!(err, TuneError::Interrupted));
    assert_eq!(sim.commanded_speed(cfg.driver.channel), 0);

    rig.shutdown();
    rig.shutdown();
    assert!(!sim.encoder_registered());
}
