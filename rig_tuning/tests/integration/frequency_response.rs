use rig_common::axis::{AxisConfig, Direction};
use rig_tuning::TuneError;
use rig_tuning::config::FrequencyResponseConfig;
use rig_tuning::frf::FrequencyResponseAnalyzer;
use rig_tuning::rig::TuningRig;
use rig_tuning::table::{load_table, save_table};
use std::f64::consts::PI;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;

use super::sim_rig;

const FREQ_HZ: f64 = 0.5;

fn sweep_config() -> FrequencyResponseConfig {
    FrequencyResponseConfig {
        start_exponent: FREQ_HZ.log10(),
        stop_exponent: FREQ_HZ.log10(),
        points: 1,
        pause_ms: 200,
        ..Default::default()
    }
}

fn normal_axis(fr: &FrequencyResponseConfig) -> AxisConfig {
    let mut cfg = AxisConfig::with_service_name("axis-frf");
    cfg.pid.direction = Direction::Normal;
    cfg.simulation.direction = Direction::Normal;
    fr.apply_ramp_limit(&mut cfg.driver);
    cfg
}

#[test]
fn sweep_matches_first_order_motor_model() {
    let fr = sweep_config();
    let cfg = normal_axis(&fr);
    let (mut rig, sim) = sim_rig(&cfg);

    let points = FrequencyResponseAnalyzer::new(fr.clone()).sweep(&mut rig).unwrap();
    assert_eq!(points.len(), 1);
    let p = points[0];

    // counts/command = k / (jω (1 + jωτ)), plus half a sample of hold delay.
    // The reported gain is the output amplitude at the sine amplitude.
    let omega = 2.0 * PI * FREQ_HZ;
    let k = cfg.simulation.counts_per_unit;
    let tau = cfg.simulation.time_constant_s;
    let gain = fr.amplitude * k / (omega * (1.0 + (omega * tau).powi(2)).sqrt());
    let hold_delay = omega * fr.sample_interval().as_secs_f64() / 2.0;
    let phase = -90.0 - (omega * tau).atan().to_degrees() - hold_delay.to_degrees();

    assert!((p.gain - gain).abs() <= 0.03 * gain, "gain {} vs {gain}", p.gain);
    assert!((p.phase_deg - phase).abs() <= 2.0, "phase {} vs {phase}", p.phase_deg);

    // Motor left stopped and healthy.
    assert_eq!(sim.commanded_speed(cfg.driver.channel), 0);
    assert!(!sim.flags().has_fault());
    rig.shutdown();
    assert!(!sim.encoder_registered());
}

#[test]
fn reversed_wiring_flips_phase() {
    let fr = sweep_config();
    let mut cfg = normal_axis(&fr);
    cfg.simulation.direction = Direction::Reversed;
    let (mut rig, _sim) = sim_rig(&cfg);

    let p = FrequencyResponseAnalyzer::new(fr).sweep(&mut rig).unwrap()[0];
    // -99.8° shifted by 180°.
    assert!((p.phase_deg - 80.2).abs() <= 2.5, "phase {}", p.phase_deg);
}

#[test]
fn sweep_table_written_and_read_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("frequency_response_gain_phase.csv");
    let fr = FrequencyResponseConfig {
        start_exponent: 0.0,
        stop_exponent: 0.5,
        points: 2,
        pause_ms: 100,
        ..Default::default()
    };
    let cfg = normal_axis(&fr);
    let (mut rig, _sim) = sim_rig(&cfg);

    let points = FrequencyResponseAnalyzer::new(fr).sweep(&mut rig).unwrap();
    assert_eq!(points.len(), 2);
    save_table(&path, &points).unwrap();

    let back = load_table(&path).unwrap();
    assert_eq!(back.len(), 2);
    assert!((back[0].frequency_hz - 1.0).abs() < 1e-4);
    assert!((back[1].frequency_hz - 10f64.sqrt()).abs() < 1e-4);
    // Integrating plant: gain falls with frequency.
    assert!(back[1].gain < back[0].gain);
}

#[test]
fn interrupted_sweep_stops_before_commanding() {
    let fr = sweep_config();
    let cfg = normal_axis(&fr);
    let (rig, sim) = sim_rig(&cfg);
    let mut rig = rig.with_running_flag(Arc::new(AtomicBool::new(false)));

    let err = FrequencyResponseAnalyzer::new(fr).sweep(&mut rig).unwrap_err();
    assert!(matches!(err, TuneError::Interrupted));
    assert_eq!(rig.counts(), 0);
    assert_eq!(sim.commanded_speed(cfg.driver.channel), 0);
}
