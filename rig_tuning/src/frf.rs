//! Sine-sweep frequency response.
//!
//! Per frequency: warm up under `A·sin(2πft)` without recording, record
//! command and encoder count for a whole number of cycles, hold zero, then
//! detrend and fit the response as `a·sin(ωt) + b·cos(ωt)`.
//!
//! ```text
//! gain  = √(a² + b²)        [counts, at the configured amplitude]
//! phase = atan2(b, a)       [deg]
//! ```
//!
//! The gain is the output amplitude itself, not normalized by the input
//! amplitude. The sin/cos columns are detrended along with the output (see
//! [`crate::fit`]), so on drifting data the values differ slightly from a
//! fit against the raw columns.

use std::f64::consts::PI;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::FrequencyResponseConfig;
use crate::error::TuneError;
use crate::fit::{detrend, fit_sinusoid};
use crate::rig::{TuningRig, hold};
use crate::table::GainPhasePoint;

/// Fewest samples a record window may hold.
pub const MIN_SAMPLES: usize = 3;

/// One recorded instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Time since the record window opened [s].
    pub time: f64,
    /// Commanded speed.
    pub input: f64,
    /// Encoder count.
    pub output: f64,
}

/// Fit one frequency's samples into a Bode point.
pub fn analyze(frequency_hz: f64, samples: &[Sample]) -> Result<GainPhasePoint, TuneError> {
    if samples.len() < MIN_SAMPLES {
        return Err(TuneError::InsufficientSamples {
            frequency_hz,
            count: samples.len(),
        });
    }
    let omega = 2.0 * PI * frequency_hz;
    let t: Vec<f64> = samples.iter().map(|s| s.time).collect();
    let u = detrend(&samples.iter().map(|s| s.input).collect::<Vec<_>>());
    let y = detrend(&samples.iter().map(|s| s.output).collect::<Vec<_>>());

    let fit = fit_sinusoid(&t, &y, omega).ok_or(TuneError::Singular { frequency_hz })?;
    if let Some(input) = fit_sinusoid(&t, &u, omega) {
        debug!(
            "f={frequency_hz:.4}Hz input amplitude {:.1} phase {:.2}°",
            input.amplitude(),
            input.phase_deg()
        );
    }

    Ok(GainPhasePoint {
        frequency_hz,
        gain: fit.amplitude(),
        phase_deg: fit.phase_deg(),
    })
}

/// Sine-sweep driver for one axis.
#[derive(Debug, Clone)]
pub struct FrequencyResponseAnalyzer {
    config: FrequencyResponseConfig,
}

impl FrequencyResponseAnalyzer {
    pub fn new(config: FrequencyResponseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrequencyResponseConfig {
        &self.config
    }

    /// Sweep every configured frequency.
    ///
    /// A frequency that cannot be fitted is logged and skipped; driver
    /// errors and interruption end the sweep.
    pub fn sweep<R: TuningRig + ?Sized>(
        &self,
        rig: &mut R,
    ) -> Result<Vec<GainPhasePoint>, TuneError> {
        let frequencies = self.config.frequencies();
        info!(
            "Starting frequency response test ({} points, {:.2}-{:.2} Hz, amplitude {})",
            frequencies.len(),
            frequencies.first().copied().unwrap_or_default(),
            frequencies.last().copied().unwrap_or_default(),
            self.config.amplitude
        );

        let mut points = Vec::with_capacity(frequencies.len());
        for frequency_hz in frequencies {
            info!("Testing frequency: {frequency_hz:.2} Hz");
            let samples = self.record(rig, frequency_hz)?;
            match analyze(frequency_hz, &samples) {
                Ok(point) => {
                    info!(
                        "f={:.4}Hz gain={:.4} phase={:.2}°",
                        point.frequency_hz, point.gain, point.phase_deg
                    );
                    points.push(point);
                }
                Err(e) => warn!("Skipping {frequency_hz:.4} Hz: {e}"),
            }
        }
        Ok(points)
    }

    /// Warm up, record and pause at one frequency.
    pub fn record<R: TuningRig + ?Sized>(
        &self,
        rig: &mut R,
        frequency_hz: f64,
    ) -> Result<Vec<Sample>, TuneError> {
        let interval = self.config.sample_interval();
        let warmup = Duration::from_secs_f64(self.config.warmup_cycles / frequency_hz);
        let window = Duration::from_secs_f64(self.config.record_cycles / frequency_hz);

        rig.zero();
        self.force(rig, frequency_hz, warmup, interval, None)?;

        let expected = (window.as_secs_f64() / interval.as_secs_f64()).ceil() as usize;
        let mut samples = Vec::with_capacity(expected + 1);
        self.force(rig, frequency_hz, window, interval, Some(&mut samples))?;

        hold(rig, 0, self.config.pause(), interval)?;
        debug!("Recorded {} samples at {frequency_hz:.4} Hz", samples.len());
        Ok(samples)
    }

    /// Apply the sine for `duration`, optionally recording each sample.
    fn force<R: TuningRig + ?Sized>(
        &self,
        rig: &mut R,
        frequency_hz: f64,
        duration: Duration,
        interval: Duration,
        mut samples: Option<&mut Vec<Sample>>,
    ) -> Result<(), TuneError> {
        let omega = 2.0 * PI * frequency_hz;
        let start = rig.elapsed();
        loop {
            if rig.is_cancelled() {
                return Err(TuneError::Interrupted);
            }
            let t = rig.elapsed().saturating_sub(start);
            if t >= duration {
                return Ok(());
            }
            let time = t.as_secs_f64();
            let speed = (self.config.amplitude * (omega * time).sin()) as i32;
            rig.command(speed)?;
            if let Some(samples) = samples.as_deref_mut() {
                samples.push(Sample {
                    time,
                    input: speed as f64,
                    output: rig.counts() as f64,
                });
            }
            rig.sleep(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Output follows `G·sin(ωt − φ)` of the record-window time, whatever
    /// the command.
    struct SyntheticPlant {
        now: Duration,
        origin: Duration,
        omega: f64,
        gain: f64,
        lag: f64,
        commands: usize,
    }

    impl SyntheticPlant {
        fn new(freq: f64, gain: f64, lag_deg: f64) -> Self {
            Self {
                now: Duration::ZERO,
                origin: Duration::ZERO,
                omega: 2.0 * PI * freq,
                gain,
                lag: lag_deg.to_radians(),
                commands: 0,
            }
        }
    }

    impl TuningRig for SyntheticPlant {
        fn position(&self) -> f64 {
            self.counts() as f64
        }
        fn counts(&self) -> i64 {
            let t = (self.now - self.origin).as_secs_f64();
            (self.gain * (self.omega * t - self.lag).sin() + 500.0 + 3.0 * t).round() as i64
        }
        fn command(&mut self, _speed: i32) -> Result<(), TuneError> {
            self.commands += 1;
            Ok(())
        }
        fn elapsed(&self) -> Duration {
            self.now
        }
        fn sleep(&mut self, d: Duration) {
            self.now += d;
        }
        fn zero(&mut self) {
            self.origin = self.now;
        }
    }

    fn single_frequency(freq: f64) -> FrequencyResponseConfig {
        FrequencyResponseConfig {
            start_exponent: freq.log10(),
            stop_exponent: freq.log10(),
            points: 1,
            pause_ms: 50,
            ..Default::default()
        }
    }

    #[test]
    fn recovers_synthetic_gain_and_phase() {
        for &(freq, gain, lag) in &[(0.5, 2000.0, 30.0), (2.0, 800.0, 75.0), (10.0, 5000.0, 120.0)] {
            let analyzer = FrequencyResponseAnalyzer::new(single_frequency(freq));
            let mut rig = SyntheticPlant::new(freq, gain, lag);
            let points = analyzer.sweep(&mut rig).unwrap();
            assert_eq!(points.len(), 1);
            let p = points[0];
            assert!((p.frequency_hz - freq).abs() < 1e-9);
            assert!((p.gain - gain).abs() <= 0.01 * gain, "gain {} vs {gain}", p.gain);
            assert!((p.phase_deg + lag).abs() <= 2.0, "phase {} vs -{lag}", p.phase_deg);
        }
    }

    #[test]
    fn record_window_spans_whole_cycles() {
        let analyzer = FrequencyResponseAnalyzer::new(single_frequency(1.0));
        let mut rig = SyntheticPlant::new(1.0, 100.0, 0.0);
        let samples = analyzer.record(&mut rig, 1.0).unwrap();
        // 4 cycles at 1 Hz, one sample per 10 ms.
        assert_eq!(samples.len(), 400);
        assert_eq!(samples[0].time, 0.0);
        assert_eq!(samples[0].input, 0.0);
        assert!((samples[399].time - 3.99).abs() < 1e-9);
        // Warm-up 200 + record 400 + pause 6.
        assert_eq!(rig.commands, 606);
    }

    #[test]
    fn too_few_samples_rejected() {
        let s = Sample {
            time: 0.0,
            input: 0.0,
            output: 0.0,
        };
        assert!(matches!(
            analyze(20.0, &[s, s]),
            Err(TuneError::InsufficientSamples { count: 2, .. })
        ));
    }

    #[test]
    fn flat_time_axis_is_singular() {
        let s = Sample {
            time: 0.25,
            input: 1.0,
            output: 3.0,
        };
        assert!(matches!(
            analyze(1.0, &[s; 5]),
            Err(TuneError::Singular { .. })
        ));
    }

    #[test]
    fn unfittable_frequency_is_skipped() {
        // 50 Hz sampled every 10 ms lands every sample on a zero of the sine.
        let analyzer = FrequencyResponseAnalyzer::new(single_frequency(50.0));
        let mut rig = SyntheticPlant::new(50.0, 100.0, 0.0);
        assert!(analyzer.sweep(&mut rig).unwrap().is_empty());
    }
}
